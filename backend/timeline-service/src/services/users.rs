/// Profiles and the follow graph
use super::timeline::{Feed, TimelineBuilder, TimelineQuery};
use crate::db::SocialStore;
use crate::error::{AppError, Result};
use crate::metrics::engagement as metrics;
use crate::models::{FollowState, Page, PostFilter, PostView, User, UserChanges, UserProfile};
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;
pub const MAX_BIO_LENGTH: usize = 500;

/// Profile edit: `None` keeps the current value, an empty string clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

fn apply(current: Option<String>, patch: Option<String>) -> Option<String> {
    match patch {
        Some(value) => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
        None => current,
    }
}

fn check_length(field: &str, value: &Option<String>, max: usize) -> Result<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(AppError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn SocialStore>,
    timeline: TimelineBuilder,
}

impl UserService {
    pub fn new(store: Arc<dyn SocialStore>, timeline: TimelineBuilder) -> Self {
        Self { store, timeline }
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(AppError::user_not_found)
    }

    pub async fn profile(&self, username: &str, viewer_id: Option<Uuid>) -> Result<UserProfile> {
        let user = self.find_by_username(username).await?;
        self.profile_of(user, viewer_id).await
    }

    async fn profile_of(&self, user: User, viewer_id: Option<Uuid>) -> Result<UserProfile> {
        let (follower_count, following_count) = self.store.follow_counts(user.id).await?;
        let is_me = viewer_id == Some(user.id);
        let is_following = match viewer_id {
            Some(viewer_id) if !is_me => self.store.is_following(viewer_id, user.id).await?,
            _ => false,
        };
        let post_count = self
            .store
            .count_posts(&PostFilter::AuthoredBy {
                author_id: user.id,
                include_private: is_me || is_following,
            })
            .await?;

        Ok(UserProfile {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            bio: user.bio,
            created_at: user.created_at,
            follower_count,
            following_count,
            post_count,
            is_following,
            is_me,
        })
    }

    /// Edit the viewer's own display name, bio and avatar.
    pub async fn update_profile(&self, viewer_id: Uuid, patch: ProfilePatch) -> Result<UserProfile> {
        let user = self
            .store
            .find_user(viewer_id)
            .await?
            .ok_or_else(AppError::user_not_found)?;

        let changes = UserChanges {
            display_name: apply(user.display_name, patch.display_name),
            bio: apply(user.bio, patch.bio),
            avatar_url: apply(user.avatar_url, patch.avatar_url),
        };
        check_length("Display name", &changes.display_name, MAX_DISPLAY_NAME_LENGTH)?;
        check_length("Bio", &changes.bio, MAX_BIO_LENGTH)?;

        let updated = self
            .store
            .update_user(viewer_id, changes)
            .await?
            .ok_or_else(AppError::user_not_found)?;

        tracing::info!(user_id = %viewer_id, "profile updated");
        self.profile_of(updated, Some(viewer_id)).await
    }

    pub async fn follow(&self, viewer_id: Uuid, username: &str) -> Result<FollowState> {
        let user = self.find_by_username(username).await?;

        if user.id == viewer_id {
            return Err(AppError::Conflict("Cannot follow yourself".to_string()));
        }
        if self.store.is_following(viewer_id, user.id).await? {
            return Err(AppError::Conflict("Already following".to_string()));
        }

        // losing an insert race to an identical request still ends up following
        let created = self.store.insert_follow(viewer_id, user.id).await?;
        metrics::record("follow", if created { "created" } else { "existing" });
        tracing::info!(follower_id = %viewer_id, following_id = %user.id, "user followed");

        Ok(FollowState { is_following: true })
    }

    pub async fn unfollow(&self, viewer_id: Uuid, username: &str) -> Result<FollowState> {
        let user = self.find_by_username(username).await?;

        let removed = self.store.delete_follow(viewer_id, user.id).await?;
        metrics::record("unfollow", if removed { "removed" } else { "noop" });
        if removed {
            tracing::info!(follower_id = %viewer_id, following_id = %user.id, "user unfollowed");
        }

        Ok(FollowState {
            is_following: false,
        })
    }

    pub async fn posts(
        &self,
        username: &str,
        viewer_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<PostView>> {
        let user = self.find_by_username(username).await?;
        tracing::debug!(author_id = %user.id, viewer_id = ?viewer_id, "listing user posts");

        self.timeline
            .build(TimelineQuery {
                limit,
                offset,
                viewer_id,
                feed: Feed::Author { author_id: user.id },
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostVisibility;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn follow_rules() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let users = &fx.services.users;

        let state = users.follow(bob.id, "alice").await.unwrap();
        assert!(state.is_following);

        let err = users.follow(bob.id, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Already following"));

        let err = users.follow(alice.id, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Cannot follow yourself"));

        let err = users.follow(alice.id, "nobody").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unfollow_is_idempotent() {
        let fx = Fixture::new().await;
        let _alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let users = &fx.services.users;

        users.follow(bob.id, "alice").await.unwrap();
        assert!(!users.unfollow(bob.id, "alice").await.unwrap().is_following);
        assert!(!users.unfollow(bob.id, "alice").await.unwrap().is_following);

        let err = users.unfollow(bob.id, "nobody").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn profile_reports_counts_and_relationship() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        fx.post(alice.id, "public", PostVisibility::Public).await;
        fx.post(alice.id, "private", PostVisibility::Private).await;
        fx.services.users.follow(bob.id, "alice").await.unwrap();

        let seen_by_bob = fx.services.users.profile("Alice", Some(bob.id)).await.unwrap();
        assert_eq!(seen_by_bob.follower_count, 1);
        assert_eq!(seen_by_bob.following_count, 0);
        assert_eq!(seen_by_bob.post_count, 2);
        assert!(seen_by_bob.is_following);
        assert!(!seen_by_bob.is_me);

        let own = fx.services.users.profile("alice", Some(alice.id)).await.unwrap();
        assert!(own.is_me);
        assert!(!own.is_following);

        let anonymous = fx.services.users.profile("alice", None).await.unwrap();
        assert_eq!(anonymous.post_count, 1);
    }

    #[tokio::test]
    async fn user_posts_hide_private_from_strangers() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let carol = fx.user("carol").await;
        fx.post(alice.id, "public", PostVisibility::Public).await;
        fx.post(alice.id, "private", PostVisibility::Private).await;

        let page = fx
            .services
            .users
            .posts("alice", Some(carol.id), 20, 0)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);

        let own = fx
            .services
            .users
            .posts("alice", Some(alice.id), 20, 0)
            .await
            .unwrap();
        assert_eq!(own.items.len(), 2);
    }

    #[tokio::test]
    async fn profile_edit_keeps_clears_and_limits_fields() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let users = &fx.services.users;

        let profile = users
            .update_profile(
                alice.id,
                ProfilePatch {
                    display_name: Some("  Alice A.  ".into()),
                    bio: Some("hello there".into()),
                    avatar_url: Some("https://cdn.example/alice.png".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Alice A."));
        assert_eq!(profile.bio.as_deref(), Some("hello there"));
        assert!(profile.is_me);

        let profile = users
            .update_profile(
                alice.id,
                ProfilePatch {
                    avatar_url: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(profile.avatar_url.is_none());
        assert_eq!(profile.bio.as_deref(), Some("hello there"));

        let err = users
            .update_profile(
                alice.id,
                ProfilePatch {
                    bio: Some("x".repeat(MAX_BIO_LENGTH + 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let seen = users.profile("alice", None).await.unwrap();
        assert_eq!(seen.display_name.as_deref(), Some("Alice A."));

        let err = users
            .update_profile(Uuid::new_v4(), ProfilePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
