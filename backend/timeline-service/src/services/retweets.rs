/// Retweet resolution and retweet toggling
///
/// Every engagement action (like, retweet, comment) is applied to the
/// canonical target post: the post itself when ORIGINAL, its original when
/// RETWEET.
use super::VisibilityResolver;
use crate::clock::Clock;
use crate::db::SocialStore;
use crate::error::{AppError, Result};
use crate::metrics::engagement as metrics;
use crate::models::{NewPost, Post, PostKind, PostVisibility, RetweetState};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct RetweetResolver {
    store: Arc<dyn SocialStore>,
    clock: Arc<dyn Clock>,
    visibility: VisibilityResolver,
}

impl RetweetResolver {
    pub fn new(
        store: Arc<dyn SocialStore>,
        clock: Arc<dyn Clock>,
        visibility: VisibilityResolver,
    ) -> Self {
        Self {
            store,
            clock,
            visibility,
        }
    }

    /// Canonical ORIGINAL post behind `post_id`.
    pub async fn resolve_target(&self, post_id: Uuid) -> Result<Post> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(AppError::post_not_found)?;

        self.target_of(post).await
    }

    /// Same as [`resolve_target`](Self::resolve_target) for an already loaded post.
    pub async fn target_of(&self, post: Post) -> Result<Post> {
        match (post.kind, post.original_post_id) {
            (PostKind::Original, _) => Ok(post),
            (PostKind::Retweet, Some(original_id)) => self
                .store
                .find_post(original_id)
                .await?
                .ok_or_else(AppError::post_not_found),
            (PostKind::Retweet, None) => {
                tracing::error!(post_id = %post.id, "retweet without original_post_id");
                Err(AppError::post_not_found())
            }
        }
    }

    /// Retweet the target of `post_id`. Idempotent per (viewer, target).
    pub async fn retweet(&self, post_id: Uuid, viewer_id: Uuid) -> Result<RetweetState> {
        let target = self.resolve_target(post_id).await?;
        self.visibility.ensure_visible(&target, Some(viewer_id)).await?;

        if target.visibility == PostVisibility::Private && target.author_id != viewer_id {
            return Err(AppError::BadRequest(
                "Private posts cannot be retweeted".to_string(),
            ));
        }

        let existing = self.store.find_retweet(viewer_id, target.id).await?;
        if existing.is_none() {
            let created = self
                .store
                .insert_retweet(NewPost {
                    author_id: viewer_id,
                    kind: PostKind::Retweet,
                    original_post_id: Some(target.id),
                    content: None,
                    image_url: None,
                    visibility: target.visibility,
                    created_at: self.clock.now(),
                })
                .await?;

            // a concurrent request may have inserted the same row first
            metrics::record("retweet", if created { "created" } else { "existing" });
            if created {
                tracing::info!(target_id = %target.id, %viewer_id, "post retweeted");
            }
        } else {
            metrics::record("retweet", "existing");
        }

        Ok(RetweetState {
            retweeted_by_me: true,
            retweet_count: self.store.count_retweets(target.id).await?,
        })
    }

    /// Remove the viewer's retweet of the target of `post_id`.
    pub async fn unretweet(&self, post_id: Uuid, viewer_id: Uuid) -> Result<RetweetState> {
        let target = self.resolve_target(post_id).await?;

        let removed = self.store.delete_retweets(viewer_id, target.id).await?;
        metrics::record("unretweet", if removed > 0 { "removed" } else { "noop" });
        if removed > 0 {
            tracing::info!(target_id = %target.id, %viewer_id, "retweet removed");
        }

        Ok(RetweetState {
            retweeted_by_me: false,
            retweet_count: self.store.count_retweets(target.id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn retweeting_twice_creates_one_row() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;

        let first = fx.services.retweets.retweet(post.id, bob.id).await.unwrap();
        let second = fx.services.retweets.retweet(post.id, bob.id).await.unwrap();

        assert!(first.retweeted_by_me);
        assert_eq!(first.retweet_count, 1);
        assert_eq!(second.retweet_count, 1);
    }

    #[tokio::test]
    async fn retweeting_a_retweet_targets_the_original() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let carol = fx.user("carol").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;

        fx.services.retweets.retweet(post.id, bob.id).await.unwrap();
        let bobs_retweet = fx.store.find_retweet(bob.id, post.id).await.unwrap().unwrap();

        let via_retweet = fx
            .services
            .retweets
            .retweet(bobs_retweet.id, carol.id)
            .await
            .unwrap();
        assert_eq!(via_retweet.retweet_count, 2);

        let target = fx
            .services
            .retweets
            .resolve_target(bobs_retweet.id)
            .await
            .unwrap();
        assert_eq!(target.id, post.id);
        assert!(fx.store.find_retweet(carol.id, post.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn private_posts_cannot_be_retweeted_by_followers() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let carol = fx.user("carol").await;
        let post = fx.post(alice.id, "secret", PostVisibility::Private).await;
        fx.store.insert_follow(bob.id, alice.id).await.unwrap();

        let err = fx.services.retweets.retweet(post.id, bob.id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = fx.services.retweets.retweet(post.id, carol.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn author_retweet_of_private_post_stays_private() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let post = fx.post(alice.id, "secret", PostVisibility::Private).await;

        fx.services.retweets.retweet(post.id, alice.id).await.unwrap();
        let retweet = fx.store.find_retweet(alice.id, post.id).await.unwrap().unwrap();
        assert_eq!(retweet.visibility, PostVisibility::Private);
    }

    #[tokio::test]
    async fn unretweet_restores_count() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;

        fx.services.retweets.retweet(post.id, bob.id).await.unwrap();
        let state = fx.services.retweets.unretweet(post.id, bob.id).await.unwrap();
        assert!(!state.retweeted_by_me);
        assert_eq!(state.retweet_count, 0);

        let again = fx.services.retweets.unretweet(post.id, bob.id).await.unwrap();
        assert_eq!(again.retweet_count, 0);
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let fx = Fixture::new().await;
        let bob = fx.user("bob").await;
        let err = fx
            .services
            .retweets
            .retweet(Uuid::new_v4(), bob.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
