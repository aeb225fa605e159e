/// Engagement aggregation: batched counts and viewer flags, like toggling
use super::{RetweetResolver, VisibilityResolver};
use crate::db::SocialStore;
use crate::error::Result;
use crate::metrics::engagement as metrics;
use crate::models::{EngagementCounts, LikeState};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Which of a batch of target posts the viewer liked / retweeted.
#[derive(Debug, Clone, Default)]
pub struct ViewerFlags {
    pub liked: HashSet<Uuid>,
    pub retweeted: HashSet<Uuid>,
}

impl ViewerFlags {
    pub fn liked(&self, target_id: &Uuid) -> bool {
        self.liked.contains(target_id)
    }

    pub fn retweeted(&self, target_id: &Uuid) -> bool {
        self.retweeted.contains(target_id)
    }
}

#[derive(Clone)]
pub struct EngagementAggregator {
    store: Arc<dyn SocialStore>,
    retweets: RetweetResolver,
    visibility: VisibilityResolver,
}

impl EngagementAggregator {
    pub fn new(
        store: Arc<dyn SocialStore>,
        retweets: RetweetResolver,
        visibility: VisibilityResolver,
    ) -> Self {
        Self {
            store,
            retweets,
            visibility,
        }
    }

    /// One lookup for likes and one for retweets, whatever the batch size.
    pub async fn viewer_flags(
        &self,
        viewer_id: Option<Uuid>,
        target_ids: &[Uuid],
    ) -> Result<ViewerFlags> {
        let Some(viewer_id) = viewer_id else {
            return Ok(ViewerFlags::default());
        };
        if target_ids.is_empty() {
            return Ok(ViewerFlags::default());
        }

        let liked = self.store.liked_post_ids(viewer_id, target_ids).await?;
        let retweeted = self.store.retweeted_post_ids(viewer_id, target_ids).await?;

        Ok(ViewerFlags { liked, retweeted })
    }

    /// Counts are recomputed from rows on every call.
    pub async fn counts(&self, target_ids: &[Uuid]) -> Result<HashMap<Uuid, EngagementCounts>> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.engagement_counts(target_ids).await
    }

    pub async fn like(&self, post_id: Uuid, viewer_id: Uuid) -> Result<LikeState> {
        let target = self.retweets.resolve_target(post_id).await?;
        self.visibility.ensure_visible(&target, Some(viewer_id)).await?;

        let created = self.store.insert_like(viewer_id, target.id).await?;
        metrics::record("like", if created { "created" } else { "existing" });
        if created {
            tracing::debug!(target_id = %target.id, %viewer_id, "post liked");
        }

        Ok(LikeState {
            liked_by_me: true,
            like_count: self.store.count_likes(target.id).await?,
        })
    }

    pub async fn unlike(&self, post_id: Uuid, viewer_id: Uuid) -> Result<LikeState> {
        let target = self.retweets.resolve_target(post_id).await?;
        self.visibility.ensure_visible(&target, Some(viewer_id)).await?;

        let removed = self.store.delete_like(viewer_id, target.id).await?;
        metrics::record("unlike", if removed { "removed" } else { "noop" });

        Ok(LikeState {
            liked_by_me: false,
            like_count: self.store.count_likes(target.id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::SocialStore;
    use crate::error::AppError;
    use crate::models::PostVisibility;
    use crate::services::testing::Fixture;
    use uuid::Uuid;

    #[tokio::test]
    async fn like_then_unlike_restores_count() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let carol = fx.user("carol").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;
        let engagement = &fx.services.engagement;

        engagement.like(post.id, carol.id).await.unwrap();
        let before = fx.store.count_likes(post.id).await.unwrap();

        let liked = engagement.like(post.id, bob.id).await.unwrap();
        assert!(liked.liked_by_me);
        assert_eq!(liked.like_count, before + 1);

        let liked_again = engagement.like(post.id, bob.id).await.unwrap();
        assert_eq!(liked_again.like_count, before + 1);

        let unliked = engagement.unlike(post.id, bob.id).await.unwrap();
        assert!(!unliked.liked_by_me);
        assert_eq!(unliked.like_count, before);
    }

    #[tokio::test]
    async fn likes_through_a_retweet_land_on_the_original() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let carol = fx.user("carol").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;

        fx.services.retweets.retweet(post.id, bob.id).await.unwrap();
        let retweet = fx.store.find_retweet(bob.id, post.id).await.unwrap().unwrap();

        let via_retweet = fx.services.engagement.like(retweet.id, carol.id).await.unwrap();
        assert_eq!(via_retweet.like_count, 1);
        assert_eq!(fx.store.count_likes(post.id).await.unwrap(), 1);
        assert_eq!(fx.store.count_likes(retweet.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn hidden_posts_cannot_be_liked() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let post = fx.post(alice.id, "secret", PostVisibility::Private).await;

        let err = fx.services.engagement.like(post.id, bob.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn flags_and_counts_are_batched_per_target() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let first = fx.post(alice.id, "one", PostVisibility::Public).await;
        let second = fx.post(alice.id, "two", PostVisibility::Public).await;

        fx.services.engagement.like(first.id, bob.id).await.unwrap();
        fx.services.retweets.retweet(second.id, bob.id).await.unwrap();

        let ids = [first.id, second.id];
        let flags = fx
            .services
            .engagement
            .viewer_flags(Some(bob.id), &ids)
            .await
            .unwrap();
        assert!(flags.liked(&first.id));
        assert!(!flags.liked(&second.id));
        assert!(flags.retweeted(&second.id));

        let anonymous = fx.services.engagement.viewer_flags(None, &ids).await.unwrap();
        assert!(anonymous.liked.is_empty());

        let counts = fx.services.engagement.counts(&ids).await.unwrap();
        assert_eq!(counts[&first.id].likes, 1);
        assert_eq!(counts[&second.id].retweets, 1);
        assert!(fx
            .services
            .engagement
            .counts(&[])
            .await
            .unwrap()
            .is_empty());
        assert!(!counts.contains_key(&Uuid::nil()));
    }
}
