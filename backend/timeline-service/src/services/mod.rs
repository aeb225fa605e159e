/// Business logic layer for timeline-service
///
/// - Visibility: who may see a post
/// - Retweets: canonical target resolution, retweet toggling
/// - Engagement: batched counts and viewer flags, likes
/// - Timeline: paginated feeds rendered into post views
/// - Posts, comments, users: lifecycle operations built on the above
///
/// Every service is constructed from an explicit store and clock; nothing
/// here keeps state of its own.
pub mod comments;
pub mod engagement;
pub mod posts;
pub mod retweets;
pub mod timeline;
pub mod users;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

pub use comments::{CommentDraft, CommentService};
pub use engagement::{EngagementAggregator, ViewerFlags};
pub use posts::{PostDraft, PostPatch, PostService};
pub use retweets::RetweetResolver;
pub use timeline::{Feed, TimelineBuilder, TimelineOptions, TimelineQuery};
pub use users::{ProfilePatch, UserService};
pub use visibility::VisibilityResolver;

use crate::clock::Clock;
use crate::db::SocialStore;
use std::sync::Arc;

/// All services wired against one store and clock.
#[derive(Clone)]
pub struct Services {
    pub visibility: VisibilityResolver,
    pub retweets: RetweetResolver,
    pub engagement: EngagementAggregator,
    pub timeline: TimelineBuilder,
    pub posts: PostService,
    pub comments: CommentService,
    pub users: UserService,
}

impl Services {
    pub fn new(
        store: Arc<dyn SocialStore>,
        clock: Arc<dyn Clock>,
        options: TimelineOptions,
    ) -> Self {
        let visibility = VisibilityResolver::new(store.clone());
        let retweets = RetweetResolver::new(store.clone(), clock.clone(), visibility.clone());
        let engagement =
            EngagementAggregator::new(store.clone(), retweets.clone(), visibility.clone());
        let timeline = TimelineBuilder::new(store.clone(), engagement.clone(), options);
        let posts = PostService::new(
            store.clone(),
            clock.clone(),
            visibility.clone(),
            retweets.clone(),
            timeline.clone(),
        );
        let comments = CommentService::new(store.clone(), clock, retweets.clone(), visibility.clone());
        let users = UserService::new(store, timeline.clone());

        Self {
            visibility,
            retweets,
            engagement,
            timeline,
            posts,
            comments,
            users,
        }
    }
}
