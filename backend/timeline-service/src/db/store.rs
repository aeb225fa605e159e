use crate::error::Result;
use crate::models::{
    Comment, EngagementCounts, NewComment, NewPost, Post, PostChanges, PostFilter, User,
    UserChanges,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Storage seam for the social graph, posts and engagement rows.
///
/// `PgSocialStore` is the production implementation; `InMemoryStore` backs
/// tests and local runs. Uniqueness (follows, likes, one retweet per author
/// and original) is the store's job: the `insert_*` methods are
/// insert-or-ignore and report whether a row was created.
#[async_trait::async_trait]
pub trait SocialStore: Send + Sync {
    // ----- users -----

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Usernames are stored lowercase; callers pass the raw path segment.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_users(&self, user_ids: &[Uuid]) -> Result<Vec<User>>;

    /// Overwrites display name, bio and avatar. `None` when the user is gone.
    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<Option<User>>;

    // ----- follow graph -----

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Ids of every user `follower_id` follows.
    async fn following_ids(&self, follower_id: Uuid) -> Result<Vec<Uuid>>;

    async fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool>;

    /// Returns (followers, following)
    async fn follow_counts(&self, user_id: Uuid) -> Result<(i64, i64)>;

    // ----- posts -----

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    async fn find_posts(&self, post_ids: &[Uuid]) -> Result<Vec<Post>>;

    async fn insert_post(&self, post: NewPost) -> Result<Post>;

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>>;

    /// Deleting an ORIGINAL removes its retweets, likes and comments with it.
    async fn delete_post(&self, post_id: Uuid) -> Result<bool>;

    /// Ordered by (created_at desc, id desc).
    async fn list_posts(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>>;

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64>;

    // ----- retweets -----

    async fn find_retweet(&self, author_id: Uuid, original_post_id: Uuid) -> Result<Option<Post>>;

    async fn insert_retweet(&self, retweet: NewPost) -> Result<bool>;

    async fn delete_retweets(&self, author_id: Uuid, original_post_id: Uuid) -> Result<u64>;

    async fn count_retweets(&self, original_post_id: Uuid) -> Result<i64>;

    /// Subset of `original_ids` that `author_id` has retweeted.
    async fn retweeted_post_ids(
        &self,
        author_id: Uuid,
        original_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>>;

    // ----- likes -----

    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    async fn count_likes(&self, post_id: Uuid) -> Result<i64>;

    /// Subset of `post_ids` that `user_id` has liked.
    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>>;

    /// Like/comment/retweet counts per post; posts without rows map to zeros.
    async fn engagement_counts(&self, post_ids: &[Uuid])
        -> Result<HashMap<Uuid, EngagementCounts>>;

    // ----- comments -----

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;

    /// Top-level comments of a post, (created_at desc, id desc).
    async fn list_top_level_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>>;

    async fn count_top_level_comments(&self, post_id: Uuid) -> Result<i64>;

    /// Replies to any of `parent_ids`, oldest first.
    async fn list_replies(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>>;

    /// Up to `per_post` newest top-level comments for each post.
    async fn latest_top_level_comments(
        &self,
        post_ids: &[Uuid],
        per_post: i64,
    ) -> Result<Vec<Comment>>;

    async fn reply_counts(&self, parent_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
