use super::{comment_repo, follow_repo, like_repo, post_repo, user_repo, SocialStore};
use crate::error::Result;
use crate::models::{
    Comment, EngagementCounts, NewComment, NewPost, Post, PostChanges, PostFilter, User,
    UserChanges,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// PostgreSQL-backed store (source of truth)
#[derive(Clone)]
pub struct PgSocialStore {
    pool: PgPool,
}

impl PgSocialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SocialStore for PgSocialStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(user_repo::find_user_by_id(&self.pool, user_id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(user_repo::find_user_by_username(&self.pool, username).await?)
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(user_repo::find_users_by_ids(&self.pool, user_ids).await?)
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        Ok(user_repo::update_user(&self.pool, user_id, &changes).await?)
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        Ok(follow_repo::is_following(&self.pool, follower_id, following_id).await?)
    }

    async fn following_ids(&self, follower_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(follow_repo::following_ids(&self.pool, follower_id).await?)
    }

    async fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        Ok(follow_repo::create_follow(&self.pool, follower_id, following_id).await?)
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        Ok(follow_repo::delete_follow(&self.pool, follower_id, following_id).await?)
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<(i64, i64)> {
        Ok(follow_repo::follow_counts(&self.pool, user_id).await?)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(post_repo::find_post_by_id(&self.pool, post_id).await?)
    }

    async fn find_posts(&self, post_ids: &[Uuid]) -> Result<Vec<Post>> {
        Ok(post_repo::find_posts_by_ids(&self.pool, post_ids).await?)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        Ok(post_repo::create_post(&self.pool, &post).await?)
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        Ok(post_repo::update_post(&self.pool, post_id, &changes).await?)
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        Ok(post_repo::delete_post(&self.pool, post_id).await?)
    }

    async fn list_posts(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        Ok(post_repo::list_posts(&self.pool, filter, limit, offset).await?)
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        Ok(post_repo::count_posts(&self.pool, filter).await?)
    }

    async fn find_retweet(&self, author_id: Uuid, original_post_id: Uuid) -> Result<Option<Post>> {
        Ok(post_repo::find_retweet(&self.pool, author_id, original_post_id).await?)
    }

    async fn insert_retweet(&self, retweet: NewPost) -> Result<bool> {
        Ok(post_repo::create_retweet_if_absent(&self.pool, &retweet).await?)
    }

    async fn delete_retweets(&self, author_id: Uuid, original_post_id: Uuid) -> Result<u64> {
        Ok(post_repo::delete_retweets(&self.pool, author_id, original_post_id).await?)
    }

    async fn count_retweets(&self, original_post_id: Uuid) -> Result<i64> {
        Ok(post_repo::count_retweets(&self.pool, original_post_id).await?)
    }

    async fn retweeted_post_ids(
        &self,
        author_id: Uuid,
        original_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        Ok(post_repo::retweeted_post_ids(&self.pool, author_id, original_ids).await?)
    }

    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(like_repo::create_like(&self.pool, user_id, post_id).await?)
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(like_repo::delete_like(&self.pool, user_id, post_id).await?)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        Ok(like_repo::count_likes_by_post(&self.pool, post_id).await?)
    }

    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        Ok(like_repo::liked_post_ids(&self.pool, user_id, post_ids).await?)
    }

    async fn engagement_counts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EngagementCounts>> {
        Ok(post_repo::engagement_counts(&self.pool, post_ids).await?)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        Ok(comment_repo::create_comment(&self.pool, &comment).await?)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(comment_repo::find_comment_by_id(&self.pool, comment_id).await?)
    }

    async fn list_top_level_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        Ok(comment_repo::find_top_level_comments(&self.pool, post_id, limit, offset).await?)
    }

    async fn count_top_level_comments(&self, post_id: Uuid) -> Result<i64> {
        Ok(comment_repo::count_top_level_comments(&self.pool, post_id).await?)
    }

    async fn list_replies(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>> {
        Ok(comment_repo::find_replies(&self.pool, parent_ids).await?)
    }

    async fn latest_top_level_comments(
        &self,
        post_ids: &[Uuid],
        per_post: i64,
    ) -> Result<Vec<Comment>> {
        Ok(comment_repo::find_latest_top_level_comments(&self.pool, post_ids, per_post).await?)
    }

    async fn reply_counts(&self, parent_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        Ok(comment_repo::count_replies_batch(&self.pool, parent_ids).await?)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
