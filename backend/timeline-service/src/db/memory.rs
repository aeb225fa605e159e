//! In-memory `SocialStore` used by tests and by `STORAGE_BACKEND=memory`.
//!
//! Enforces the same uniqueness and cascade rules as the PostgreSQL schema.

use super::SocialStore;
use crate::error::Result;
use crate::models::{
    Comment, EngagementCounts, NewComment, NewPost, Post, PostChanges, PostFilter, PostKind, User,
    UserChanges,
};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    /// (follower_id, following_id)
    follows: HashSet<(Uuid, Uuid)>,
    /// (user_id, post_id)
    likes: HashSet<(Uuid, Uuid)>,
    comments: HashMap<Uuid, Comment>,
}

impl State {
    fn is_retweet_of(post: &Post, author_id: Uuid, original_post_id: Uuid) -> bool {
        post.kind == PostKind::Retweet
            && post.author_id == author_id
            && post.original_post_id == Some(original_post_id)
    }

    fn retweet_count(&self, original_post_id: Uuid) -> i64 {
        self.posts
            .values()
            .filter(|p| p.kind == PostKind::Retweet && p.original_post_id == Some(original_post_id))
            .count() as i64
    }
}

fn newest_first(a_created: &chrono::DateTime<Utc>, a_id: &Uuid, b_created: &chrono::DateTime<Utc>, b_id: &Uuid) -> Ordering {
    b_created.cmp(a_created).then_with(|| b_id.cmp(a_id))
}

fn paginate<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user; usernames are lowercased like the users table does.
    pub async fn add_user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_lowercase(),
            display_name: Some(username.to_string()),
            avatar_url: None,
            bio: None,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    pub async fn post_count(&self) -> usize {
        self.state.read().await.posts.len()
    }
}

#[async_trait]
impl SocialStore for InMemoryStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_lowercase();
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&user_id).map(|user| {
            user.display_name = changes.display_name;
            user.bio = changes.bio;
            user.avatar_url = changes.avatar_url;
            user.clone()
        }))
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .contains(&(follower_id, following_id)))
    }

    async fn following_ids(&self, follower_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .follows
            .iter()
            .filter(|(follower, _)| *follower == follower_id)
            .map(|(_, following)| *following)
            .collect())
    }

    async fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .follows
            .insert((follower_id, following_id)))
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .follows
            .remove(&(follower_id, following_id)))
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<(i64, i64)> {
        let state = self.state.read().await;
        let followers = state.follows.iter().filter(|(_, f)| *f == user_id).count();
        let following = state.follows.iter().filter(|(f, _)| *f == user_id).count();
        Ok((followers as i64, following as i64))
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn find_posts(&self, post_ids: &[Uuid]) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        Ok(post_ids
            .iter()
            .filter_map(|id| state.posts.get(id).cloned())
            .collect())
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let row = Post {
            id: Uuid::new_v4(),
            author_id: post.author_id,
            kind: post.kind,
            original_post_id: post.original_post_id,
            content: post.content,
            image_url: post.image_url,
            visibility: post.visibility,
            created_at: post.created_at,
            updated_at: post.created_at,
        };
        self.state.write().await.posts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        if post.kind != PostKind::Original {
            return Ok(None);
        }
        post.content = changes.content;
        post.image_url = changes.image_url;
        post.visibility = changes.visibility;
        post.updated_at = changes.updated_at;
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Ok(false);
        }

        let doomed: HashSet<Uuid> = state
            .posts
            .values()
            .filter(|p| p.id == post_id || p.original_post_id == Some(post_id))
            .map(|p| p.id)
            .collect();

        state.posts.retain(|id, _| !doomed.contains(id));
        state.likes.retain(|(_, post)| !doomed.contains(post));
        state.comments.retain(|_, c| !doomed.contains(&c.post_id));
        Ok(true)
    }

    async fn list_posts(&self, filter: &PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut rows: Vec<Post> = state
            .posts
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| newest_first(&a.created_at, &a.id, &b.created_at, &b.id));
        Ok(paginate(rows, limit, offset))
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.posts.values().filter(|p| filter.matches(p)).count() as i64)
    }

    async fn find_retweet(&self, author_id: Uuid, original_post_id: Uuid) -> Result<Option<Post>> {
        Ok(self
            .state
            .read()
            .await
            .posts
            .values()
            .find(|p| State::is_retweet_of(p, author_id, original_post_id))
            .cloned())
    }

    async fn insert_retweet(&self, retweet: NewPost) -> Result<bool> {
        let Some(original_post_id) = retweet.original_post_id else {
            return Ok(false);
        };

        let mut state = self.state.write().await;
        let exists = state
            .posts
            .values()
            .any(|p| State::is_retweet_of(p, retweet.author_id, original_post_id));
        if exists {
            return Ok(false);
        }

        let row = Post {
            id: Uuid::new_v4(),
            author_id: retweet.author_id,
            kind: PostKind::Retweet,
            original_post_id: Some(original_post_id),
            content: None,
            image_url: None,
            visibility: retweet.visibility,
            created_at: retweet.created_at,
            updated_at: retweet.created_at,
        };
        state.posts.insert(row.id, row);
        Ok(true)
    }

    async fn delete_retweets(&self, author_id: Uuid, original_post_id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        let doomed: Vec<Uuid> = state
            .posts
            .values()
            .filter(|p| State::is_retweet_of(p, author_id, original_post_id))
            .map(|p| p.id)
            .collect();
        for id in &doomed {
            state.posts.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn count_retweets(&self, original_post_id: Uuid) -> Result<i64> {
        Ok(self.state.read().await.retweet_count(original_post_id))
    }

    async fn retweeted_post_ids(
        &self,
        author_id: Uuid,
        original_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .filter(|p| p.kind == PostKind::Retweet && p.author_id == author_id)
            .filter_map(|p| p.original_post_id)
            .filter(|id| original_ids.contains(id))
            .collect())
    }

    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.likes.insert((user_id, post_id)))
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.likes.remove(&(user_id, post_id)))
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.likes.iter().filter(|(_, p)| *p == post_id).count() as i64)
    }

    async fn liked_post_ids(&self, user_id: Uuid, post_ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        let state = self.state.read().await;
        Ok(post_ids
            .iter()
            .filter(|id| state.likes.contains(&(user_id, **id)))
            .copied()
            .collect())
    }

    async fn engagement_counts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EngagementCounts>> {
        let state = self.state.read().await;
        Ok(post_ids
            .iter()
            .filter(|id| state.posts.contains_key(id))
            .map(|id| {
                let counts = EngagementCounts {
                    likes: state.likes.iter().filter(|(_, p)| p == id).count() as i64,
                    comments: state.comments.values().filter(|c| c.post_id == *id).count() as i64,
                    retweets: state.retweet_count(*id),
                };
                (*id, counts)
            })
            .collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let row = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content,
            parent_comment_id: comment.parent_comment_id,
            created_at: comment.created_at,
            updated_at: comment.created_at,
        };
        self.state
            .write()
            .await
            .comments
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&comment_id).cloned())
    }

    async fn list_top_level_comments(
        &self,
        post_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut rows: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.parent_comment_id.is_none())
            .cloned()
            .collect();
        rows.sort_by(|a, b| newest_first(&a.created_at, &a.id, &b.created_at, &b.id));
        Ok(paginate(rows, limit, offset))
    }

    async fn count_top_level_comments(&self, post_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.parent_comment_id.is_none())
            .count() as i64)
    }

    async fn list_replies(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut rows: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| {
                c.parent_comment_id
                    .map(|parent| parent_ids.contains(&parent))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn latest_top_level_comments(
        &self,
        post_ids: &[Uuid],
        per_post: i64,
    ) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut rows: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.parent_comment_id.is_none() && post_ids.contains(&c.post_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| newest_first(&a.created_at, &a.id, &b.created_at, &b.id));

        let mut taken: HashMap<Uuid, i64> = HashMap::new();
        rows.retain(|c| {
            let n = taken.entry(c.post_id).or_insert(0);
            *n += 1;
            *n <= per_post
        });
        Ok(rows)
    }

    async fn reply_counts(&self, parent_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for parent in state.comments.values().filter_map(|c| c.parent_comment_id) {
            if parent_ids.contains(&parent) {
                *counts.entry(parent).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}
