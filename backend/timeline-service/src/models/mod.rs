/// Data models for timeline-service
///
/// Storage entities (`User`, `Post`, `Comment`) mirror the relational rows;
/// follows and likes are plain id pairs. View types (`PostView`,
/// `CommentView`, `UserProfile`, ...) are what handlers serialize; they use
/// camelCase keys.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =====================================================================
// Entities
// =====================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PostKind {
    Original,
    Retweet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_visibility", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PostVisibility {
    Public,
    Private,
}

impl Default for PostVisibility {
    fn default() -> Self {
        PostVisibility::Public
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKind::Original => f.write_str("ORIGINAL"),
            PostKind::Retweet => f.write_str("RETWEET"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub kind: PostKind,
    pub original_post_id: Option<Uuid>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub visibility: PostVisibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_retweet(&self) -> bool {
        self.kind == PostKind::Retweet
    }

    /// Id of the post engagement is aggregated on.
    pub fn target_id(&self) -> Uuid {
        match (self.kind, self.original_post_id) {
            (PostKind::Retweet, Some(original)) => original,
            _ => self.id,
        }
    }
}

/// Insert payload for a post row.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub kind: PostKind,
    pub original_post_id: Option<Uuid>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub visibility: PostVisibility,
    pub created_at: DateTime<Utc>,
}

/// Full replacement of the mutable fields of an ORIGINAL post.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub visibility: PostVisibility,
    pub updated_at: DateTime<Utc>,
}

/// Full replacement of the editable profile fields of a user.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// =====================================================================
// Feed selection
// =====================================================================

/// Row filter the timeline builder hands to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// Anonymous "all" feed.
    PublicOnly,
    /// PUBLIC ∨ authored by viewer ∨ (PRIVATE ∧ author followed by viewer).
    VisibleTo {
        viewer_id: Uuid,
        followed_ids: Vec<Uuid>,
    },
    /// Posts authored by any of the given ids.
    AuthoredByAny(Vec<Uuid>),
    /// One author's posts; PRIVATE ones only when `include_private`.
    AuthoredBy {
        author_id: Uuid,
        include_private: bool,
    },
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::PublicOnly => post.visibility == PostVisibility::Public,
            PostFilter::VisibleTo {
                viewer_id,
                followed_ids,
            } => {
                post.visibility == PostVisibility::Public
                    || post.author_id == *viewer_id
                    || followed_ids.contains(&post.author_id)
            }
            PostFilter::AuthoredByAny(ids) => ids.contains(&post.author_id),
            PostFilter::AuthoredBy {
                author_id,
                include_private,
            } => {
                post.author_id == *author_id
                    && (*include_private || post.visibility == PostVisibility::Public)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    All,
    Following,
}

impl Default for FeedType {
    fn default() -> Self {
        FeedType::All
    }
}

impl FromStr for FeedType {
    type Err = std::convert::Infallible;

    /// Unknown values fall back to `all`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "following" => FeedType::Following,
            _ => FeedType::All,
        })
    }
}

// =====================================================================
// Views
// =====================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementCounts {
    pub likes: i64,
    pub comments: i64,
    pub retweets: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPreview {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<UserSummary>,
    pub reply_count: i64,
}

/// A post as seen by a viewer. For retweets the content, author and
/// engagement fields describe the target post; `id` stays the retweet's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub kind: PostKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_post_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposted_by: Option<UserSummary>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub visibility: PostVisibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<UserSummary>,
    pub like_count: i64,
    pub comment_count: i64,
    pub retweet_count: i64,
    pub liked_by_me: bool,
    pub retweeted_by_me: bool,
    pub comments_preview: Vec<CommentPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Option<UserSummary>,
    pub reply_count: i64,
    pub replies: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub is_following: bool,
    pub is_me: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked_by_me: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetweetState {
    pub retweeted_by_me: bool,
    pub retweet_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    pub is_following: bool,
}

/// Offset pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from up to `limit + 1` fetched rows.
    pub fn from_overfetch(mut rows: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        let has_more = rows.len() as i64 > limit;
        if has_more {
            rows.truncate(limit as usize);
        }
        Self {
            items: rows,
            total,
            limit,
            offset,
            has_more,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(author_id: Uuid, visibility: PostVisibility) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            author_id,
            kind: PostKind::Original,
            original_post_id: None,
            content: Some("hello".into()),
            image_url: None,
            visibility,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn target_id_points_at_original_for_retweets() {
        let original = post(Uuid::new_v4(), PostVisibility::Public);
        let mut retweet = post(Uuid::new_v4(), PostVisibility::Public);
        retweet.kind = PostKind::Retweet;
        retweet.original_post_id = Some(original.id);
        retweet.content = None;

        assert_eq!(original.target_id(), original.id);
        assert_eq!(retweet.target_id(), original.id);
    }

    #[test]
    fn visible_to_filter_admits_followed_private_posts() {
        let viewer = Uuid::new_v4();
        let followed = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let filter = PostFilter::VisibleTo {
            viewer_id: viewer,
            followed_ids: vec![followed],
        };

        assert!(filter.matches(&post(stranger, PostVisibility::Public)));
        assert!(filter.matches(&post(followed, PostVisibility::Private)));
        assert!(filter.matches(&post(viewer, PostVisibility::Private)));
        assert!(!filter.matches(&post(stranger, PostVisibility::Private)));
    }

    #[test]
    fn page_overfetch_sets_has_more() {
        let page = Page::from_overfetch(vec![1, 2, 3], 10, 2, 0);
        assert!(page.has_more);
        assert_eq!(page.items, vec![1, 2]);

        let page = Page::from_overfetch(vec![1, 2], 2, 2, 0);
        assert!(!page.has_more);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn unknown_feed_type_falls_back_to_all() {
        assert_eq!("following".parse::<FeedType>().unwrap(), FeedType::Following);
        assert_eq!("trending".parse::<FeedType>().unwrap(), FeedType::All);
    }

    #[test]
    fn post_view_uses_camel_case() {
        let state = LikeState {
            liked_by_me: true,
            like_count: 3,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["likedByMe"], true);
        assert_eq!(json["likeCount"], 3);
    }
}
