/// Comments with one level of nesting
use super::{RetweetResolver, VisibilityResolver};
use crate::clock::Clock;
use crate::db::SocialStore;
use crate::error::{AppError, Result};
use crate::metrics::engagement as metrics;
use crate::models::{Comment, CommentView, NewComment, Page, User, UserSummary};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_COMMENT_LENGTH: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct CommentDraft {
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn SocialStore>,
    clock: Arc<dyn Clock>,
    retweets: RetweetResolver,
    visibility: VisibilityResolver,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        clock: Arc<dyn Clock>,
        retweets: RetweetResolver,
        visibility: VisibilityResolver,
    ) -> Self {
        Self {
            store,
            clock,
            retweets,
            visibility,
        }
    }

    /// Top-level comments newest first, each with its replies oldest first.
    pub async fn list(
        &self,
        post_id: Uuid,
        viewer_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<CommentView>> {
        let target = self.retweets.resolve_target(post_id).await?;
        self.visibility.ensure_visible(&target, viewer_id).await?;

        let rows = self
            .store
            .list_top_level_comments(target.id, limit + 1, offset)
            .await?;
        let total = self.store.count_top_level_comments(target.id).await?;
        let page = Page::from_overfetch(rows, total, limit, offset);

        let parent_ids: Vec<Uuid> = page.items.iter().map(|c| c.id).collect();
        let replies = if parent_ids.is_empty() {
            Vec::new()
        } else {
            self.store.list_replies(&parent_ids).await?
        };

        let author_ids: Vec<Uuid> = page
            .items
            .iter()
            .chain(&replies)
            .map(|c| c.author_id)
            .collect();
        let authors = self.authors(&author_ids).await?;

        let mut replies_by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
        for reply in replies {
            if let Some(parent_id) = reply.parent_comment_id {
                replies_by_parent
                    .entry(parent_id)
                    .or_default()
                    .push(comment_view(reply, &authors, Vec::new()));
            }
        }

        Ok(page.map(|comment| {
            let replies = replies_by_parent.remove(&comment.id).unwrap_or_default();
            comment_view(comment, &authors, replies)
        }))
    }

    /// A reply to a reply is attached to the top-level ancestor.
    pub async fn add(
        &self,
        post_id: Uuid,
        viewer_id: Uuid,
        draft: CommentDraft,
    ) -> Result<CommentView> {
        let target = self.retweets.resolve_target(post_id).await?;
        self.visibility.ensure_visible(&target, Some(viewer_id)).await?;

        let content = draft.content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let parent_comment_id = match draft.parent_comment_id {
            Some(parent_id) => Some(self.top_level_parent(parent_id, target.id).await?),
            None => None,
        };

        let comment = self
            .store
            .insert_comment(NewComment {
                post_id: target.id,
                author_id: viewer_id,
                content,
                parent_comment_id,
                created_at: self.clock.now(),
            })
            .await?;

        metrics::record("comment", "created");
        tracing::info!(
            comment_id = %comment.id,
            post_id = %target.id,
            author_id = %viewer_id,
            reply = parent_comment_id.is_some(),
            "comment added"
        );

        let authors = self.authors(&[viewer_id]).await?;
        Ok(comment_view(comment, &authors, Vec::new()))
    }

    async fn top_level_parent(&self, parent_id: Uuid, target_id: Uuid) -> Result<Uuid> {
        let parent = self
            .store
            .find_comment(parent_id)
            .await?
            .filter(|c| c.post_id == target_id)
            .ok_or_else(|| {
                AppError::BadRequest("Parent comment does not belong to this post".to_string())
            })?;

        Ok(parent.parent_comment_id.unwrap_or(parent.id))
    }

    async fn authors(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>> {
        Ok(self
            .store
            .find_users(ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }
}

fn comment_view(
    comment: Comment,
    authors: &HashMap<Uuid, User>,
    replies: Vec<CommentView>,
) -> CommentView {
    CommentView {
        id: comment.id,
        post_id: comment.post_id,
        author: authors.get(&comment.author_id).map(UserSummary::from),
        content: comment.content,
        parent_comment_id: comment.parent_comment_id,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
        reply_count: replies.len() as i64,
        replies,
    }
}
