/// Post lifecycle: create, read, edit, delete
use super::{RetweetResolver, TimelineBuilder, VisibilityResolver};
use crate::clock::Clock;
use crate::db::SocialStore;
use crate::error::{AppError, Result};
use crate::middleware::permissions::{check_post_deletion, check_post_update};
use crate::models::{NewPost, PostChanges, PostKind, PostView, PostVisibility};
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_POST_LENGTH: usize = 280;

/// Fields of a new post as received from a client.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub visibility: Option<PostVisibility>,
}

/// Partial edit: `None` keeps the current value, an empty string clears it.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub visibility: Option<PostVisibility>,
}

/// Trimmed value, `None` when blank.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_body(content: &Option<String>, image_url: &Option<String>) -> Result<()> {
    if content.is_none() && image_url.is_none() {
        return Err(AppError::BadRequest(
            "Content or image is required".to_string(),
        ));
    }
    if let Some(content) = content {
        if content.chars().count() > MAX_POST_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Content must be at most {} characters",
                MAX_POST_LENGTH
            )));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn SocialStore>,
    clock: Arc<dyn Clock>,
    visibility: VisibilityResolver,
    retweets: RetweetResolver,
    timeline: TimelineBuilder,
}

impl PostService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        clock: Arc<dyn Clock>,
        visibility: VisibilityResolver,
        retweets: RetweetResolver,
        timeline: TimelineBuilder,
    ) -> Self {
        Self {
            store,
            clock,
            visibility,
            retweets,
            timeline,
        }
    }

    pub async fn create_post(&self, viewer_id: Uuid, draft: PostDraft) -> Result<PostView> {
        let content = normalize(draft.content);
        let image_url = normalize(draft.image_url);
        check_body(&content, &image_url)?;

        let post = self
            .store
            .insert_post(NewPost {
                author_id: viewer_id,
                kind: PostKind::Original,
                original_post_id: None,
                content,
                image_url,
                visibility: draft.visibility.unwrap_or_default(),
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(post_id = %post.id, author_id = %viewer_id, visibility = ?post.visibility, "post created");
        self.timeline.render_one(post, Some(viewer_id)).await
    }

    pub async fn get_post(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<PostView> {
        let post = self.visibility.ensure_can_view(post_id, viewer_id).await?;

        // A retweet row keeps the visibility its original had when retweeted
        if post.is_retweet() {
            let target = self.retweets.target_of(post.clone()).await?;
            self.visibility.ensure_visible(&target, viewer_id).await?;
        }

        self.timeline.render_one(post, viewer_id).await
    }

    pub async fn update_post(
        &self,
        post_id: Uuid,
        viewer_id: Uuid,
        patch: PostPatch,
    ) -> Result<PostView> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(AppError::post_not_found)?;

        check_post_update(viewer_id, &post)?;

        let content = match patch.content {
            Some(content) => normalize(Some(content)),
            None => post.content,
        };
        let image_url = match patch.image_url {
            Some(image_url) => normalize(Some(image_url)),
            None => post.image_url,
        };
        check_body(&content, &image_url)?;

        let updated = self
            .store
            .update_post(
                post_id,
                PostChanges {
                    content,
                    image_url,
                    visibility: patch.visibility.unwrap_or(post.visibility),
                    updated_at: self.clock.now(),
                },
            )
            .await?
            .ok_or_else(AppError::post_not_found)?;

        tracing::info!(%post_id, author_id = %viewer_id, "post updated");
        self.timeline.render_one(updated, Some(viewer_id)).await
    }

    /// Deleting an ORIGINAL takes its retweets with it; deleting a RETWEET
    /// leaves the original alone.
    pub async fn delete_post(&self, post_id: Uuid, viewer_id: Uuid) -> Result<()> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(AppError::post_not_found)?;

        check_post_deletion(viewer_id, &post)?;

        if !self.store.delete_post(post_id).await? {
            return Err(AppError::post_not_found());
        }

        tracing::info!(%post_id, kind = %post.kind, author_id = %viewer_id, "post deleted");
        Ok(())
    }
}
