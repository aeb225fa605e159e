/// Comment handlers - HTTP endpoints for comment operations
use super::PaginationParams;
use crate::error::Result;
use crate::middleware::Viewer;
use crate::services::{CommentDraft, Services};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(max = 100))]
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

/// Top-level comments of a post with their replies
pub async fn list_comments(
    services: web::Data<Services>,
    viewer: Option<Viewer>,
    post_id: web::Path<Uuid>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let (limit, offset) = query.normalized();
    let comments = services
        .comments
        .list(*post_id, viewer.map(|v| v.id()), limit, offset)
        .await?;

    Ok(HttpResponse::Ok().json(comments))
}

/// Create a new comment
pub async fn create_comment(
    services: web::Data<Services>,
    viewer: Viewer,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();
    let comment = services
        .comments
        .add(
            *post_id,
            viewer.id(),
            CommentDraft {
                content: req.content,
                parent_comment_id: req.parent_comment_id,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(comment))
}
