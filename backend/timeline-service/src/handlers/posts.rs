/// Post handlers - feeds, post lifecycle, likes and retweets
use super::PaginationParams;
use crate::error::Result;
use crate::middleware::Viewer;
use crate::models::{FeedType, PostVisibility};
use crate::services::{Feed, PostDraft, PostPatch, Services, TimelineQuery};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(rename = "type")]
    pub feed_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(max = 280))]
    pub content: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    pub visibility: Option<PostVisibility>,
}

/// `imageUrl: null` clears the image; an absent key keeps it.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(max = 280))]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    pub visibility: Option<PostVisibility>,
}

pub(super) fn nullable<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

async fn timeline(
    services: &Services,
    viewer: Option<Viewer>,
    params: PaginationParams,
    feed: Feed,
) -> Result<HttpResponse> {
    let (limit, offset) = params.normalized();
    let page = services
        .timeline
        .build(TimelineQuery {
            limit,
            offset,
            viewer_id: viewer.map(|v| v.id()),
            feed,
        })
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/posts?limit&offset&type=all|following
pub async fn list_posts(
    services: web::Data<Services>,
    viewer: Option<Viewer>,
    query: web::Query<FeedParams>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let feed_type = query
        .feed_type
        .as_deref()
        .and_then(|t| t.parse::<FeedType>().ok())
        .unwrap_or_default();
    let params = PaginationParams {
        limit: query.limit,
        offset: query.offset,
    };

    timeline(&services, viewer, params, feed_type.into()).await
}

/// GET /api/posts/feed - the `all` feed
pub async fn get_feed(
    services: web::Data<Services>,
    viewer: Option<Viewer>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    timeline(&services, viewer, query.into_inner(), Feed::All).await
}

/// Create a new post
pub async fn create_post(
    services: web::Data<Services>,
    viewer: Viewer,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();

    let post = services
        .posts
        .create_post(
            viewer.id(),
            PostDraft {
                content: req.content,
                image_url: req.image_url,
                visibility: req.visibility,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(post))
}

/// Get a post by ID
pub async fn get_post(
    services: web::Data<Services>,
    viewer: Option<Viewer>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = services
        .posts
        .get_post(*post_id, viewer.map(|v| v.id()))
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Edit an ORIGINAL post
pub async fn update_post(
    services: web::Data<Services>,
    viewer: Viewer,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();

    let post = services
        .posts
        .update_post(
            *post_id,
            viewer.id(),
            PostPatch {
                content: req.content,
                image_url: req.image_url.map(Option::unwrap_or_default),
                visibility: req.visibility,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    services: web::Data<Services>,
    viewer: Viewer,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    services.posts.delete_post(*post_id, viewer.id()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn like_post(
    services: web::Data<Services>,
    viewer: Viewer,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let state = services.engagement.like(*post_id, viewer.id()).await?;
    Ok(HttpResponse::Created().json(state))
}

pub async fn unlike_post(
    services: web::Data<Services>,
    viewer: Viewer,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let state = services.engagement.unlike(*post_id, viewer.id()).await?;
    Ok(HttpResponse::Ok().json(state))
}

pub async fn retweet_post(
    services: web::Data<Services>,
    viewer: Viewer,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let state = services.retweets.retweet(*post_id, viewer.id()).await?;
    Ok(HttpResponse::Created().json(state))
}

pub async fn unretweet_post(
    services: web::Data<Services>,
    viewer: Viewer,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let state = services.retweets.unretweet(*post_id, viewer.id()).await?;
    Ok(HttpResponse::Ok().json(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let cleared: UpdatePostRequest =
            serde_json::from_str(r#"{"imageUrl": null}"#).unwrap();
        assert_eq!(cleared.image_url, Some(None));

        let kept: UpdatePostRequest = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(kept.image_url, None);
        assert_eq!(kept.content.as_deref(), Some("hi"));
    }

    #[test]
    fn create_request_enforces_length() {
        let req: CreatePostRequest = serde_json::from_value(serde_json::json!({
            "content": "x".repeat(281),
            "visibility": "PRIVATE"
        }))
        .unwrap();
        assert!(req.validate().is_err());
        assert_eq!(req.visibility, Some(PostVisibility::Private));
    }
}
