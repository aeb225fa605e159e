/// User handlers - profiles, user posts and follow graph
use super::PaginationParams;
use crate::error::Result;
use crate::middleware::Viewer;
use crate::services::{ProfilePatch, Services};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

/// `avatarUrl: null` clears the avatar; an absent key keeps it.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "super::posts::nullable")]
    pub avatar_url: Option<Option<String>>,
}

pub async fn get_profile(
    services: web::Data<Services>,
    viewer: Option<Viewer>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let profile = services
        .users
        .profile(&username, viewer.map(|v| v.id()))
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Posts authored by a user, PRIVATE ones only for the user and followers
pub async fn get_user_posts(
    services: web::Data<Services>,
    viewer: Option<Viewer>,
    username: web::Path<String>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let (limit, offset) = query.normalized();
    let posts = services
        .users
        .posts(&username, viewer.map(|v| v.id()), limit, offset)
        .await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn follow_user(
    services: web::Data<Services>,
    viewer: Viewer,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let state = services.users.follow(viewer.id(), &username).await?;
    Ok(HttpResponse::Created().json(state))
}

pub async fn unfollow_user(
    services: web::Data<Services>,
    viewer: Viewer,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let state = services.users.unfollow(viewer.id(), &username).await?;
    Ok(HttpResponse::Ok().json(state))
}

/// PATCH /api/users/me
pub async fn update_my_profile(
    services: web::Data<Services>,
    viewer: Viewer,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();

    let profile = services
        .users
        .update_profile(
            viewer.id(),
            ProfilePatch {
                display_name: req.display_name,
                bio: req.bio,
                avatar_url: req.avatar_url.map(Option::unwrap_or_default),
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}
