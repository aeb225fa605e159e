/// HTTP handlers for timeline-service
///
/// - Posts: feeds, post lifecycle, likes and retweets
/// - Comments: listing and adding comments on a post
/// - Users: profiles, user posts, follow graph
/// - Health: liveness and readiness probes
pub mod comments;
pub mod health;
pub mod posts;
pub mod users;

pub use comments::{create_comment, list_comments};
pub use health::{health_summary, liveness_check, readiness_summary, HealthState};
pub use posts::{
    create_post, delete_post, get_feed, get_post, like_post, list_posts, retweet_post,
    unlike_post, unretweet_post, update_post,
};
pub use users::{follow_user, get_profile, get_user_posts, unfollow_user, update_my_profile};

use crate::error::AppError;
use actix_web::{guard, web};
use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Offset pagination query. Out-of-range values fall back to defaults
/// instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// `(limit, offset)` with limit in 1..=100 (else 20) and offset >= 0.
    pub fn normalized(&self) -> (i64, i64) {
        let limit = match self.limit {
            Some(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
            _ => DEFAULT_LIMIT,
        };
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Register every `/api` route on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|_, _| AppError::post_not_found().into()),
    )
    .service(
        web::scope("/api")
            .service(
                web::scope("/posts")
                    .service(
                        web::resource("")
                            .route(web::get().to(list_posts))
                            .route(web::post().to(create_post)),
                    )
                    .route("/feed", web::get().to(get_feed))
                    .service(
                        web::resource("/{post_id}")
                            .route(web::get().to(get_post))
                            .route(web::patch().to(update_post))
                            .route(web::delete().to(delete_post)),
                    )
                    .service(
                        web::resource("/{post_id}/like")
                            .route(web::post().to(like_post))
                            .route(web::delete().to(unlike_post)),
                    )
                    .service(
                        web::resource("/{post_id}/retweet")
                            .route(web::post().to(retweet_post))
                            .route(web::delete().to(unretweet_post)),
                    )
                    .service(
                        web::resource("/{post_id}/comments")
                            .route(web::get().to(list_comments))
                            .route(web::post().to(create_comment)),
                    ),
            )
            .service(
                web::scope("/users")
                    // other methods on /me fall through to the username routes
                    .service(
                        web::resource("/me")
                            .guard(guard::Patch())
                            .route(web::patch().to(update_my_profile)),
                    )
                    .route("/{username}", web::get().to(get_profile))
                    .route("/{username}/posts", web::get().to(get_user_posts))
                    .service(
                        web::resource("/{username}/follow")
                            .route(web::post().to(follow_user))
                            .route(web::delete().to(unfollow_user)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<i64>, offset: Option<i64>) -> PaginationParams {
        PaginationParams { limit, offset }
    }

    #[test]
    fn pagination_falls_back_to_defaults() {
        assert_eq!(params(None, None).normalized(), (20, 0));
        assert_eq!(params(Some(0), Some(-5)).normalized(), (20, 0));
        assert_eq!(params(Some(101), Some(40)).normalized(), (20, 40));
        assert_eq!(params(Some(100), Some(0)).normalized(), (100, 0));
        assert_eq!(params(Some(1), Some(3)).normalized(), (1, 3));
    }
}
