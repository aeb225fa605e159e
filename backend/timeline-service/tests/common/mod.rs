//! Shared helpers for HTTP integration tests.
//!
//! The app is wired exactly like the binary, minus CORS and logging, on top
//! of an `InMemoryStore`.

#![allow(dead_code)]

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use timeline_service::clock::SystemClock;
use timeline_service::db::InMemoryStore;
use timeline_service::middleware::Claims;
use timeline_service::services::{Services, TimelineOptions};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn services(store: Arc<InMemoryStore>) -> Services {
    Services::new(store, Arc::new(SystemClock), TimelineOptions::default())
}

pub fn create_test_jwt(user_id: Uuid, expires_in_seconds: i64, secret: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + expires_in_seconds) as usize,
        iat: Some(now as usize),
        username: None,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(user_id: Uuid) -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", create_test_jwt(user_id, 3600, TEST_SECRET)),
    )
}

/// Build the service under test from an `Arc<InMemoryStore>`.
macro_rules! test_app {
    ($store:expr) => {{
        let store: std::sync::Arc<timeline_service::db::InMemoryStore> = $store;
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($crate::common::services(store.clone())))
                .app_data(actix_web::web::Data::new(
                    timeline_service::handlers::HealthState::new(store),
                ))
                .route(
                    "/health/live",
                    actix_web::web::get().to(timeline_service::handlers::liveness_check),
                )
                .route(
                    "/health",
                    actix_web::web::get().to(timeline_service::handlers::health_summary),
                )
                .configure(timeline_service::handlers::configure)
                .wrap(timeline_service::middleware::JwtAuthMiddleware::new(
                    timeline_service::middleware::JwtVerifier::new($crate::common::TEST_SECRET),
                )),
        )
        .await
    }};
}
