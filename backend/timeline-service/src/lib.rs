/// Timeline Service Library
///
/// Twitter-style social backend: posts and retweets, follows, likes and
/// comments, and the timeline logic that ties them together.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route registration
/// - `models`: Entities, view types and pagination envelopes
/// - `services`: Visibility, retweet resolution, engagement, timelines
/// - `db`: `SocialStore` trait with PostgreSQL and in-memory implementations
/// - `clock`: Injected time source
/// - `middleware`: JWT viewer boundary and request metrics
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
/// - `openapi`: API document
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
