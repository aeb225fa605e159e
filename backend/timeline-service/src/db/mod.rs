/// Database access layer
///
/// - `store`: the `SocialStore` trait every service is written against
/// - `*_repo`: raw SQL functions over a `PgPool`
/// - `pg_store`: `SocialStore` over PostgreSQL, delegating to the repos
/// - `memory`: `SocialStore` kept in process memory
pub mod comment_repo;
pub mod follow_repo;
pub mod like_repo;
pub mod memory;
pub mod pg_store;
pub mod post_repo;
pub mod store;
pub mod user_repo;

pub use memory::InMemoryStore;
pub use pg_store::PgSocialStore;
pub use store::SocialStore;

/// Schema under `migrations/`, applied at startup when `RUN_MIGRATIONS` is on.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
