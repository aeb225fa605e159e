use crate::models::{User, UserChanges};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, display_name, avatar_url, bio, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, display_name, avatar_url, bio, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username.to_lowercase())
    .fetch_optional(pool)
    .await
}

/// Batch lookup for author summaries
pub async fn find_users_by_ids(pool: &PgPool, user_ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, display_name, avatar_url, bio, created_at
        FROM users
        WHERE id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await
}

pub async fn update_user(
    pool: &PgPool,
    user_id: Uuid,
    changes: &UserChanges,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET display_name = $2, bio = $3, avatar_url = $4
        WHERE id = $1
        RETURNING id, username, display_name, avatar_url, bio, created_at
        "#,
    )
    .bind(user_id)
    .bind(&changes.display_name)
    .bind(&changes.bio)
    .bind(&changes.avatar_url)
    .fetch_optional(pool)
    .await
}
