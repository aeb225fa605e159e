use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// Create a like unless it already exists
/// Returns true when a new row was inserted
pub async fn create_like(pool: &PgPool, user_id: Uuid, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO likes (user_id, post_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, post_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a like (idempotent)
pub async fn delete_like(pool: &PgPool, user_id: Uuid, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM likes
        WHERE user_id = $1 AND post_id = $2
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count total likes for a post
pub async fn count_likes_by_post(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await
}

/// Batch check which of `post_ids` the user has liked
pub async fn liked_post_ids(
    pool: &PgPool,
    user_id: Uuid,
    post_ids: &[Uuid],
) -> Result<HashSet<Uuid>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let liked: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT post_id
        FROM likes
        WHERE user_id = $1 AND post_id = ANY($2)
        "#,
    )
    .bind(user_id)
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    Ok(liked.into_iter().collect())
}
