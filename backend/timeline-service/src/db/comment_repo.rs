use crate::models::{Comment, NewComment};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Create a new comment
pub async fn create_comment(pool: &PgPool, comment: &NewComment) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, post_id, author_id, content, parent_comment_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING id, post_id, author_id, content, parent_comment_id, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(comment.post_id)
    .bind(comment.author_id)
    .bind(&comment.content)
    .bind(comment.parent_comment_id)
    .bind(comment.created_at)
    .fetch_one(pool)
    .await
}

/// Find comment by ID
pub async fn find_comment_by_id(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, author_id, content, parent_comment_id, created_at, updated_at
        FROM comments
        WHERE id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}

/// Top-level comments for a post, newest first
pub async fn find_top_level_comments(
    pool: &PgPool,
    post_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, author_id, content, parent_comment_id, created_at, updated_at
        FROM comments
        WHERE post_id = $1 AND parent_comment_id IS NULL
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(post_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Count top-level comments for a post
pub async fn count_top_level_comments(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM comments WHERE post_id = $1 AND parent_comment_id IS NULL",
    )
    .bind(post_id)
    .fetch_one(pool)
    .await
}

/// Replies to a batch of comments, oldest first
pub async fn find_replies(pool: &PgPool, parent_ids: &[Uuid]) -> Result<Vec<Comment>, sqlx::Error> {
    if parent_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, author_id, content, parent_comment_id, created_at, updated_at
        FROM comments
        WHERE parent_comment_id = ANY($1)
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(parent_ids)
    .fetch_all(pool)
    .await
}

/// Newest `per_post` top-level comments of each post in one query
pub async fn find_latest_top_level_comments(
    pool: &PgPool,
    post_ids: &[Uuid],
    per_post: i64,
) -> Result<Vec<Comment>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, post_id, author_id, content, parent_comment_id, created_at, updated_at
        FROM (
            SELECT c.*,
                   ROW_NUMBER() OVER (
                       PARTITION BY c.post_id
                       ORDER BY c.created_at DESC, c.id DESC
                   ) AS rn
            FROM comments c
            WHERE c.post_id = ANY($1) AND c.parent_comment_id IS NULL
        ) ranked
        WHERE rn <= $2
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(post_ids)
    .bind(per_post)
    .fetch_all(pool)
    .await
}

/// Reply count per parent comment
pub async fn count_replies_batch(
    pool: &PgPool,
    parent_ids: &[Uuid],
) -> Result<HashMap<Uuid, i64>, sqlx::Error> {
    if parent_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT parent_comment_id, COUNT(*) AS count
        FROM comments
        WHERE parent_comment_id = ANY($1)
        GROUP BY parent_comment_id
        "#,
    )
    .bind(parent_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
