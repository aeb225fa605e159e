use crate::models::{EngagementCounts, NewPost, Post, PostChanges, PostFilter};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const POST_COLUMNS: &str = "id, author_id, kind, original_post_id, content, image_url, visibility, \
                            created_at, updated_at";

/// Append the WHERE clause for a feed filter
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    match filter {
        PostFilter::PublicOnly => {
            builder.push(" WHERE visibility = 'PUBLIC'");
        }
        PostFilter::VisibleTo {
            viewer_id,
            followed_ids,
        } => {
            builder.push(" WHERE (visibility = 'PUBLIC' OR author_id = ");
            builder.push_bind(*viewer_id);
            builder.push(" OR (visibility = 'PRIVATE' AND author_id = ANY(");
            builder.push_bind(followed_ids.clone());
            builder.push(")))");
        }
        PostFilter::AuthoredByAny(author_ids) => {
            builder.push(" WHERE author_id = ANY(");
            builder.push_bind(author_ids.clone());
            builder.push(")");
        }
        PostFilter::AuthoredBy {
            author_id,
            include_private,
        } => {
            builder.push(" WHERE author_id = ");
            builder.push_bind(*author_id);
            if !include_private {
                builder.push(" AND visibility = 'PUBLIC'");
            }
        }
    }
}

/// Create a post row (original or retweet)
pub async fn create_post(pool: &PgPool, post: &NewPost) -> Result<Post, sqlx::Error> {
    let query = format!(
        r#"
        INSERT INTO posts (id, author_id, kind, original_post_id, content, image_url, visibility,
                           created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING {POST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Post>(&query)
        .bind(Uuid::new_v4())
        .bind(post.author_id)
        .bind(post.kind)
        .bind(post.original_post_id)
        .bind(post.content.as_deref())
        .bind(post.image_url.as_deref())
        .bind(post.visibility)
        .bind(post.created_at)
        .fetch_one(pool)
        .await
}

/// Insert a retweet unless the author already retweeted the same original.
/// Returns true when a row was created.
pub async fn create_retweet_if_absent(pool: &PgPool, retweet: &NewPost) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (id, author_id, kind, original_post_id, visibility, created_at, updated_at)
        VALUES ($1, $2, 'RETWEET', $3, $4, $5, $5)
        ON CONFLICT (author_id, original_post_id) WHERE kind = 'RETWEET' DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(retweet.author_id)
    .bind(retweet.original_post_id)
    .bind(retweet.visibility)
    .bind(retweet.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Find a post by ID
pub async fn find_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");

    sqlx::query_as::<_, Post>(&query)
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Find several posts by ID in one round trip (order not guaranteed)
pub async fn find_posts_by_ids(pool: &PgPool, post_ids: &[Uuid]) -> Result<Vec<Post>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ANY($1)");

    sqlx::query_as::<_, Post>(&query)
        .bind(post_ids)
        .fetch_all(pool)
        .await
}

/// Replace the mutable fields of an original post
pub async fn update_post(
    pool: &PgPool,
    post_id: Uuid,
    changes: &PostChanges,
) -> Result<Option<Post>, sqlx::Error> {
    let query = format!(
        r#"
        UPDATE posts
        SET content = $2, image_url = $3, visibility = $4, updated_at = $5
        WHERE id = $1 AND kind = 'ORIGINAL'
        RETURNING {POST_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Post>(&query)
        .bind(post_id)
        .bind(changes.content.as_deref())
        .bind(changes.image_url.as_deref())
        .bind(changes.visibility)
        .bind(changes.updated_at)
        .fetch_optional(pool)
        .await
}

/// Hard delete; retweets, likes and comments go with it via ON DELETE CASCADE
pub async fn delete_post(pool: &PgPool, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Page of posts matching a feed filter, newest first
pub async fn list_posts(
    pool: &PgPool,
    filter: &PostFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {POST_COLUMNS} FROM posts"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    builder.build_query_as::<Post>().fetch_all(pool).await
}

/// Count posts matching a feed filter
pub async fn count_posts(pool: &PgPool, filter: &PostFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
    push_filter(&mut builder, filter);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Find the retweet `author_id` made of `original_post_id`, if any
pub async fn find_retweet(
    pool: &PgPool,
    author_id: Uuid,
    original_post_id: Uuid,
) -> Result<Option<Post>, sqlx::Error> {
    let query = format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE author_id = $1 AND original_post_id = $2 AND kind = 'RETWEET'
        "#
    );

    sqlx::query_as::<_, Post>(&query)
        .bind(author_id)
        .bind(original_post_id)
        .fetch_optional(pool)
        .await
}

/// Remove every retweet `author_id` made of `original_post_id`
pub async fn delete_retweets(
    pool: &PgPool,
    author_id: Uuid,
    original_post_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM posts
        WHERE author_id = $1 AND original_post_id = $2 AND kind = 'RETWEET'
        "#,
    )
    .bind(author_id)
    .bind(original_post_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Count retweets of an original post
pub async fn count_retweets(pool: &PgPool, original_post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM posts WHERE original_post_id = $1 AND kind = 'RETWEET'",
    )
    .bind(original_post_id)
    .fetch_one(pool)
    .await
}

/// Batch check which originals `author_id` has retweeted
pub async fn retweeted_post_ids(
    pool: &PgPool,
    author_id: Uuid,
    original_ids: &[Uuid],
) -> Result<HashSet<Uuid>, sqlx::Error> {
    if original_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT original_post_id
        FROM posts
        WHERE author_id = $1 AND kind = 'RETWEET' AND original_post_id = ANY($2)
        "#,
    )
    .bind(author_id)
    .bind(original_ids)
    .fetch_all(pool)
    .await?;

    Ok(ids.into_iter().collect())
}

/// Like/comment/retweet counts for a batch of posts, recomputed from rows
pub async fn engagement_counts(
    pool: &PgPool,
    post_ids: &[Uuid],
) -> Result<HashMap<Uuid, EngagementCounts>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (Uuid, i64, i64, i64)>(
        r#"
        SELECT p.id,
               (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
               (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
               (SELECT COUNT(*) FROM posts r
                 WHERE r.original_post_id = p.id AND r.kind = 'RETWEET') AS retweet_count
        FROM posts p
        WHERE p.id = ANY($1)
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(post_id, likes, comments, retweets)| {
            (
                post_id,
                EngagementCounts {
                    likes,
                    comments,
                    retweets,
                },
            )
        })
        .collect())
}
