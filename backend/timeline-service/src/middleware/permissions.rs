/// Ownership checks for post mutations
use crate::error::{AppError, Result};
use crate::models::Post;
use uuid::Uuid;

/// Only the author of a post may modify it.
pub fn check_post_ownership(user_id: Uuid, post: &Post) -> Result<()> {
    if post.author_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You don't have permission to modify this post".to_string(),
        ))
    }
}

/// Edits need ownership and an ORIGINAL post.
pub fn check_post_update(user_id: Uuid, post: &Post) -> Result<()> {
    check_post_ownership(user_id, post)?;
    if post.is_retweet() {
        return Err(AppError::BadRequest("Retweets cannot be edited".to_string()));
    }
    Ok(())
}

/// Any post, ORIGINAL or RETWEET, can be deleted by its creator.
pub fn check_post_deletion(user_id: Uuid, post: &Post) -> Result<()> {
    check_post_ownership(user_id, post)
}
