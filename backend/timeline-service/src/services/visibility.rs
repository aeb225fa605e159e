/// Visibility rules for posts
use crate::db::SocialStore;
use crate::error::{AppError, Result};
use crate::models::{Post, PostVisibility};
use std::sync::Arc;
use uuid::Uuid;

/// PUBLIC posts are visible to anyone. PRIVATE posts only to their author
/// or to a viewer that follows the author. No viewer sees PUBLIC only.
pub fn can_view(post: &Post, viewer_id: Option<Uuid>, viewer_follows_author: bool) -> bool {
    match post.visibility {
        PostVisibility::Public => true,
        PostVisibility::Private => match viewer_id {
            Some(viewer_id) => viewer_id == post.author_id || viewer_follows_author,
            None => false,
        },
    }
}

#[derive(Clone)]
pub struct VisibilityResolver {
    store: Arc<dyn SocialStore>,
}

impl VisibilityResolver {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Only hits the follow graph for a PRIVATE post seen by someone other
    /// than its author.
    pub async fn can_view(&self, post: &Post, viewer_id: Option<Uuid>) -> Result<bool> {
        let follows = match (post.visibility, viewer_id) {
            (PostVisibility::Private, Some(viewer_id)) if viewer_id != post.author_id => {
                self.store.is_following(viewer_id, post.author_id).await?
            }
            _ => false,
        };

        Ok(can_view(post, viewer_id, follows))
    }

    pub async fn ensure_visible(&self, post: &Post, viewer_id: Option<Uuid>) -> Result<()> {
        if self.can_view(post, viewer_id).await? {
            Ok(())
        } else {
            tracing::debug!(post_id = %post.id, viewer_id = ?viewer_id, "post hidden from viewer");
            Err(AppError::post_is_private())
        }
    }

    /// Load a post and check it against the viewer.
    pub async fn ensure_can_view(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<Post> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(AppError::post_not_found)?;

        self.ensure_visible(&post, viewer_id).await?;
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{NewPost, PostKind};
    use chrono::Utc;

    fn post(author_id: Uuid, visibility: PostVisibility) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            author_id,
            kind: PostKind::Original,
            original_post_id: None,
            content: Some("hello".into()),
            image_url: None,
            visibility,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_posts_are_visible_to_everyone() {
        let public = post(Uuid::new_v4(), PostVisibility::Public);
        assert!(can_view(&public, None, false));
        assert!(can_view(&public, Some(Uuid::new_v4()), false));
        assert!(can_view(&public, Some(public.author_id), false));
    }

    #[test]
    fn private_posts_need_author_or_follower() {
        let private = post(Uuid::new_v4(), PostVisibility::Private);
        let stranger = Uuid::new_v4();

        assert!(!can_view(&private, None, false));
        assert!(!can_view(&private, Some(stranger), false));
        assert!(can_view(&private, Some(stranger), true));
        assert!(can_view(&private, Some(private.author_id), false));
    }

    #[tokio::test]
    async fn resolver_consults_follow_graph() {
        let store = Arc::new(InMemoryStore::new());
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        let carol = store.add_user("carol").await;
        let private = store
            .insert_post(NewPost {
                author_id: alice.id,
                kind: PostKind::Original,
                original_post_id: None,
                content: Some("secret".into()),
                image_url: None,
                visibility: PostVisibility::Private,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store.insert_follow(bob.id, alice.id).await.unwrap();

        let resolver = VisibilityResolver::new(store.clone());
        assert!(resolver.can_view(&private, Some(bob.id)).await.unwrap());
        assert!(resolver.can_view(&private, Some(alice.id)).await.unwrap());
        assert!(!resolver.can_view(&private, Some(carol.id)).await.unwrap());
        assert!(!resolver.can_view(&private, None).await.unwrap());

        let err = resolver
            .ensure_can_view(private.id, Some(carol.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = resolver
            .ensure_can_view(Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
