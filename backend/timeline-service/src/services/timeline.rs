/// Timeline building
///
/// A timeline is a page of posts ordered by (created_at desc, id desc),
/// rendered into `PostView`s with everything fetched in batches: targets of
/// retweets, authors, engagement counts, viewer flags and comment previews.
/// The number of store round trips does not depend on the page size.
use super::visibility::can_view;
use super::EngagementAggregator;
use crate::db::SocialStore;
use crate::error::{AppError, Result};
use crate::metrics::timeline as metrics;
use crate::models::{
    Comment, CommentPreview, FeedType, Page, Post, PostFilter, PostView, PostVisibility, User,
    UserSummary,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Top-level comments attached to every post view.
pub const COMMENTS_PREVIEW_SIZE: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Everything the viewer may see.
    All,
    /// Posts by accounts the viewer follows. Requires a viewer.
    Following,
    /// One author's posts (profile page).
    Author { author_id: Uuid },
}

impl Feed {
    fn label(&self) -> &'static str {
        match self {
            Feed::All => "all",
            Feed::Following => "following",
            Feed::Author { .. } => "author",
        }
    }
}

impl From<FeedType> for Feed {
    fn from(feed: FeedType) -> Self {
        match feed {
            FeedType::All => Feed::All,
            FeedType::Following => Feed::Following,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimelineQuery {
    pub limit: i64,
    pub offset: i64,
    pub viewer_id: Option<Uuid>,
    pub feed: Feed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineOptions {
    /// Whether the `following` feed also shows the viewer's own posts.
    pub following_includes_self: bool,
}

#[derive(Clone)]
pub struct TimelineBuilder {
    store: Arc<dyn SocialStore>,
    engagement: EngagementAggregator,
    options: TimelineOptions,
}

impl TimelineBuilder {
    pub fn new(
        store: Arc<dyn SocialStore>,
        engagement: EngagementAggregator,
        options: TimelineOptions,
    ) -> Self {
        Self {
            store,
            engagement,
            options,
        }
    }

    pub async fn build(&self, query: TimelineQuery) -> Result<Page<PostView>> {
        let feed = query.feed.label();
        let start = Instant::now();

        let filter = self.filter_for(&query).await?;
        let rows = self
            .store
            .list_posts(&filter, query.limit + 1, query.offset)
            .await?;
        let total = self.store.count_posts(&filter).await?;

        let Page {
            items,
            total,
            limit,
            offset,
            has_more,
        } = Page::from_overfetch(rows, total, query.limit, query.offset);
        let items = self.render(items, query.viewer_id).await?;

        metrics::TIMELINE_REQUEST_TOTAL.with_label_values(&[feed]).inc();
        metrics::TIMELINE_BUILD_DURATION_SECONDS
            .with_label_values(&[feed])
            .observe(start.elapsed().as_secs_f64());
        metrics::TIMELINE_PAGE_SIZE
            .with_label_values(&[feed])
            .observe(items.len() as f64);

        tracing::debug!(
            feed,
            viewer_id = ?query.viewer_id,
            limit,
            offset,
            returned = items.len(),
            has_more,
            "timeline built"
        );

        Ok(Page {
            items,
            total,
            limit,
            offset,
            has_more,
        })
    }

    async fn filter_for(&self, query: &TimelineQuery) -> Result<PostFilter> {
        match (query.feed, query.viewer_id) {
            (Feed::All, None) => Ok(PostFilter::PublicOnly),
            (Feed::All, Some(viewer_id)) => Ok(PostFilter::VisibleTo {
                viewer_id,
                followed_ids: self.store.following_ids(viewer_id).await?,
            }),
            (Feed::Following, None) => Err(AppError::missing_viewer()),
            (Feed::Following, Some(viewer_id)) => {
                let mut ids = self.store.following_ids(viewer_id).await?;
                if self.options.following_includes_self {
                    ids.push(viewer_id);
                } else {
                    ids.retain(|id| *id != viewer_id);
                }
                Ok(PostFilter::AuthoredByAny(ids))
            }
            (Feed::Author { author_id }, viewer_id) => {
                let include_private = match viewer_id {
                    Some(viewer_id) if viewer_id == author_id => true,
                    Some(viewer_id) => self.store.is_following(viewer_id, author_id).await?,
                    None => false,
                };
                Ok(PostFilter::AuthoredBy {
                    author_id,
                    include_private,
                })
            }
        }
    }

    /// Render a single post for `viewer_id`.
    pub async fn render_one(&self, post: Post, viewer_id: Option<Uuid>) -> Result<PostView> {
        self.render(vec![post], viewer_id)
            .await?
            .pop()
            .ok_or_else(AppError::post_not_found)
    }

    /// Render posts in order. Retweets whose target is gone or no longer
    /// visible to the viewer are dropped.
    pub async fn render(&self, posts: Vec<Post>, viewer_id: Option<Uuid>) -> Result<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let mut targets: HashMap<Uuid, Post> = posts
            .iter()
            .filter(|p| !p.is_retweet())
            .map(|p| (p.id, p.clone()))
            .collect();

        let missing = unique(
            posts
                .iter()
                .map(Post::target_id)
                .filter(|id| !targets.contains_key(id)),
        );
        if !missing.is_empty() {
            for post in self.store.find_posts(&missing).await? {
                targets.insert(post.id, post);
            }
        }

        let target_ids = unique(posts.iter().map(Post::target_id));
        let counts = self.engagement.counts(&target_ids).await?;
        let flags = self.engagement.viewer_flags(viewer_id, &target_ids).await?;
        let hidden = self.hidden_targets(&posts, &targets, viewer_id).await?;

        let previews = self
            .store
            .latest_top_level_comments(&target_ids, COMMENTS_PREVIEW_SIZE)
            .await?;
        let preview_ids: Vec<Uuid> = previews.iter().map(|c| c.id).collect();
        let reply_counts = if preview_ids.is_empty() {
            HashMap::new()
        } else {
            self.store.reply_counts(&preview_ids).await?
        };

        let user_ids = unique(
            posts
                .iter()
                .map(|p| p.author_id)
                .chain(targets.values().map(|p| p.author_id))
                .chain(previews.iter().map(|c| c.author_id)),
        );
        let users: HashMap<Uuid, User> = self
            .store
            .find_users(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut previews_by_post = group_previews(previews, &users, &reply_counts);

        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            let target_id = post.target_id();
            let Some(target) = targets.get(&target_id) else {
                tracing::warn!(post_id = %post.id, %target_id, "retweet target missing");
                continue;
            };
            if hidden.contains(&target_id) {
                continue;
            }

            let counts = counts.get(&target_id).copied().unwrap_or_default();
            let is_retweet = post.is_retweet();

            views.push(PostView {
                id: post.id,
                kind: post.kind,
                original_post_id: is_retweet.then_some(target_id),
                reposted_by: if is_retweet {
                    users.get(&post.author_id).map(UserSummary::from)
                } else {
                    None
                },
                content: target.content.clone(),
                image_url: target.image_url.clone(),
                visibility: target.visibility,
                created_at: post.created_at,
                updated_at: post.updated_at,
                author: users.get(&target.author_id).map(UserSummary::from),
                like_count: counts.likes,
                comment_count: counts.comments,
                retweet_count: counts.retweets,
                liked_by_me: flags.liked(&target_id),
                retweeted_by_me: flags.retweeted(&target_id),
                comments_preview: previews_by_post.remove(&target_id).unwrap_or_default(),
            });
        }

        Ok(views)
    }

    /// A retweet keeps the visibility its original had when it was made, so an
    /// original made PRIVATE later is re-checked here.
    async fn hidden_targets(
        &self,
        posts: &[Post],
        targets: &HashMap<Uuid, Post>,
        viewer_id: Option<Uuid>,
    ) -> Result<HashSet<Uuid>> {
        let suspects: Vec<&Post> = posts
            .iter()
            .filter(|p| p.is_retweet())
            .filter_map(|p| targets.get(&p.target_id()))
            .filter(|t| t.visibility == PostVisibility::Private && Some(t.author_id) != viewer_id)
            .collect();
        if suspects.is_empty() {
            return Ok(HashSet::new());
        }

        let followed: HashSet<Uuid> = match viewer_id {
            Some(viewer_id) => self
                .store
                .following_ids(viewer_id)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        Ok(suspects
            .into_iter()
            .filter(|t| !can_view(t, viewer_id, followed.contains(&t.author_id)))
            .map(|t| t.id)
            .collect())
    }
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

fn group_previews(
    mut comments: Vec<Comment>,
    users: &HashMap<Uuid, User>,
    reply_counts: &HashMap<Uuid, i64>,
) -> HashMap<Uuid, Vec<CommentPreview>> {
    comments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    let mut grouped: HashMap<Uuid, Vec<CommentPreview>> = HashMap::new();
    for comment in comments {
        grouped
            .entry(comment.post_id)
            .or_default()
            .push(CommentPreview {
                id: comment.id,
                author: users.get(&comment.author_id).map(UserSummary::from),
                reply_count: reply_counts.get(&comment.id).copied().unwrap_or(0),
                content: comment.content,
                created_at: comment.created_at,
            });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewComment, PostKind};
    use crate::services::testing::Fixture;

    fn query(feed: Feed, viewer_id: Option<Uuid>, limit: i64, offset: i64) -> TimelineQuery {
        TimelineQuery {
            limit,
            offset,
            viewer_id,
            feed,
        }
    }

    #[tokio::test]
    async fn pages_are_disjoint_and_contiguous() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        for i in 0..45 {
            fx.post(alice.id, &format!("post {i}"), PostVisibility::Public)
                .await;
        }
        let timeline = &fx.services.timeline;

        let first = timeline.build(query(Feed::All, None, 20, 0)).await.unwrap();
        let second = timeline.build(query(Feed::All, None, 20, 20)).await.unwrap();
        let third = timeline.build(query(Feed::All, None, 20, 40)).await.unwrap();
        let everything = timeline.build(query(Feed::All, None, 100, 0)).await.unwrap();

        assert_eq!(first.items.len(), 20);
        assert!(first.has_more);
        assert!(second.has_more);
        assert_eq!(third.items.len(), 5);
        assert!(!third.has_more);
        assert_eq!(first.total, 45);

        let paged: Vec<Uuid> = first
            .items
            .iter()
            .chain(&second.items)
            .chain(&third.items)
            .map(|p| p.id)
            .collect();
        let all: Vec<Uuid> = everything.items.iter().map(|p| p.id).collect();
        assert_eq!(paged, all);

        for pair in everything.items.windows(2) {
            assert!(
                (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id),
                "timeline must be ordered newest first"
            );
        }
    }

    #[tokio::test]
    async fn has_more_is_false_on_exact_fit() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        for _ in 0..3 {
            fx.post(alice.id, "x", PostVisibility::Public).await;
        }

        let page = fx
            .services
            .timeline
            .build(query(Feed::All, None, 3, 0))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn all_feed_applies_visibility() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let carol = fx.user("carol").await;
        let public = fx.post(alice.id, "public", PostVisibility::Public).await;
        let private = fx.post(alice.id, "private", PostVisibility::Private).await;
        let own_private = fx.post(carol.id, "mine", PostVisibility::Private).await;
        fx.store.insert_follow(bob.id, alice.id).await.unwrap();

        let ids = |page: Page<PostView>| page.items.into_iter().map(|p| p.id).collect::<Vec<_>>();
        let timeline = &fx.services.timeline;

        let anonymous = ids(timeline.build(query(Feed::All, None, 20, 0)).await.unwrap());
        assert_eq!(anonymous, vec![public.id]);

        let follower = ids(timeline
            .build(query(Feed::All, Some(bob.id), 20, 0))
            .await
            .unwrap());
        assert_eq!(follower, vec![private.id, public.id]);

        let stranger = ids(timeline
            .build(query(Feed::All, Some(carol.id), 20, 0))
            .await
            .unwrap());
        assert_eq!(stranger, vec![own_private.id, public.id]);
    }

    #[tokio::test]
    async fn following_feed_requires_viewer() {
        let fx = Fixture::new().await;
        let err = fx
            .services
            .timeline
            .build(query(Feed::Following, None, 20, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn following_feed_excludes_own_posts_by_default() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let carol = fx.user("carol").await;
        let followed = fx.post(alice.id, "followed", PostVisibility::Public).await;
        fx.post(bob.id, "own", PostVisibility::Public).await;
        fx.post(carol.id, "stranger", PostVisibility::Public).await;
        fx.store.insert_follow(bob.id, alice.id).await.unwrap();

        let page = fx
            .services
            .timeline
            .build(query(Feed::Following, Some(bob.id), 20, 0))
            .await
            .unwrap();
        let ids: Vec<Uuid> = page.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![followed.id]);
    }

    #[tokio::test]
    async fn following_feed_can_include_own_posts() {
        let fx = Fixture::with_options(TimelineOptions {
            following_includes_self: true,
        })
        .await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        fx.post(alice.id, "followed", PostVisibility::Public).await;
        fx.post(bob.id, "own", PostVisibility::Public).await;
        fx.store.insert_follow(bob.id, alice.id).await.unwrap();

        let page = fx
            .services
            .timeline
            .build(query(Feed::Following, Some(bob.id), 20, 0))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn retweet_view_describes_the_original() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;
        fx.services.retweets.retweet(post.id, bob.id).await.unwrap();
        fx.services.engagement.like(post.id, bob.id).await.unwrap();

        let page = fx
            .services
            .timeline
            .build(query(Feed::All, Some(bob.id), 20, 0))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);

        let retweet = &page.items[0];
        let original = &page.items[1];
        assert_eq!(retweet.kind, PostKind::Retweet);
        assert_eq!(retweet.original_post_id, Some(post.id));
        assert_eq!(retweet.content.as_deref(), Some("hello"));
        assert_eq!(retweet.author.as_ref().map(|a| a.id), Some(alice.id));
        assert_eq!(retweet.reposted_by.as_ref().map(|a| a.id), Some(bob.id));
        assert_eq!(retweet.like_count, original.like_count);
        assert_eq!(retweet.retweet_count, 1);
        assert!(retweet.liked_by_me && original.liked_by_me);
        assert!(retweet.retweeted_by_me && original.retweeted_by_me);
        assert!(original.reposted_by.is_none());
    }

    #[tokio::test]
    async fn retweets_of_originals_made_private_are_hidden() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;
        fx.services.retweets.retweet(post.id, bob.id).await.unwrap();

        fx.store
            .update_post(
                post.id,
                crate::models::PostChanges {
                    content: post.content.clone(),
                    image_url: None,
                    visibility: PostVisibility::Private,
                    updated_at: fx.clock_now(),
                },
            )
            .await
            .unwrap();

        let page = fx
            .services
            .timeline
            .build(query(Feed::All, None, 20, 0))
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn author_feed_shows_private_posts_to_followers_only() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let bob = fx.user("bob").await;
        let carol = fx.user("carol").await;
        fx.post(alice.id, "public", PostVisibility::Public).await;
        fx.post(alice.id, "private", PostVisibility::Private).await;
        fx.store.insert_follow(bob.id, alice.id).await.unwrap();

        let feed = Feed::Author {
            author_id: alice.id,
        };
        let timeline = &fx.services.timeline;
        assert_eq!(
            timeline.build(query(feed, Some(bob.id), 20, 0)).await.unwrap().total,
            2
        );
        assert_eq!(
            timeline.build(query(feed, Some(alice.id), 20, 0)).await.unwrap().total,
            2
        );
        assert_eq!(
            timeline.build(query(feed, Some(carol.id), 20, 0)).await.unwrap().total,
            1
        );
        assert_eq!(timeline.build(query(feed, None, 20, 0)).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn comments_preview_holds_latest_four() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice").await;
        let post = fx.post(alice.id, "hello", PostVisibility::Public).await;
        let mut ids = Vec::new();
        for i in 0..6 {
            let comment = fx
                .store
                .insert_comment(NewComment {
                    post_id: post.id,
                    author_id: alice.id,
                    content: format!("comment {i}"),
                    parent_comment_id: None,
                    created_at: fx.clock_now(),
                })
                .await
                .unwrap();
            ids.push(comment.id);
        }
        fx.store
            .insert_comment(NewComment {
                post_id: post.id,
                author_id: alice.id,
                content: "reply".into(),
                parent_comment_id: Some(ids[5]),
                created_at: fx.clock_now(),
            })
            .await
            .unwrap();

        let view = fx
            .services
            .timeline
            .render_one(post.clone(), None)
            .await
            .unwrap();
        let preview: Vec<Uuid> = view.comments_preview.iter().map(|c| c.id).collect();
        assert_eq!(preview, vec![ids[5], ids[4], ids[3], ids[2]]);
        assert_eq!(view.comments_preview[0].reply_count, 1);
        assert_eq!(view.comment_count, 7);
    }
}
