use super::{Services, TimelineOptions};
use crate::clock::{Clock, ManualClock};
use crate::db::{InMemoryStore, SocialStore};
use crate::models::{NewPost, Post, PostKind, PostVisibility, User};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// In-memory store plus a clock that ticks one second per read, so rows
/// created in sequence have strictly increasing timestamps.
pub(crate) struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub services: Services,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_options(TimelineOptions::default()).await
    }

    pub async fn with_options(options: TimelineOptions) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start, Duration::seconds(1)));
        let services = Services::new(store.clone(), clock.clone(), options);

        Self {
            store,
            clock,
            services,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.store.add_user(username).await
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn post(&self, author_id: Uuid, content: &str, visibility: PostVisibility) -> Post {
        self.store
            .insert_post(NewPost {
                author_id,
                kind: PostKind::Original,
                original_post_id: None,
                content: Some(content.to_string()),
                image_url: None,
                visibility,
                created_at: self.clock.now(),
            })
            .await
            .unwrap()
    }
}
