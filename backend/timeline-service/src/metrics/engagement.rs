use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Engagement mutations by action (like, unlike, retweet, unretweet, comment, follow, unfollow)
    /// and outcome (created, existing, removed, noop).
    pub static ref ENGAGEMENT_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "engagement_actions_total",
        "Engagement mutations segmented by action and outcome",
        &["action", "outcome"]
    )
    .expect("failed to register engagement_actions_total");
}

pub fn record(action: &str, outcome: &str) {
    ENGAGEMENT_ACTIONS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}
