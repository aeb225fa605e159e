use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

lazy_static! {
    /// Duration of timeline builds by feed (all, following, author).
    pub static ref TIMELINE_BUILD_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "timeline_build_duration_seconds",
        "Timeline build duration segmented by feed",
        &["feed"]
    )
    .expect("failed to register timeline_build_duration_seconds");

    /// Total timeline builds by feed.
    pub static ref TIMELINE_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "timeline_request_total",
        "Total timeline builds segmented by feed",
        &["feed"]
    )
    .expect("failed to register timeline_request_total");

    /// Posts returned per page.
    pub static ref TIMELINE_PAGE_SIZE: HistogramVec = register_histogram_vec!(
        "timeline_page_size",
        "Number of posts returned per timeline page segmented by feed",
        &["feed"],
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .expect("failed to register timeline_page_size");

    /// HTTP requests by method, matched route and status code.
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "timeline_http_requests_total",
        "HTTP requests segmented by method, route and status",
        &["method", "route", "status"]
    )
    .expect("failed to register timeline_http_requests_total");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "timeline_http_request_duration_seconds",
        "HTTP request duration segmented by method and route",
        &["method", "route"]
    )
    .expect("failed to register timeline_http_request_duration_seconds");
}
