//! Prometheus metrics for the endpoint trigger service.
//!
//! - Entity mutations received, by operation
//! - Notifications sent, delivered and failed, by kind
//! - Delivery latency
//! - Include resolution cache efficiency

mod helpers;

pub use helpers::{encode_metrics, DispatchMetrics, ResolverMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "endpoint_trigger";

lazy_static! {
    // ============================================================================
    // Mutation Metrics
    // ============================================================================

    /// Entity mutations received by operation
    pub static ref ENTITY_MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_entity_mutations_total", METRIC_PREFIX),
        "Total entity mutations received",
        &["operation"]
    ).unwrap();

    /// Configured endpoints
    pub static ref ENDPOINTS_CONFIGURED: IntGauge = register_int_gauge!(
        format!("{}_endpoints_configured", METRIC_PREFIX),
        "Number of configured endpoints"
    ).unwrap();

    // ============================================================================
    // Notification Metrics
    // ============================================================================

    /// Notifications attempted by kind (preview, incrementalbuild, manualbuild)
    pub static ref NOTIFICATIONS_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_sent_total", METRIC_PREFIX),
        "Total notifications sent",
        &["kind"]
    ).unwrap();

    pub static ref NOTIFICATIONS_DELIVERED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_delivered_total", METRIC_PREFIX),
        "Total notifications accepted by the receiving server",
        &["kind"]
    ).unwrap();

    pub static ref NOTIFICATIONS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_failed_total", METRIC_PREFIX),
        "Total notifications rejected or not delivered",
        &["kind"]
    ).unwrap();

    /// Time to deliver one notification in seconds
    pub static ref DELIVERY_LATENCY: Histogram = register_histogram!(
        format!("{}_delivery_latency_seconds", METRIC_PREFIX),
        "Notification delivery latency in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Resolver Metrics
    // ============================================================================

    pub static ref RESOLVER_CACHE_HITS: IntCounter = register_int_counter!(
        format!("{}_resolver_cache_hits_total", METRIC_PREFIX),
        "Include resolutions served from cache"
    ).unwrap();

    pub static ref RESOLVER_CACHE_MISSES: IntCounter = register_int_counter!(
        format!("{}_resolver_cache_misses_total", METRIC_PREFIX),
        "Include resolutions walked through the schema"
    ).unwrap();
}
