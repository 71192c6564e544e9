//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use crate::entity::Operation;
use crate::transport::NotificationKind;

use super::{
    DELIVERY_LATENCY, ENDPOINTS_CONFIGURED, ENTITY_MUTATIONS_TOTAL, NOTIFICATIONS_DELIVERED_TOTAL,
    NOTIFICATIONS_FAILED_TOTAL, NOTIFICATIONS_SENT_TOTAL, RESOLVER_CACHE_HITS,
    RESOLVER_CACHE_MISSES,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording mutation and notification metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_mutation(operation: Operation) {
        ENTITY_MUTATIONS_TOTAL
            .with_label_values(&[operation.as_str()])
            .inc();
    }

    pub fn set_endpoints_configured(count: usize) {
        ENDPOINTS_CONFIGURED.set(count as i64);
    }

    pub fn record_sent(kind: NotificationKind) {
        NOTIFICATIONS_SENT_TOTAL.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn record_delivered(kind: NotificationKind) {
        NOTIFICATIONS_DELIVERED_TOTAL
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn record_failed(kind: NotificationKind) {
        NOTIFICATIONS_FAILED_TOTAL
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Record delivery latency in seconds
    pub fn observe_latency(seconds: f64) {
        DELIVERY_LATENCY.observe(seconds);
    }
}

/// Helper struct for recording include resolution metrics
pub struct ResolverMetrics;

impl ResolverMetrics {
    pub fn record_cache_hit() {
        RESOLVER_CACHE_HITS.inc();
    }

    pub fn record_cache_miss() {
        RESOLVER_CACHE_MISSES.inc();
    }
}
