use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::entity::Operation;

/// Result of dispatching one endpoint's notifications
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub endpoint_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Operation>,
    /// Number of notifications attempted
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Nothing was sent because the entity could not be serialized
    pub skipped: bool,
}

impl DispatchReport {
    pub(crate) fn new(endpoint_id: &str, action: Option<Operation>, delivered: usize, failed: usize) -> Self {
        Self {
            endpoint_id: endpoint_id.to_string(),
            action,
            attempted: delivered + failed,
            delivered,
            failed,
            skipped: false,
        }
    }

    pub(crate) fn skipped(endpoint_id: &str, action: Option<Operation>) -> Self {
        Self {
            skipped: true,
            ..Self::new(endpoint_id, action, 0, 0)
        }
    }

    pub fn success(&self) -> bool {
        !self.skipped && self.failed == 0
    }
}

/// Statistics for the trigger dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Endpoint dispatches performed (one per endpoint and mutation)
    pub total_dispatches: AtomicU64,
    /// Dispatches abandoned because serialization produced nothing
    pub total_skipped: AtomicU64,
    pub preview_notifications: AtomicU64,
    pub build_notifications: AtomicU64,
    pub manual_builds: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_failed: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_dispatches: self.total_dispatches.load(Ordering::Relaxed),
            total_skipped: self.total_skipped.load(Ordering::Relaxed),
            preview_notifications: self.preview_notifications.load(Ordering::Relaxed),
            build_notifications: self.build_notifications.load(Ordering::Relaxed),
            manual_builds: self.manual_builds.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_dispatches: u64,
    pub total_skipped: u64,
    pub preview_notifications: u64,
    pub build_notifications: u64,
    pub manual_builds: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
}
