//! Outbound delivery of preview and build notifications.

mod http;
mod recording;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::entity::Operation;

pub use http::{HttpTransport, TransportError};
pub use recording::RecordingTransport;

/// Fixed sub-path preview servers refresh on
pub const PREVIEW_REFRESH_PATH: &str = "/__refresh";

/// Kind of notification sent to an external server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Preview server refresh
    Preview,
    /// Incremental build server update
    IncrementalBuild,
    /// Operator-initiated rebuild with no entity payload
    ManualBuild,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Preview => "preview",
            NotificationKind::IncrementalBuild => "incrementalbuild",
            NotificationKind::ManualBuild => "manualbuild",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub endpoint_id: String,
    pub kind: NotificationKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Notification {
    /// Base URL joined with the sub-path, if any
    pub fn target_url(&self) -> String {
        match self.sub_path.as_deref() {
            Some(sub_path) => format!(
                "{}/{}",
                self.url.trim_end_matches('/'),
                sub_path.trim_start_matches('/')
            ),
            None => self.url.clone(),
        }
    }
}

/// Result of a single delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Rejected { status: u16 },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Sends notifications. Timeouts and retries are the transport's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, notification: &Notification) -> DeliveryOutcome;
}
