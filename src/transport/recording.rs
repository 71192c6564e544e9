//! Transport that records notifications instead of sending them

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DeliveryOutcome, Notification, Transport};

/// Records every notification. Used for dry runs and tests.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<VecDeque<Notification>>,
    failing_urls: HashSet<String>,
    /// Oldest notifications are dropped beyond this many
    retain: Option<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report delivery failure for notifications targeting `url`
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing_urls.insert(url.into());
        self
    }

    /// Keep only the most recent `count` notifications
    pub fn retain_last(mut self, count: usize) -> Self {
        self.retain = Some(count);
        self
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, notification: &Notification) -> DeliveryOutcome {
        let url = notification.target_url();
        tracing::info!(
            endpoint_id = %notification.endpoint_id,
            kind = %notification.kind,
            url = %url,
            "Recorded notification"
        );

        {
            let mut sent = self.sent.lock().await;
            sent.push_back(notification.clone());
            if let Some(retain) = self.retain {
                while sent.len() > retain {
                    sent.pop_front();
                }
            }
        }

        if self.failing_urls.contains(&url) {
            DeliveryOutcome::Rejected { status: 503 }
        } else {
            DeliveryOutcome::Delivered { status: 200 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::NotificationKind;

    fn notification(url: &str) -> Notification {
        Notification {
            endpoint_id: "e".to_string(),
            kind: NotificationKind::ManualBuild,
            url: url.to_string(),
            sub_path: None,
            action: None,
            payload: None,
        }
    }

    #[tokio::test]
    async fn test_retain_last_drops_oldest() {
        let transport = RecordingTransport::new().retain_last(2);
        for url in ["http://a", "http://b", "http://c"] {
            transport.send(&notification(url)).await;
        }

        let urls: Vec<String> = transport.sent().await.into_iter().map(|n| n.url).collect();
        assert_eq!(urls, vec!["http://b", "http://c"]);
    }

    #[tokio::test]
    async fn test_failing_url_is_rejected() {
        let transport = RecordingTransport::new().failing("http://down");
        assert_eq!(
            transport.send(&notification("http://down")).await,
            DeliveryOutcome::Rejected { status: 503 }
        );
        assert!(transport.send(&notification("http://up")).await.is_success());

        transport.clear().await;
        assert!(transport.sent().await.is_empty());
    }
}
