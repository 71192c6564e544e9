//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::TransportConfig;

use super::{DeliveryOutcome, Notification, Transport};

/// Header naming the notification kind on every outbound request
pub const NOTIFICATION_KIND_HEADER: &str = "X-Notification-Kind";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Posts JSON payloads to preview and build servers
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, notification: &Notification) -> DeliveryOutcome {
        let url = notification.target_url();

        let mut request = self
            .client
            .post(&url)
            .header(NOTIFICATION_KIND_HEADER, notification.kind.as_str());

        if let Some(payload) = &notification.payload {
            request = request.json(payload);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => DeliveryOutcome::Delivered {
                status: response.status().as_u16(),
            },
            Ok(response) => DeliveryOutcome::Rejected {
                status: response.status().as_u16(),
            },
            Err(e) => DeliveryOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::NotificationKind;

    #[tokio::test]
    async fn test_unreachable_server_is_a_failure() {
        let transport = HttpTransport::new(&TransportConfig {
            timeout_seconds: 1,
            ..Default::default()
        })
        .unwrap();

        let outcome = transport
            .send(&Notification {
                endpoint_id: "e".to_string(),
                kind: NotificationKind::IncrementalBuild,
                url: "http://127.0.0.1:9".to_string(),
                sub_path: None,
                action: None,
                payload: None,
            })
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Failed { .. }));
    }
}
