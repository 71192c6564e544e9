use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};

use crate::endpoint::{BuildTrigger, EndpointConfig};
use crate::entity::{ContentEntity, Operation};
use crate::metrics::DispatchMetrics;
use crate::resolver::effective_include_kinds;
use crate::serializer::{bundle_relationships, EntitySerializer};
use crate::transport::{Notification, NotificationKind, Transport, PREVIEW_REFRESH_PATH};

use super::types::{DispatchReport, DispatcherStats, DispatcherStatsSnapshot};

/// Dispatcher tuning
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Maximum number of notifications in flight per dispatch
    pub max_concurrent_sends: usize,
    /// Deepest relationship level materialized into a payload batch
    pub max_bundle_depth: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent_sends: 16,
            max_bundle_depth: 8,
        }
    }
}

/// Builds payloads for entity mutations and notifies preview and build servers
pub struct TriggerDispatcher {
    serializer: Arc<dyn EntitySerializer>,
    transport: Arc<dyn Transport>,
    options: DispatchOptions,
    stats: DispatcherStats,
}

impl TriggerDispatcher {
    pub fn new(
        serializer: Arc<dyn EntitySerializer>,
        transport: Arc<dyn Transport>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            serializer,
            transport,
            options,
            stats: DispatcherStats::default(),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Notifications for a create/update/delete of `entity` on `endpoint`.
    ///
    /// Returns `None` when the entity cannot be serialized. Deletes are
    /// delegated to [`prepare_delete`](Self::prepare_delete).
    pub fn prepare(
        &self,
        endpoint: &EndpointConfig,
        entity: &ContentEntity,
        operation: Operation,
    ) -> Option<Vec<Notification>> {
        if operation == Operation::Delete {
            return Some(self.prepare_delete(endpoint, entity));
        }

        let Some(mut document) = self.serializer.serialize(entity) else {
            tracing::debug!(
                endpoint_id = %endpoint.id,
                entity_type = %entity.entity_type,
                uuid = %entity.uuid,
                "Entity could not be serialized, skipping endpoint"
            );
            return None;
        };

        {
            let object = document.as_object_mut()?;
            stamp(object, endpoint, &entity.uuid, operation);
        }

        let rule = endpoint.build_type_rule(&entity.entity_type, &entity.bundle);
        let include_kinds = rule
            .map(|rule| effective_include_kinds(&rule.include_entity_kinds))
            .unwrap_or_default();

        let relationships = document
            .get("data")
            .and_then(|data| data.get("relationships"))
            .filter(|rels| rels.as_object().map(|m| !m.is_empty()).unwrap_or(false))
            .cloned();

        if let Some(relationships) = relationships {
            let mut batch = bundle_relationships(
                self.serializer.as_ref(),
                entity,
                &relationships,
                &include_kinds,
                self.options.max_bundle_depth,
            );

            if !batch.is_empty() {
                if let Some(data) = document.get_mut("data") {
                    batch.push(data.take());
                    *data = Value::Array(batch);
                }
            }
        }

        let mut notifications = preview_notifications(endpoint, Some(operation), &document);

        if endpoint.build_trigger != BuildTrigger::Incremental {
            return Some(notifications);
        }

        if endpoint.build_urls().next().is_none() {
            return Some(notifications);
        }

        let only_published = rule.map(|r| r.build_only_published).unwrap_or(false);
        if only_published && entity.is_unpublished() {
            tracing::debug!(
                endpoint_id = %endpoint.id,
                uuid = %entity.uuid,
                "Unpublished entity, skipping build servers"
            );
            return Some(notifications);
        }

        notifications.extend(endpoint.build_urls().map(|url| Notification {
            endpoint_id: endpoint.id.clone(),
            kind: NotificationKind::IncrementalBuild,
            url: url.to_string(),
            sub_path: None,
            action: Some(operation),
            payload: Some(document.clone()),
        }));

        Some(notifications)
    }

    /// Notifications for a deleted entity.
    ///
    /// Build servers are always told about deletions, whatever the trigger
    /// mode or publish policy.
    pub fn prepare_delete(&self, endpoint: &EndpointConfig, entity: &ContentEntity) -> Vec<Notification> {
        let mut object = Map::new();
        stamp(&mut object, endpoint, &entity.uuid, Operation::Delete);
        let payload = Value::Object(object);

        let mut notifications = preview_notifications(endpoint, Some(Operation::Delete), &payload);
        notifications.extend(endpoint.build_urls().map(|url| Notification {
            endpoint_id: endpoint.id.clone(),
            kind: NotificationKind::IncrementalBuild,
            url: url.to_string(),
            sub_path: None,
            action: Some(Operation::Delete),
            payload: Some(payload.clone()),
        }));
        notifications
    }

    /// Refresh signals for every build URL of `endpoint`
    pub fn prepare_manual_build(&self, endpoint: &EndpointConfig) -> Vec<Notification> {
        endpoint
            .build_urls()
            .map(|url| Notification {
                endpoint_id: endpoint.id.clone(),
                kind: NotificationKind::ManualBuild,
                url: url.to_string(),
                sub_path: None,
                action: None,
                payload: None,
            })
            .collect()
    }

    /// Dispatch a mutation of `entity` to `endpoint`
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, endpoint, entity),
        fields(endpoint_id = %endpoint.id, uuid = %entity.uuid)
    )]
    pub async fn dispatch(
        &self,
        endpoint: &EndpointConfig,
        entity: &ContentEntity,
        operation: Operation,
    ) -> DispatchReport {
        self.stats.total_dispatches.fetch_add(1, Ordering::Relaxed);

        match self.prepare(endpoint, entity, operation) {
            Some(notifications) => self.deliver(&endpoint.id, Some(operation), notifications).await,
            None => {
                self.stats.total_skipped.fetch_add(1, Ordering::Relaxed);
                DispatchReport::skipped(&endpoint.id, Some(operation))
            }
        }
    }

    /// Dispatch a deletion of `entity` to `endpoint`
    pub async fn dispatch_delete(&self, endpoint: &EndpointConfig, entity: &ContentEntity) -> DispatchReport {
        self.stats.total_dispatches.fetch_add(1, Ordering::Relaxed);
        let notifications = self.prepare_delete(endpoint, entity);
        self.deliver(&endpoint.id, Some(Operation::Delete), notifications)
            .await
    }

    /// Call every build URL of `endpoint` regardless of entity state
    #[tracing::instrument(name = "dispatcher.manual_build", skip(self, endpoint), fields(endpoint_id = %endpoint.id))]
    pub async fn trigger_build_urls(&self, endpoint: &EndpointConfig) -> DispatchReport {
        let notifications = self.prepare_manual_build(endpoint);
        self.deliver(&endpoint.id, None, notifications).await
    }

    /// Send notifications concurrently with bounded parallelism, logging failures
    async fn deliver(
        &self,
        endpoint_id: &str,
        action: Option<Operation>,
        notifications: Vec<Notification>,
    ) -> DispatchReport {
        if notifications.is_empty() {
            return DispatchReport::new(endpoint_id, action, 0, 0);
        }

        let limit = self.options.max_concurrent_sends.max(1);
        let mut pending = notifications.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut delivered = 0;
        let mut failed = 0;

        loop {
            while in_flight.len() < limit {
                let Some(notification) = pending.next() else {
                    break;
                };
                self.record_kind(notification.kind);
                let transport = self.transport.clone();
                in_flight.push(async move {
                    let started = std::time::Instant::now();
                    let outcome = transport.send(&notification).await;
                    DispatchMetrics::observe_latency(started.elapsed().as_secs_f64());
                    (notification, outcome)
                });
            }

            let Some((notification, outcome)) = in_flight.next().await else {
                break;
            };

            if outcome.is_success() {
                delivered += 1;
                DispatchMetrics::record_delivered(notification.kind);
            } else {
                failed += 1;
                DispatchMetrics::record_failed(notification.kind);
                tracing::warn!(
                    endpoint_id = %notification.endpoint_id,
                    url = %notification.target_url(),
                    kind = %notification.kind,
                    action = ?notification.action,
                    outcome = ?outcome,
                    "Notification delivery failed"
                );
            }
        }

        self.stats.total_delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats.total_failed.fetch_add(failed as u64, Ordering::Relaxed);

        tracing::debug!(
            endpoint_id = %endpoint_id,
            action = ?action,
            delivered = delivered,
            failed = failed,
            "Dispatched endpoint notifications"
        );

        DispatchReport::new(endpoint_id, action, delivered, failed)
    }

    fn record_kind(&self, kind: NotificationKind) {
        let counter = match kind {
            NotificationKind::Preview => &self.stats.preview_notifications,
            NotificationKind::IncrementalBuild => &self.stats.build_notifications,
            NotificationKind::ManualBuild => &self.stats.manual_builds,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_sent(kind);
    }
}

/// Add `id`, `action` and, when configured, `secret` to a payload object
fn stamp(object: &mut Map<String, Value>, endpoint: &EndpointConfig, uuid: &str, operation: Operation) {
    object.insert("id".to_string(), Value::String(uuid.to_string()));
    object.insert("action".to_string(), Value::String(operation.as_str().to_string()));

    if let Some(secret) = endpoint.plugin_settings.secret() {
        object.insert("secret".to_string(), Value::String(secret.to_string()));
    }
}

fn preview_notifications(
    endpoint: &EndpointConfig,
    action: Option<Operation>,
    payload: &Value,
) -> Vec<Notification> {
    endpoint
        .preview_urls()
        .map(|url| Notification {
            endpoint_id: endpoint.id.clone(),
            kind: NotificationKind::Preview,
            url: url.to_string(),
            sub_path: Some(PREVIEW_REFRESH_PATH.to_string()),
            action,
            payload: Some(payload.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::BuildTypeRule;
    use crate::serializer::EmbeddedDocumentSerializer;
    use crate::transport::RecordingTransport;
    use serde_json::json;

    fn dispatcher(transport: Arc<RecordingTransport>) -> TriggerDispatcher {
        TriggerDispatcher::new(
            Arc::new(EmbeddedDocumentSerializer),
            transport,
            DispatchOptions::default(),
        )
    }

    fn endpoint() -> EndpointConfig {
        EndpointConfig::new("site")
            .rule(
                BuildTypeRule::new("node")
                    .bundle("article")
                    .include("file")
                    .only_published(true),
            )
            .preview_url("http://preview.local")
            .build_url("http://build.local")
    }

    fn article() -> ContentEntity {
        ContentEntity::new("node", "article", "n1")
            .published(true)
            .document(json!({
                "data": {
                    "type": "node--article",
                    "id": "n1",
                    "attributes": {"title": "Hello"},
                    "relationships": {
                        "field_image": {"data": {"type": "file--file", "id": "f1"}}
                    }
                }
            }))
            .include(json!({"type": "file--file", "id": "f1"}))
    }

    fn kinds(notifications: &[Notification]) -> Vec<NotificationKind> {
        notifications.iter().map(|n| n.kind).collect()
    }

    #[test]
    fn test_payload_bundles_dependencies_first() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        let notifications = d
            .prepare(&endpoint().secret_key("s3"), &article(), Operation::Update)
            .unwrap();

        assert_eq!(
            kinds(&notifications),
            vec![NotificationKind::Preview, NotificationKind::IncrementalBuild]
        );

        let payload = notifications[0].payload.as_ref().unwrap();
        assert_eq!(payload["id"], "n1");
        assert_eq!(payload["action"], "update");
        assert_eq!(payload["secret"], "s3");
        assert_eq!(payload["data"][0]["id"], "f1");
        assert_eq!(payload["data"][1]["id"], "n1");
        assert_eq!(notifications[0].target_url(), "http://preview.local/__refresh");
        assert_eq!(notifications[1].payload, notifications[0].payload);
    }

    #[test]
    fn test_no_secret_when_not_configured() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        let notifications = d.prepare(&endpoint(), &article(), Operation::Create).unwrap();
        assert!(notifications[0].payload.as_ref().unwrap().get("secret").is_none());
    }

    #[test]
    fn test_relationships_outside_included_kinds_leave_data_alone() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        let endpoint = EndpointConfig::new("site")
            .rule(BuildTypeRule::new("node").bundle("article"))
            .preview_url("http://preview.local");

        let notifications = d.prepare(&endpoint, &article(), Operation::Update).unwrap();
        let payload = notifications[0].payload.as_ref().unwrap();
        assert!(payload["data"].is_object());
        assert_eq!(payload["data"]["id"], "n1");
    }

    #[test]
    fn test_unpublished_skips_build_but_not_preview() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        let entity = article().published(false);
        let notifications = d.prepare(&endpoint(), &entity, Operation::Update).unwrap();
        assert_eq!(kinds(&notifications), vec![NotificationKind::Preview]);
    }

    #[test]
    fn test_non_incremental_trigger_skips_build() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        for trigger in [BuildTrigger::Cron, BuildTrigger::Manual] {
            let notifications = d
                .prepare(&endpoint().trigger(trigger), &article(), Operation::Update)
                .unwrap();
            assert_eq!(kinds(&notifications), vec![NotificationKind::Preview]);
        }
    }

    #[test]
    fn test_delete_bypasses_gating() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        let entity = article().published(false);
        let endpoint = endpoint().trigger(BuildTrigger::Manual).secret_key("k");

        let notifications = d.prepare(&endpoint, &entity, Operation::Delete).unwrap();
        assert_eq!(
            kinds(&notifications),
            vec![NotificationKind::Preview, NotificationKind::IncrementalBuild]
        );
        assert_eq!(
            notifications[1].payload,
            Some(json!({"id": "n1", "action": "delete", "secret": "k"}))
        );
    }

    #[test]
    fn test_unserializable_entity_is_skipped() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        let entity = ContentEntity::new("node", "article", "n1");
        assert!(d.prepare(&endpoint(), &entity, Operation::Update).is_none());
    }

    #[tokio::test]
    async fn test_dispatch_reports_failures() {
        let transport = Arc::new(RecordingTransport::new().failing("http://build.local"));
        let d = dispatcher(transport.clone());

        let report = d.dispatch(&endpoint(), &article(), Operation::Update).await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.success());
        assert_eq!(transport.sent().await.len(), 2);

        let stats = d.stats();
        assert_eq!(stats.total_dispatches, 1);
        assert_eq!(stats.preview_notifications, 1);
        assert_eq!(stats.build_notifications, 1);
        assert_eq!(stats.total_failed, 1);
    }

    #[tokio::test]
    async fn test_dispatch_skipped_entity() {
        let d = dispatcher(Arc::new(RecordingTransport::new()));
        let report = d
            .dispatch(&endpoint(), &ContentEntity::new("node", "article", "n1"), Operation::Create)
            .await;
        assert!(report.skipped);
        assert_eq!(d.stats().total_skipped, 1);
    }

    #[tokio::test]
    async fn test_dispatch_delete_without_document() {
        let transport = Arc::new(RecordingTransport::new());
        let d = dispatcher(transport.clone());

        let report = d
            .dispatch_delete(&endpoint(), &ContentEntity::new("node", "article", "gone"))
            .await;
        assert_eq!(report.action, Some(Operation::Delete));
        assert_eq!(report.delivered, 2);

        let sent = transport.sent().await;
        assert!(sent
            .iter()
            .all(|n| n.payload == Some(json!({"id": "gone", "action": "delete"}))));
    }

    #[tokio::test]
    async fn test_manual_build_has_no_payload() {
        let transport = Arc::new(RecordingTransport::new());
        let d = dispatcher(transport.clone());
        let endpoint = endpoint().build_url("http://build2.local");

        let report = d.trigger_build_urls(&endpoint).await;
        assert_eq!(report.delivered, 2);

        let sent = transport.sent().await;
        assert!(sent.iter().all(|n| n.kind == NotificationKind::ManualBuild));
        assert!(sent.iter().all(|n| n.payload.is_none()));
    }

    #[tokio::test]
    async fn test_bounded_concurrency_delivers_all() {
        let transport = Arc::new(RecordingTransport::new());
        let d = TriggerDispatcher::new(
            Arc::new(EmbeddedDocumentSerializer),
            transport.clone(),
            DispatchOptions {
                max_concurrent_sends: 2,
                ..Default::default()
            },
        );

        let mut endpoint = endpoint();
        for i in 0..5 {
            endpoint = endpoint.preview_url(format!("http://preview{}.local", i));
        }

        let report = d.dispatch(&endpoint, &article(), Operation::Update).await;
        assert_eq!(report.delivered, 7);
        assert_eq!(transport.sent().await.len(), 7);
    }
}
