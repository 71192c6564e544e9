//! Entry points invoked by the content-change mechanism and the read API.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::endpoint::{BuildTrigger, EndpointConfig, EndpointStore};
use crate::entity::{ContentEntity, Operation};
use crate::metrics::DispatchMetrics;
use crate::notification::{DispatchReport, TriggerDispatcher};
use crate::resolver::RelationshipResolver;
use crate::selector::EndpointSelector;

/// Handle for a mutation whose notifications are in flight
pub struct MutationTicket {
    /// Number of endpoints that act on the mutation
    pub selected: usize,
    pub handle: JoinHandle<Vec<DispatchReport>>,
}

/// Fans entity mutations out to every configured endpoint
pub struct TriggerService {
    store: Arc<dyn EndpointStore>,
    selector: EndpointSelector,
    resolver: Arc<RelationshipResolver>,
    dispatcher: Arc<TriggerDispatcher>,
}

impl TriggerService {
    pub fn new(
        store: Arc<dyn EndpointStore>,
        resolver: Arc<RelationshipResolver>,
        dispatcher: Arc<TriggerDispatcher>,
    ) -> Self {
        let selector = EndpointSelector::new(resolver.schema().clone());
        Self {
            store,
            selector,
            resolver,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<TriggerDispatcher> {
        &self.dispatcher
    }

    pub fn resolver(&self) -> &Arc<RelationshipResolver> {
        &self.resolver
    }

    /// Endpoints ordered by weight
    pub fn list_endpoints(&self) -> Vec<EndpointConfig> {
        self.store.list_all()
    }

    pub fn get_endpoint(&self, endpoint_id: &str) -> Option<EndpointConfig> {
        self.store.get(endpoint_id)
    }

    /// Endpoints that act on this mutation, with the operation each applies
    pub fn select_endpoints(
        &self,
        entity: &ContentEntity,
        operation: Operation,
    ) -> Vec<(EndpointConfig, Operation)> {
        self.store
            .list_all()
            .into_iter()
            .filter(|endpoint| match endpoint.kind() {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(endpoint_id = %endpoint.id, error = %e, "Skipping endpoint");
                    false
                }
            })
            .filter_map(|endpoint| {
                self.selector
                    .select_operation(&endpoint, entity, operation)
                    .map(|selected| (endpoint, selected))
            })
            .collect()
    }

    /// Select endpoints and dispatch to each, waiting for all deliveries
    #[tracing::instrument(
        name = "service.process_mutation",
        skip(self, entity),
        fields(entity_type = %entity.entity_type, bundle = %entity.bundle, uuid = %entity.uuid)
    )]
    pub async fn process_mutation(
        &self,
        entity: &ContentEntity,
        operation: Operation,
    ) -> Vec<DispatchReport> {
        DispatchMetrics::record_mutation(operation);
        let selected = self.select_endpoints(entity, operation);
        dispatch_selected(&self.dispatcher, &selected, entity).await
    }

    /// Select endpoints now and deliver in a background task.
    ///
    /// The caller never waits on preview or build servers. Must be called from
    /// within a tokio runtime.
    pub fn on_entity_mutated(&self, entity: ContentEntity, operation: Operation) -> MutationTicket {
        DispatchMetrics::record_mutation(operation);
        let selected = self.select_endpoints(&entity, operation);
        let count = selected.len();

        tracing::info!(
            entity_type = %entity.entity_type,
            bundle = %entity.bundle,
            uuid = %entity.uuid,
            operation = %operation,
            endpoints = count,
            "Entity mutation received"
        );

        let dispatcher = self.dispatcher.clone();
        let handle = tokio::spawn(async move { dispatch_selected(&dispatcher, &selected, &entity).await });

        MutationTicket {
            selected: count,
            handle,
        }
    }

    /// Listing links of an endpoint keyed by `<type>--<bundle>`; empty for
    /// unknown endpoints
    pub fn compute_links(&self, endpoint_id: &str) -> BTreeMap<String, String> {
        let Some(endpoint) = self.store.get(endpoint_id) else {
            return BTreeMap::new();
        };

        match self.resolver.endpoint_links(&endpoint) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(endpoint_id = %endpoint_id, error = %e, "Cannot compute endpoint links");
                BTreeMap::new()
            }
        }
    }

    /// Fire build URLs of one endpoint, or of every manual-mode endpoint
    pub async fn trigger_manual_build(&self, endpoint_id: Option<&str>) -> Vec<DispatchReport> {
        let endpoints: Vec<EndpointConfig> = match endpoint_id {
            Some(id) => self.store.get(id).into_iter().collect(),
            None => self
                .store
                .list_all()
                .into_iter()
                .filter(|endpoint| endpoint.build_trigger == BuildTrigger::Manual)
                .collect(),
        };

        tracing::info!(endpoints = endpoints.len(), "Triggering manual builds");

        join_all(
            endpoints
                .iter()
                .map(|endpoint| self.dispatcher.trigger_build_urls(endpoint)),
        )
        .await
    }

    /// Preview URL to open for an entity, if any endpoint provides one
    pub fn preview_url_for_entity(&self, entity: &ContentEntity) -> Option<String> {
        self.selector.preview_url_for_entity(self.store.as_ref(), entity)
    }

    /// Build rules referencing types or bundles the schema does not know
    pub fn unknown_rule_targets(&self) -> Vec<String> {
        let schema = self.resolver.schema();
        let kinds = schema.content_kinds();
        let mut unknown = Vec::new();

        for endpoint in self.store.list_all() {
            for rule in endpoint.build_rules() {
                if !kinds.contains_key(&rule.entity_type) {
                    unknown.push(format!("{}: {}", endpoint.id, rule.entity_type));
                    continue;
                }

                let bundles = schema.bundles_of(&rule.entity_type);
                unknown.extend(
                    rule.bundles
                        .iter()
                        .filter(|bundle| !bundles.contains_key(*bundle))
                        .map(|bundle| format!("{}: {}--{}", endpoint.id, rule.entity_type, bundle)),
                );
            }
        }

        unknown
    }
}

async fn dispatch_selected(
    dispatcher: &TriggerDispatcher,
    selected: &[(EndpointConfig, Operation)],
    entity: &ContentEntity,
) -> Vec<DispatchReport> {
    join_all(
        selected
            .iter()
            .map(|(endpoint, operation)| dispatcher.dispatch(endpoint, entity, *operation)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{BuildTypeRule, InMemoryEndpointStore};
    use crate::notification::DispatchOptions;
    use crate::resolver::ResolverOptions;
    use crate::schema::{FieldReferenceDescriptor as Field, InMemorySchema};
    use crate::serializer::EmbeddedDocumentSerializer;
    use crate::transport::RecordingTransport;

    fn service(store: InMemoryEndpointStore, transport: Arc<RecordingTransport>) -> TriggerService {
        let schema = InMemorySchema::new()
            .with_bundle("node", "page", vec![Field::plain("body")])
            .with_bundle("node", "article", vec![Field::endpoint_reference("field_endpoints")]);
        let resolver = Arc::new(RelationshipResolver::new(Arc::new(schema), ResolverOptions::default()));
        let dispatcher = Arc::new(TriggerDispatcher::new(
            Arc::new(EmbeddedDocumentSerializer),
            transport,
            DispatchOptions::default(),
        ));
        TriggerService::new(Arc::new(store), resolver, dispatcher)
    }

    #[test]
    fn test_select_skips_unknown_plugins() {
        let store = InMemoryEndpointStore::new();
        store.insert(EndpointConfig::new("a").rule(BuildTypeRule::new("node").bundle("page")));
        store.insert(
            EndpointConfig::new("b")
                .plugin("graphql")
                .rule(BuildTypeRule::new("node").bundle("page")),
        );
        let service = service(store, Arc::new(RecordingTransport::new()));

        let selected = service.select_endpoints(&ContentEntity::new("node", "page", "p1"), Operation::Create);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, "a");
    }

    #[test]
    fn test_compute_links_unknown_endpoint() {
        let service = service(InMemoryEndpointStore::new(), Arc::new(RecordingTransport::new()));
        assert!(service.compute_links("missing").is_empty());
    }

    #[tokio::test]
    async fn test_manual_build_selects_manual_endpoints() {
        let store = InMemoryEndpointStore::new();
        store.insert(
            EndpointConfig::new("manual")
                .trigger(BuildTrigger::Manual)
                .build_url("http://manual.build"),
        );
        store.insert(EndpointConfig::new("incremental").build_url("http://incremental.build"));
        let transport = Arc::new(RecordingTransport::new());
        let service = service(store, transport.clone());

        let reports = service.trigger_manual_build(None).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].endpoint_id, "manual");

        let reports = service.trigger_manual_build(Some("incremental")).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].delivered, 1);

        assert!(service.trigger_manual_build(Some("missing")).await.is_empty());
        assert_eq!(transport.sent().await.len(), 2);
    }

    #[test]
    fn test_unknown_rule_targets() {
        let store = InMemoryEndpointStore::new();
        store.insert(
            EndpointConfig::new("a")
                .rule(BuildTypeRule::new("node").bundle("page").bundle("landing"))
                .rule(BuildTypeRule::new("media").bundle("image")),
        );
        let service = service(store, Arc::new(RecordingTransport::new()));

        assert_eq!(
            service.unknown_rule_targets(),
            vec!["a: node--landing".to_string(), "a: media".to_string()]
        );
    }
}
