use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::endpoint::EndpointStore;
use crate::notification::TriggerDispatcher;
use crate::resolver::RelationshipResolver;
use crate::schema::SchemaProvider;
use crate::serializer::{EmbeddedDocumentSerializer, EntitySerializer};
use crate::service::TriggerService;
use crate::transport::Transport;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<TriggerService>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the resolver, dispatcher and service from settings and collaborators
    pub fn new(
        settings: Settings,
        store: Arc<dyn EndpointStore>,
        schema: Arc<dyn SchemaProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::with_serializer(
            settings,
            store,
            schema,
            Arc::new(EmbeddedDocumentSerializer),
            transport,
        )
    }

    pub fn with_serializer(
        settings: Settings,
        store: Arc<dyn EndpointStore>,
        schema: Arc<dyn SchemaProvider>,
        serializer: Arc<dyn EntitySerializer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let resolver = Arc::new(RelationshipResolver::new(schema, settings.resolver.options()));
        let dispatcher = Arc::new(TriggerDispatcher::new(
            serializer,
            transport,
            settings
                .transport
                .dispatch_options(settings.resolver.max_depth),
        ));
        let service = Arc::new(TriggerService::new(store, resolver, dispatcher));

        Self {
            settings: Arc::new(settings),
            service,
            start_time: Instant::now(),
        }
    }
}
