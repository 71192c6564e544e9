use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};
use crate::triggers::{entity_mutated, trigger_endpoint_build, trigger_manual_builds};

use super::endpoints::{list_endpoint_kinds, list_endpoints, preview_url, sync_endpoint};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Listing links consumed by the static site builder
        .route("/gatsby/endpoints/{id}/sync", get(sync_endpoint))
        .nest(
            "/api/v1",
            Router::new()
                // Content change ingress
                .route("/entities/mutated", post(entity_mutated))
                .route("/entities/preview-url", post(preview_url))
                // Manual builds
                .route("/endpoints/{id}/build", post(trigger_endpoint_build))
                .route("/builds/manual", post(trigger_manual_builds))
                // Catalog
                .route("/endpoints", get(list_endpoints))
                .route("/endpoint-kinds", get(list_endpoint_kinds))
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
