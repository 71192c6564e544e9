//! API layer - HTTP endpoint handlers organized by domain.

mod endpoints;
mod health;
mod metrics;
mod routes;

pub use endpoints::{
    list_endpoint_kinds, list_endpoints, preview_url, sync_endpoint, EndpointKindResponse,
    EndpointSummary, PreviewUrlResponse, SyncLink, SyncResponse,
};
pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
