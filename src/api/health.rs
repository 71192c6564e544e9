//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub endpoints: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub dispatcher: DispatcherStatsSnapshot,
    pub resolver: ResolverStats,
}

#[derive(Debug, Serialize)]
pub struct ResolverStats {
    pub cache_enabled: bool,
    pub cached_entries: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        endpoints: state.service.list_endpoints().len(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let resolver = state.service.resolver();

    Json(StatsResponse {
        dispatcher: state.service.dispatcher().stats(),
        resolver: ResolverStats {
            cache_enabled: resolver.options().cache_enabled,
            cached_entries: resolver.cached_entries(),
        },
    })
}
