//! Endpoint catalog and sync link handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::endpoint::{BuildTrigger, EndpointConfig, EndpointKind, FormField};
use crate::entity::ContentEntity;
use crate::resolver::absolute_link;
use crate::server::AppState;

const FORWARDED_PROTO_HEADER: &str = "X-Forwarded-Proto";

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// Unix timestamp of the response
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<BTreeMap<String, SyncLink>>,
}

#[derive(Debug, Serialize)]
pub struct SyncLink {
    pub href: String,
}

/// Endpoint as listed by the catalog route. Settings are never exposed.
#[derive(Debug, Serialize)]
pub struct EndpointSummary {
    pub id: String,
    pub label: String,
    pub weight: i32,
    pub plugin_id: String,
    pub build_trigger: BuildTrigger,
    pub preview_urls: Vec<String>,
    pub build_urls: Vec<String>,
}

impl From<&EndpointConfig> for EndpointSummary {
    fn from(endpoint: &EndpointConfig) -> Self {
        Self {
            id: endpoint.id.clone(),
            label: endpoint.label.clone(),
            weight: endpoint.weight,
            plugin_id: endpoint.plugin_id.clone(),
            build_trigger: endpoint.build_trigger,
            preview_urls: endpoint.preview_urls().map(String::from).collect(),
            build_urls: endpoint.build_urls().map(String::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EndpointKindResponse {
    pub id: &'static str,
    pub label: &'static str,
    pub settings_form: Vec<FormField>,
}

#[derive(Debug, Serialize)]
pub struct PreviewUrlResponse {
    pub url: Option<String>,
}

/// GET /gatsby/endpoints/{id}/sync
#[tracing::instrument(name = "http.sync_endpoint", skip(state, headers))]
pub async fn sync_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Json<SyncResponse> {
    let links = state.service.compute_links(&id);

    let links = if links.is_empty() {
        None
    } else {
        let base = base_url(&headers);
        let prefix = &state.settings.resolver.path_prefix;
        Some(
            links
                .into_iter()
                .map(|(key, link)| {
                    let href = absolute_link(&base, prefix, &link);
                    (key, SyncLink { href })
                })
                .collect(),
        )
    };

    Json(SyncResponse {
        timestamp: Utc::now().timestamp(),
        links,
    })
}

/// GET /api/v1/endpoints
pub async fn list_endpoints(State(state): State<AppState>) -> Json<Vec<EndpointSummary>> {
    Json(
        state
            .service
            .list_endpoints()
            .iter()
            .map(EndpointSummary::from)
            .collect(),
    )
}

/// GET /api/v1/endpoint-kinds
pub async fn list_endpoint_kinds() -> Json<Vec<EndpointKindResponse>> {
    Json(
        EndpointKind::ALL
            .iter()
            .map(|kind| EndpointKindResponse {
                id: kind.id(),
                label: kind.label(),
                settings_form: kind.settings_form(),
            })
            .collect(),
    )
}

/// POST /api/v1/entities/preview-url
pub async fn preview_url(
    State(state): State<AppState>,
    Json(entity): Json<ContentEntity>,
) -> Json<PreviewUrlResponse> {
    Json(PreviewUrlResponse {
        url: state.service.preview_url_for_entity(&entity),
    })
}

/// `scheme://host` of the incoming request
fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let scheme = headers
        .get(FORWARDED_PROTO_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    format!("{}://{}", scheme, host)
}
