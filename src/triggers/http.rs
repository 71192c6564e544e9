use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{ContentEntity, Operation};
use crate::error::{AppError, Result};
use crate::notification::DispatchReport;
use crate::server::AppState;
use crate::service::MutationTicket;

/// A content entity was created, updated or deleted
#[derive(Debug, Deserialize)]
pub struct EntityMutatedRequest {
    pub operation: Operation,
    pub entity: ContentEntity,
}

#[derive(Debug, Serialize)]
pub struct EntityMutatedResponse {
    /// Identifier used in logs for this mutation
    pub mutation_id: Uuid,
    /// Endpoints that will be notified
    pub selected_endpoints: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ManualBuildResponse {
    pub success: bool,
    pub reports: Vec<DispatchReport>,
    pub timestamp: DateTime<Utc>,
}

impl ManualBuildResponse {
    fn new(reports: Vec<DispatchReport>) -> Self {
        Self {
            success: reports.iter().all(DispatchReport::success),
            reports,
            timestamp: Utc::now(),
        }
    }
}

/// Accept a mutation and notify endpoints in the background
#[tracing::instrument(
    name = "http.entity_mutated",
    skip(state, request),
    fields(operation = %request.operation, uuid = %request.entity.uuid)
)]
pub async fn entity_mutated(
    State(state): State<AppState>,
    Json(request): Json<EntityMutatedRequest>,
) -> Result<(StatusCode, Json<EntityMutatedResponse>)> {
    validate_entity(&request.entity)?;

    let mutation_id = Uuid::new_v4();
    tracing::debug!(mutation_id = %mutation_id, "Dispatching entity mutation");

    // Deliveries outlive the request; the handle is detached.
    let MutationTicket { selected, .. } = state
        .service
        .on_entity_mutated(request.entity, request.operation);

    Ok((
        StatusCode::ACCEPTED,
        Json(EntityMutatedResponse {
            mutation_id,
            selected_endpoints: selected,
            timestamp: Utc::now(),
        }),
    ))
}

/// Call the build URLs of one endpoint
#[tracing::instrument(name = "http.trigger_endpoint_build", skip(state))]
pub async fn trigger_endpoint_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ManualBuildResponse>> {
    if state.service.get_endpoint(&id).is_none() {
        return Err(AppError::NotFound(format!("Endpoint '{}' not found", id)));
    }

    let reports = state.service.trigger_manual_build(Some(&id)).await;
    Ok(Json(ManualBuildResponse::new(reports)))
}

/// Call the build URLs of every manual-mode endpoint
#[tracing::instrument(name = "http.trigger_manual_builds", skip(state))]
pub async fn trigger_manual_builds(State(state): State<AppState>) -> Json<ManualBuildResponse> {
    let reports = state.service.trigger_manual_build(None).await;
    Json(ManualBuildResponse::new(reports))
}

fn validate_entity(entity: &ContentEntity) -> Result<()> {
    let missing = [
        ("type", &entity.entity_type),
        ("bundle", &entity.bundle),
        ("uuid", &entity.uuid),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    match missing {
        Some((name, _)) => Err(AppError::Validation(format!("Entity {} is required", name))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_entity() {
        assert!(validate_entity(&ContentEntity::new("node", "page", "n1")).is_ok());
        assert!(matches!(
            validate_entity(&ContentEntity::new("node", " ", "n1")),
            Err(AppError::Validation(msg)) if msg.contains("bundle")
        ));
    }

    #[test]
    fn test_request_deserializes() {
        let request: EntityMutatedRequest = serde_json::from_value(serde_json::json!({
            "operation": "update",
            "entity": {"type": "node", "bundle": "page", "uuid": "n1", "published": true}
        }))
        .unwrap();

        assert_eq!(request.operation, Operation::Update);
        assert_eq!(request.entity.published, Some(true));
    }
}
