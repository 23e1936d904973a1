//! Allocation API endpoints: validate, allocate, release, conflicts, resync

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::allocation::{
        AllocationRequest, ConflictResolution, EquipmentAllocation, EquipmentConflict,
        ReleaseRequest, ResolveConflictRequest, ValidationOutcome,
    },
    AppState,
};

/// Check whether equipment can be allocated to a job. Refusals come back as
/// a normal response, with the conflict attached when the refusal is a
/// double-booking.
#[utoipa::path(
    post,
    path = "/allocations/validate",
    tag = "allocations",
    request_body = AllocationRequest,
    responses(
        (status = 200, description = "Availability verdict", body = ValidationOutcome),
        (status = 404, description = "Job not found")
    )
)]
pub async fn validate(
    State(state): State<AppState>,
    Json(data): Json<AllocationRequest>,
) -> AppResult<Json<ValidationOutcome>> {
    data.validate()?;
    let job = state.services.jobs.get_by_id(data.job_id).await?;
    let outcome = state.services.allocation.validate_availability(
        &data.equipment_id,
        job.id,
        &job.name,
        data.quantity,
    );
    Ok(Json(outcome))
}

/// Allocate equipment to a job
#[utoipa::path(
    post,
    path = "/allocations",
    tag = "allocations",
    request_body = AllocationRequest,
    responses(
        (status = 201, description = "Equipment allocated", body = EquipmentAllocation),
        (status = 409, description = "Equipment already held by another job"),
        (status = 422, description = "Equipment out of service or quantity unavailable")
    )
)]
pub async fn allocate(
    State(state): State<AppState>,
    Json(data): Json<AllocationRequest>,
) -> AppResult<(StatusCode, Json<EquipmentAllocation>)> {
    data.validate()?;
    let job = state.services.jobs.get_by_id(data.job_id).await?;
    let entry = state
        .services
        .allocation
        .allocate(&data.equipment_id, job.id, &job.name, data.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Release equipment back to the available pool
#[utoipa::path(
    post,
    path = "/allocations/release",
    tag = "allocations",
    request_body = ReleaseRequest,
    responses(
        (status = 204, description = "Equipment released"),
        (status = 422, description = "Equipment held by a different job")
    )
)]
pub async fn release(
    State(state): State<AppState>,
    Json(data): Json<ReleaseRequest>,
) -> AppResult<StatusCode> {
    data.validate()?;
    state
        .services
        .allocation
        .release(&data.equipment_id, data.job_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Conflicts awaiting resolution
#[utoipa::path(
    get,
    path = "/allocations/conflicts",
    tag = "allocations",
    responses(
        (status = 200, description = "Pending conflicts", body = [EquipmentConflict])
    )
)]
pub async fn list_conflicts(State(state): State<AppState>) -> Json<Vec<EquipmentConflict>> {
    Json(state.services.allocation.pending_conflicts())
}

/// Conflict resolution outcome
#[derive(Serialize, ToSchema)]
pub struct ResolveConflictResponse {
    pub resolution: ConflictResolution,
    /// New allocation when the equipment was transferred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<EquipmentAllocation>,
}

/// Resolve a pending conflict: keep the current holder or transfer to the
/// requester
#[utoipa::path(
    post,
    path = "/allocations/conflicts/{id}/resolve",
    tag = "allocations",
    params(("id" = Uuid, Path, description = "Conflict ID")),
    request_body = ResolveConflictRequest,
    responses(
        (status = 200, description = "Conflict resolved", body = ResolveConflictResponse),
        (status = 404, description = "Conflict not found")
    )
)]
pub async fn resolve_conflict(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<ResolveConflictRequest>,
) -> AppResult<Json<ResolveConflictResponse>> {
    let allocation = state
        .services
        .allocation
        .resolve_conflict(id, data.resolution)
        .await?;
    Ok(Json(ResolveConflictResponse {
        resolution: data.resolution,
        allocation,
    }))
}

/// Run a full inventory reconciliation now instead of waiting for the
/// debounced pass
#[utoipa::path(
    post,
    path = "/allocations/resync",
    tag = "allocations",
    responses(
        (status = 204, description = "Inventory reconciled")
    )
)]
pub async fn resync(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.services.allocation.sync_inventory_status().await?;
    Ok(StatusCode::NO_CONTENT)
}
