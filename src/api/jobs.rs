//! Job API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        allocation::{BatchOutcome, EquipmentAllocation},
        job::{CreateJob, Job, UpdateJob},
    },
    AppState,
};

/// List jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Jobs", body = [Job])
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Vec<Job>>> {
    let jobs = state.services.jobs.list().await?;
    Ok(Json(jobs))
}

/// Get job by ID
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job", body = Job),
        (status = 404, description = "Job not found")
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Job>> {
    let job = state.services.jobs.get_by_id(id).await?;
    Ok(Json(job))
}

/// Create a job; a non-empty equipment manifest triggers an immediate sync
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = CreateJob,
    responses(
        (status = 201, description = "Job created", body = Job)
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    Json(data): Json<CreateJob>,
) -> AppResult<(StatusCode, Json<Job>)> {
    let job = state.services.jobs.create(&data).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// Update a job; supplying a manifest re-syncs the job's equipment
#[utoipa::path(
    put,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    request_body = UpdateJob,
    responses(
        (status = 200, description = "Job updated", body = Job)
    )
)]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateJob>,
) -> AppResult<Json<Job>> {
    let job = state.services.jobs.update(id, &data).await?;
    Ok(Json(job))
}

/// Delete a job, releasing all equipment it holds
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 204, description = "Job deleted, equipment released")
    )
)]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.jobs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Re-run the manifest-driven equipment sync for a job
#[utoipa::path(
    post,
    path = "/jobs/{id}/sync-equipment",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Sync outcome", body = BatchOutcome)
    )
)]
pub async fn sync_equipment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BatchOutcome>> {
    let outcome = state.services.jobs.sync_equipment(id).await?;
    Ok(Json(outcome))
}

/// Equipment currently allocated to a job
#[utoipa::path(
    get,
    path = "/jobs/{id}/allocations",
    tag = "jobs",
    params(("id" = i32, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Current allocations", body = [EquipmentAllocation])
    )
)]
pub async fn job_allocations(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<EquipmentAllocation>>> {
    let allocations = state.services.jobs.allocations(id).await?;
    Ok(Json(allocations))
}
