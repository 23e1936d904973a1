//! Equipment API endpoints (individual units and bulk stock)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        allocation::EquipmentStatusResponse,
        equipment::{
            BulkEquipment, CreateBulkEquipment, CreateIndividualEquipment, EquipmentQuery,
            IndividualEquipment, RedTagRequest, TransferRequest, UpdateBulkEquipment,
            UpdateIndividualEquipment,
        },
    },
    AppState,
};

// ---------------------------------------------------------------------------
// Individual equipment
// ---------------------------------------------------------------------------

/// List individual equipment with filters
#[utoipa::path(
    get,
    path = "/equipment/individual",
    tag = "equipment",
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Individual equipment", body = [IndividualEquipment])
    )
)]
pub async fn list_individual(
    State(state): State<AppState>,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<Vec<IndividualEquipment>>> {
    let units = state.services.catalog.list_individual(&query).await?;
    Ok(Json(units))
}

/// Get an individual unit by equipment id
#[utoipa::path(
    get,
    path = "/equipment/individual/{equipment_id}",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment ID (e.g. SS0001)")),
    responses(
        (status = 200, description = "Individual unit", body = IndividualEquipment),
        (status = 404, description = "Unit not found")
    )
)]
pub async fn get_individual(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> AppResult<Json<IndividualEquipment>> {
    let unit = state.services.catalog.get_individual(&equipment_id).await?;
    Ok(Json(unit))
}

/// Create an individual unit
#[utoipa::path(
    post,
    path = "/equipment/individual",
    tag = "equipment",
    request_body = CreateIndividualEquipment,
    responses(
        (status = 201, description = "Unit created", body = IndividualEquipment),
        (status = 400, description = "Equipment id violates the type's prefix convention")
    )
)]
pub async fn create_individual(
    State(state): State<AppState>,
    Json(data): Json<CreateIndividualEquipment>,
) -> AppResult<(StatusCode, Json<IndividualEquipment>)> {
    let unit = state.services.catalog.create_individual(&data).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update an individual unit
#[utoipa::path(
    put,
    path = "/equipment/individual/{equipment_id}",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment ID")),
    request_body = UpdateIndividualEquipment,
    responses(
        (status = 200, description = "Unit updated", body = IndividualEquipment)
    )
)]
pub async fn update_individual(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
    Json(data): Json<UpdateIndividualEquipment>,
) -> AppResult<Json<IndividualEquipment>> {
    let unit = state
        .services
        .catalog
        .update_individual(&equipment_id, &data)
        .await?;
    Ok(Json(unit))
}

/// Delete an individual unit (refused while deployed)
#[utoipa::path(
    delete,
    path = "/equipment/individual/{equipment_id}",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Unit deleted"),
        (status = 409, description = "Unit is deployed")
    )
)]
pub async fn delete_individual(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_individual(&equipment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Red-tag an individual unit (damaged, out of service)
#[utoipa::path(
    post,
    path = "/equipment/individual/{equipment_id}/red-tag",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment ID")),
    request_body = RedTagRequest,
    responses(
        (status = 200, description = "Unit red-tagged", body = IndividualEquipment)
    )
)]
pub async fn red_tag_individual(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
    Json(data): Json<RedTagRequest>,
) -> AppResult<Json<IndividualEquipment>> {
    let unit = state
        .services
        .catalog
        .red_tag_individual(&equipment_id, &data)
        .await?;
    Ok(Json(unit))
}

/// Lift the red tag from an individual unit
#[utoipa::path(
    delete,
    path = "/equipment/individual/{equipment_id}/red-tag",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Red tag lifted", body = IndividualEquipment)
    )
)]
pub async fn lift_red_tag_individual(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> AppResult<Json<IndividualEquipment>> {
    let unit = state
        .services
        .catalog
        .lift_red_tag_individual(&equipment_id)
        .await?;
    Ok(Json(unit))
}

/// Move an individual unit to another storage location
#[utoipa::path(
    post,
    path = "/equipment/individual/{equipment_id}/transfer",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment ID")),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Unit transferred", body = IndividualEquipment),
        (status = 422, description = "Unit is deployed")
    )
)]
pub async fn transfer_individual(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
    Json(data): Json<TransferRequest>,
) -> AppResult<Json<IndividualEquipment>> {
    let unit = state
        .services
        .catalog
        .transfer_individual(&equipment_id, &data)
        .await?;
    Ok(Json(unit))
}

// ---------------------------------------------------------------------------
// Bulk equipment
// ---------------------------------------------------------------------------

/// List bulk equipment rows with filters
#[utoipa::path(
    get,
    path = "/equipment/bulk",
    tag = "equipment",
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Bulk equipment rows", body = [BulkEquipment])
    )
)]
pub async fn list_bulk(
    State(state): State<AppState>,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<Vec<BulkEquipment>>> {
    let rows = state.services.catalog.list_bulk(&query).await?;
    Ok(Json(rows))
}

/// Get a bulk row by ID
#[utoipa::path(
    get,
    path = "/equipment/bulk/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Bulk row ID")),
    responses(
        (status = 200, description = "Bulk row", body = BulkEquipment),
        (status = 404, description = "Row not found")
    )
)]
pub async fn get_bulk(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BulkEquipment>> {
    let row = state.services.catalog.get_bulk(id).await?;
    Ok(Json(row))
}

/// Create a bulk equipment row
#[utoipa::path(
    post,
    path = "/equipment/bulk",
    tag = "equipment",
    request_body = CreateBulkEquipment,
    responses(
        (status = 201, description = "Bulk row created", body = BulkEquipment)
    )
)]
pub async fn create_bulk(
    State(state): State<AppState>,
    Json(data): Json<CreateBulkEquipment>,
) -> AppResult<(StatusCode, Json<BulkEquipment>)> {
    let row = state.services.catalog.create_bulk(&data).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// Update a bulk equipment row
#[utoipa::path(
    put,
    path = "/equipment/bulk/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Bulk row ID")),
    request_body = UpdateBulkEquipment,
    responses(
        (status = 200, description = "Bulk row updated", body = BulkEquipment)
    )
)]
pub async fn update_bulk(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateBulkEquipment>,
) -> AppResult<Json<BulkEquipment>> {
    let row = state.services.catalog.update_bulk(id, &data).await?;
    Ok(Json(row))
}

/// Delete a bulk equipment row (refused while deployed)
#[utoipa::path(
    delete,
    path = "/equipment/bulk/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Bulk row ID")),
    responses(
        (status = 204, description = "Bulk row deleted"),
        (status = 409, description = "Row is deployed")
    )
)]
pub async fn delete_bulk(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_bulk(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Red-tag bulk stock, splitting the row on a partial quantity
#[utoipa::path(
    post,
    path = "/equipment/bulk/{id}/red-tag",
    tag = "equipment",
    params(("id" = i32, Path, description = "Bulk row ID")),
    request_body = RedTagRequest,
    responses(
        (status = 204, description = "Stock red-tagged")
    )
)]
pub async fn red_tag_bulk(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<RedTagRequest>,
) -> AppResult<StatusCode> {
    state.services.catalog.red_tag_bulk(id, &data).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lift the red tag from a bulk row
#[utoipa::path(
    delete,
    path = "/equipment/bulk/{id}/red-tag",
    tag = "equipment",
    params(("id" = i32, Path, description = "Bulk row ID")),
    responses(
        (status = 200, description = "Red tag lifted", body = BulkEquipment)
    )
)]
pub async fn lift_red_tag_bulk(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BulkEquipment>> {
    let row = state.services.catalog.lift_red_tag_bulk(id).await?;
    Ok(Json(row))
}

/// Move bulk stock to another location, splitting on a partial quantity
#[utoipa::path(
    post,
    path = "/equipment/bulk/{id}/transfer",
    tag = "equipment",
    params(("id" = i32, Path, description = "Bulk row ID")),
    request_body = TransferRequest,
    responses(
        (status = 204, description = "Stock transferred"),
        (status = 422, description = "Row is deployed or quantity too large")
    )
)]
pub async fn transfer_bulk(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<TransferRequest>,
) -> AppResult<StatusCode> {
    state.services.catalog.transfer_bulk(id, &data).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Consolidation outcome
#[derive(Serialize, ToSchema)]
pub struct ConsolidateResponse {
    /// Number of rows merged away
    pub merged: u64,
}

/// Merge duplicate bulk rows sharing (type, location, status, job)
#[utoipa::path(
    post,
    path = "/equipment/consolidate",
    tag = "equipment",
    responses(
        (status = 200, description = "Duplicate rows merged", body = ConsolidateResponse)
    )
)]
pub async fn consolidate(State(state): State<AppState>) -> AppResult<Json<ConsolidateResponse>> {
    let merged = state.services.catalog.consolidate().await?;
    Ok(Json(ConsolidateResponse { merged }))
}

// ---------------------------------------------------------------------------
// Derived status
// ---------------------------------------------------------------------------

/// Current status for an equipment id, ledger first then catalog
#[utoipa::path(
    get,
    path = "/equipment/{equipment_id}/status",
    tag = "equipment",
    params(("equipment_id" = String, Path, description = "Equipment ID or bulk row ID")),
    responses(
        (status = 200, description = "Derived equipment status", body = EquipmentStatusResponse)
    )
)]
pub async fn equipment_status(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> Json<EquipmentStatusResponse> {
    let status = state.services.allocation.equipment_status(&equipment_id);
    Json(EquipmentStatusResponse {
        equipment_id,
        status,
    })
}
