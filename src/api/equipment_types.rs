//! Equipment type API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::equipment_type::{CreateEquipmentType, EquipmentType, UpdateEquipmentType},
    AppState,
};

/// List equipment types
#[utoipa::path(
    get,
    path = "/equipment-types",
    tag = "equipment-types",
    responses(
        (status = 200, description = "Equipment types", body = [EquipmentType])
    )
)]
pub async fn list_types(State(state): State<AppState>) -> AppResult<Json<Vec<EquipmentType>>> {
    let types = state.services.catalog.list_types().await?;
    Ok(Json(types))
}

/// Get equipment type by ID
#[utoipa::path(
    get,
    path = "/equipment-types/{id}",
    tag = "equipment-types",
    params(("id" = i32, Path, description = "Equipment type ID")),
    responses(
        (status = 200, description = "Equipment type", body = EquipmentType),
        (status = 404, description = "Type not found")
    )
)]
pub async fn get_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<EquipmentType>> {
    let equipment_type = state.services.catalog.get_type(id).await?;
    Ok(Json(equipment_type))
}

/// Create an equipment type
#[utoipa::path(
    post,
    path = "/equipment-types",
    tag = "equipment-types",
    request_body = CreateEquipmentType,
    responses(
        (status = 201, description = "Equipment type created", body = EquipmentType)
    )
)]
pub async fn create_type(
    State(state): State<AppState>,
    Json(data): Json<CreateEquipmentType>,
) -> AppResult<(StatusCode, Json<EquipmentType>)> {
    let equipment_type = state.services.catalog.create_type(&data).await?;
    Ok((StatusCode::CREATED, Json(equipment_type)))
}

/// Update an equipment type
#[utoipa::path(
    put,
    path = "/equipment-types/{id}",
    tag = "equipment-types",
    params(("id" = i32, Path, description = "Equipment type ID")),
    request_body = UpdateEquipmentType,
    responses(
        (status = 200, description = "Equipment type updated", body = EquipmentType)
    )
)]
pub async fn update_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateEquipmentType>,
) -> AppResult<Json<EquipmentType>> {
    let equipment_type = state.services.catalog.update_type(id, &data).await?;
    Ok(Json(equipment_type))
}

/// Delete an equipment type (refused while equipment references it)
#[utoipa::path(
    delete,
    path = "/equipment-types/{id}",
    tag = "equipment-types",
    params(("id" = i32, Path, description = "Equipment type ID")),
    responses(
        (status = 204, description = "Equipment type deleted"),
        (status = 409, description = "Type still referenced by equipment")
    )
)]
pub async fn delete_type(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Next free equipment id response
#[derive(Serialize, ToSchema)]
pub struct NextIdResponse {
    pub equipment_id: String,
}

/// Next free equipment id for an individually-tracked type
#[utoipa::path(
    get,
    path = "/equipment-types/{id}/next-id",
    tag = "equipment-types",
    params(("id" = i32, Path, description = "Equipment type ID")),
    responses(
        (status = 200, description = "Next id following the type's prefix convention", body = NextIdResponse),
        (status = 422, description = "Type is bulk-tracked or has no prefix")
    )
)]
pub async fn next_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<NextIdResponse>> {
    let equipment_id = state.services.catalog.next_equipment_id(id).await?;
    Ok(Json(NextIdResponse { equipment_id }))
}
