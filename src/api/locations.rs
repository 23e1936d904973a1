//! Storage location API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::location::{CreateStorageLocation, StorageLocation, UpdateStorageLocation},
    AppState,
};

/// List storage locations
#[utoipa::path(
    get,
    path = "/locations",
    tag = "locations",
    responses(
        (status = 200, description = "Storage locations", body = [StorageLocation])
    )
)]
pub async fn list_locations(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StorageLocation>>> {
    let locations = state.services.catalog.list_locations().await?;
    Ok(Json(locations))
}

/// Get the default location (where returned equipment lands)
#[utoipa::path(
    get,
    path = "/locations/default",
    tag = "locations",
    responses(
        (status = 200, description = "Default storage location", body = StorageLocation),
        (status = 404, description = "No default location configured")
    )
)]
pub async fn get_default_location(
    State(state): State<AppState>,
) -> AppResult<Json<StorageLocation>> {
    let location = state
        .services
        .catalog
        .default_location()
        .await?
        .ok_or_else(|| AppError::NotFound("No default location configured".to_string()))?;
    Ok(Json(location))
}

/// Get storage location by ID
#[utoipa::path(
    get,
    path = "/locations/{id}",
    tag = "locations",
    params(("id" = i32, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Storage location", body = StorageLocation),
        (status = 404, description = "Location not found")
    )
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<StorageLocation>> {
    let location = state.services.catalog.get_location(id).await?;
    Ok(Json(location))
}

/// Create a storage location
#[utoipa::path(
    post,
    path = "/locations",
    tag = "locations",
    request_body = CreateStorageLocation,
    responses(
        (status = 201, description = "Location created", body = StorageLocation)
    )
)]
pub async fn create_location(
    State(state): State<AppState>,
    Json(data): Json<CreateStorageLocation>,
) -> AppResult<(StatusCode, Json<StorageLocation>)> {
    let location = state.services.catalog.create_location(&data).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// Update a storage location
#[utoipa::path(
    put,
    path = "/locations/{id}",
    tag = "locations",
    params(("id" = i32, Path, description = "Location ID")),
    request_body = UpdateStorageLocation,
    responses(
        (status = 200, description = "Location updated", body = StorageLocation)
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateStorageLocation>,
) -> AppResult<Json<StorageLocation>> {
    let location = state.services.catalog.update_location(id, &data).await?;
    Ok(Json(location))
}

/// Mark a location as the default, clearing the flag elsewhere
#[utoipa::path(
    put,
    path = "/locations/{id}/default",
    tag = "locations",
    params(("id" = i32, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location set as default", body = StorageLocation)
    )
)]
pub async fn set_default_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<StorageLocation>> {
    let location = state.services.catalog.set_default_location(id).await?;
    Ok(Json(location))
}

/// Delete a storage location (refused while equipment is stored there)
#[utoipa::path(
    delete,
    path = "/locations/{id}",
    tag = "locations",
    params(("id" = i32, Path, description = "Location ID")),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 409, description = "Location still holds equipment")
    )
)]
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_location(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
