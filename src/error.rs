//! Error types for the Wellstock server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::allocation::EquipmentConflict;

/// Stable wire codes consumed by the field clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 2,
    NoSuchEquipment = 3,
    NoSuchJob = 4,
    EquipmentNotAvailable = 5,
    AllocationConflict = 6,
    InsufficientQuantity = 7,
    Duplicate = 8,
    RecordInUse = 9,
    BadValue = 10,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Equipment is held by another job; carries the structured conflict so
    /// the client can offer keep/transfer resolution choices.
    #[error("Equipment {} is already assigned to {}", .0.equipment_id, .0.current_job_name)]
    AllocationConflict(Box<EquipmentConflict>),

    #[error("Insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity { requested: i32, available: i32 },
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Present only for allocation conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<EquipmentConflict>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut conflict = None;

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchEquipment, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::EquipmentNotAvailable, msg.clone())
            }
            AppError::AllocationConflict(c) => {
                let msg = format!(
                    "{} is already assigned to {}",
                    c.equipment_name, c.current_job_name
                );
                conflict = Some(*c.clone());
                (StatusCode::CONFLICT, ErrorCode::AllocationConflict, msg)
            }
            AppError::InsufficientQuantity { requested, available } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InsufficientQuantity,
                format!("requested {} units, {} available", requested, available),
            ),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            conflict,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
