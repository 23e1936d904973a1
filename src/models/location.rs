//! Storage location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// A physical storage location. Job sites are modeled as locations by
/// convention; `is_default` marks the fallback/return yard (at most one).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StorageLocation {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create location request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStorageLocation {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: String,
    pub address: Option<String>,
    pub is_default: Option<bool>,
}

/// Update location request (partial)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStorageLocation {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: Option<String>,
    pub address: Option<String>,
}
