//! Bulk and individually-tracked equipment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Quantity-tracked equipment: one row per (type, location, status, job)
/// coordinate. Duplicate coordinates are merged by consolidation, so a row's
/// quantity is the full count for its tuple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BulkEquipment {
    pub id: i32,
    pub type_id: i32,
    pub location_id: i32,
    pub quantity: i32,
    /// Status code (see EquipmentStatus)
    pub status: i16,
    /// Holding job while deployed; NULL otherwise
    pub job_id: Option<i32>,
    pub red_tag_reason: Option<String>,
    pub red_tagged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single serialized unit with a human-assigned equipment id (e.g. SS0001)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IndividualEquipment {
    pub id: i32,
    /// Unique human-assigned id following the type's prefix convention
    pub equipment_id: String,
    pub serial_number: Option<String>,
    pub type_id: i32,
    pub location_id: i32,
    /// Status code (see EquipmentStatus)
    pub status: i16,
    /// Holding job while deployed; NULL otherwise
    pub job_id: Option<i32>,
    pub red_tag_reason: Option<String>,
    pub red_tagged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create bulk equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBulkEquipment {
    pub type_id: i32,
    pub location_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub status: Option<i16>,
}

/// Update bulk equipment request (partial)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBulkEquipment {
    pub type_id: Option<i32>,
    pub location_id: Option<i32>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i32>,
    pub status: Option<i16>,
}

/// Create individual equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIndividualEquipment {
    #[validate(length(min = 2, max = 40, message = "Equipment id must be 2-40 characters"))]
    pub equipment_id: String,
    pub serial_number: Option<String>,
    pub type_id: i32,
    pub location_id: i32,
    pub status: Option<i16>,
}

/// Update individual equipment request (partial)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateIndividualEquipment {
    pub serial_number: Option<String>,
    pub location_id: Option<i32>,
    pub status: Option<i16>,
}

/// Equipment list filters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EquipmentQuery {
    pub type_id: Option<i32>,
    pub location_id: Option<i32>,
    pub status: Option<i16>,
    pub job_id: Option<i32>,
}

/// Red-tag request: `quantity` applies to bulk rows only and defaults to the
/// whole row
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RedTagRequest {
    #[validate(length(min = 3, max = 500, message = "Reason must be 3-500 characters"))]
    pub reason: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
}

/// Location transfer request: `quantity` applies to bulk rows only and
/// defaults to the whole row
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    pub to_location_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
}
