//! Equipment type (catalog class) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// A class of equipment (e.g. "ShearStream Box", "1502 Pressure Gauge")
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EquipmentType {
    pub id: i32,
    pub name: String,
    /// Category code (see EquipmentCategory)
    pub category: i16,
    /// Whether units of this type carry individual serial tracking
    pub requires_individual_tracking: bool,
    /// Prefix convention for human-assigned equipment ids (e.g. "SS" -> SS0001)
    pub id_prefix: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create equipment type request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipmentType {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: String,
    pub category: Option<i16>,
    pub requires_individual_tracking: Option<bool>,
    #[validate(length(min = 1, max = 6, message = "Prefix must be 1-6 characters"))]
    pub id_prefix: Option<String>,
    pub notes: Option<String>,
}

/// Update equipment type request (partial)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipmentType {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: Option<String>,
    pub category: Option<i16>,
    pub requires_individual_tracking: Option<bool>,
    #[validate(length(min = 1, max = 6, message = "Prefix must be 1-6 characters"))]
    pub id_prefix: Option<String>,
    pub notes: Option<String>,
}
