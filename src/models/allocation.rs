//! Allocation ledger entries, conflicts, and change-feed envelopes.
//!
//! These types live only in process memory: ledger entries until released or
//! the process resyncs, conflicts until resolved. Nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::{AllocationStatus, ChangeOp};
use super::equipment::{BulkEquipment, IndividualEquipment};

/// Ledger entry: who holds this equipment right now, from this process's
/// point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EquipmentAllocation {
    pub equipment_id: String,
    pub job_id: i32,
    pub job_name: String,
    pub status: AllocationStatus,
    pub timestamp: DateTime<Utc>,
}

impl EquipmentAllocation {
    pub fn allocated(equipment_id: &str, job_id: i32, job_name: &str) -> Self {
        Self {
            equipment_id: equipment_id.to_string(),
            job_id,
            job_name: job_name.to_string(),
            status: AllocationStatus::Allocated,
            timestamp: Utc::now(),
        }
    }
}

/// Double-booking record produced by the conflict detector and consumed by
/// the resolver. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EquipmentConflict {
    pub id: Uuid,
    pub equipment_id: String,
    pub equipment_name: String,
    pub current_job_id: i32,
    pub current_job_name: String,
    pub requested_job_id: i32,
    pub requested_job_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Resolution choice for a detected conflict. Wire spelling matches the
/// original field app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ConflictResolution {
    KeepCurrent,
    TransferToRequester,
}

/// Outcome of a batched deploy/release write.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchOutcome {
    pub success_count: i64,
    pub failure_count: i64,
    pub duration_ms: u64,
}

/// Allocation request. `quantity` applies to bulk equipment only and
/// defaults to the whole row.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AllocationRequest {
    #[validate(length(min = 1, max = 40, message = "Equipment id is required"))]
    pub equipment_id: String,
    pub job_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
}

/// Release request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReleaseRequest {
    #[validate(length(min = 1, max = 40, message = "Equipment id is required"))]
    pub equipment_id: String,
    pub job_id: i32,
}

/// Conflict resolution request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveConflictRequest {
    pub resolution: ConflictResolution,
}

/// Availability check outcome. `conflict` is present only when the refusal
/// is a genuine double-booking, never for terminal statuses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidationOutcome {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<EquipmentConflict>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            available: true,
            reason: None,
            conflict: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            conflict: None,
        }
    }
}

/// Derived status for a single equipment id, ledger first then catalog.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EquipmentStatusResponse {
    pub equipment_id: String,
    pub status: super::enums::EquipmentStatus,
}

/// One row-level change from the equipment change feed, as emitted by the
/// database triggers (and re-broadcast to SSE clients).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EquipmentChange {
    /// Source table name (`individual_equipment` or `bulk_equipment`)
    pub table: String,
    pub op: ChangeOp,
    /// Row image: new row for insert/update, old row for delete
    #[schema(value_type = Object)]
    pub row: serde_json::Value,
}

impl EquipmentChange {
    pub const INDIVIDUAL_TABLE: &'static str = "individual_equipment";
    pub const BULK_TABLE: &'static str = "bulk_equipment";

    /// Typed row image for individual-equipment changes; None for other
    /// tables or unparsable payloads.
    pub fn individual_row(&self) -> Option<IndividualEquipment> {
        if self.table != Self::INDIVIDUAL_TABLE {
            return None;
        }
        serde_json::from_value(self.row.clone()).ok()
    }

    /// Typed row image for bulk-equipment changes.
    pub fn bulk_row(&self) -> Option<BulkEquipment> {
        if self.table != Self::BULK_TABLE {
            return None;
        }
        serde_json::from_value(self.row.clone()).ok()
    }
}
