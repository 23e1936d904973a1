//! Shared domain enums (wire names follow the original field-app vocabulary)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// EquipmentStatus
// ---------------------------------------------------------------------------

/// Equipment lifecycle status. Stored as smallint; `Unavailable` is the
/// derived fallback for ids that resolve nowhere and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[repr(i16)]
pub enum EquipmentStatus {
    Available = 0,
    Deployed = 1,
    Maintenance = 2,
    RedTagged = 3,
    Retired = 4,
    Unavailable = -1,
}

impl EquipmentStatus {
    /// Terminal statuses reject allocation outright, with no conflict record.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EquipmentStatus::Maintenance | EquipmentStatus::RedTagged | EquipmentStatus::Retired
        )
    }
}

impl From<i16> for EquipmentStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => EquipmentStatus::Available,
            1 => EquipmentStatus::Deployed,
            2 => EquipmentStatus::Maintenance,
            3 => EquipmentStatus::RedTagged,
            4 => EquipmentStatus::Retired,
            _ => EquipmentStatus::Unavailable,
        }
    }
}

impl From<EquipmentStatus> for i16 {
    fn from(s: EquipmentStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::Deployed => "deployed",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::RedTagged => "red-tagged",
            EquipmentStatus::Retired => "retired",
            EquipmentStatus::Unavailable => "unavailable",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// AllocationStatus
// ---------------------------------------------------------------------------

/// Ledger-entry status. `Allocated` is the transient in-memory state pending
/// backend confirmation; `Deployed` is confirmed persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[repr(i16)]
pub enum AllocationStatus {
    Allocated = 0,
    Deployed = 1,
    Released = 2,
}

impl From<i16> for AllocationStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => AllocationStatus::Deployed,
            2 => AllocationStatus::Released,
            _ => AllocationStatus::Allocated,
        }
    }
}

impl From<AllocationStatus> for i16 {
    fn from(s: AllocationStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AllocationStatus::Allocated => "allocated",
            AllocationStatus::Deployed => "deployed",
            AllocationStatus::Released => "released",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// EquipmentCategory
// ---------------------------------------------------------------------------

/// Equipment type category codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[repr(i16)]
pub enum EquipmentCategory {
    ControlUnit = 0,
    Gauge = 1,
    Communication = 2,
    Computer = 3,
    Cable = 4,
    Fitting = 5,
    Other = 6,
}

impl From<i16> for EquipmentCategory {
    fn from(v: i16) -> Self {
        match v {
            0 => EquipmentCategory::ControlUnit,
            1 => EquipmentCategory::Gauge,
            2 => EquipmentCategory::Communication,
            3 => EquipmentCategory::Computer,
            4 => EquipmentCategory::Cable,
            5 => EquipmentCategory::Fitting,
            _ => EquipmentCategory::Other,
        }
    }
}

impl From<EquipmentCategory> for i16 {
    fn from(c: EquipmentCategory) -> Self {
        c as i16
    }
}

impl std::fmt::Display for EquipmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentCategory::ControlUnit => "Control Unit",
            EquipmentCategory::Gauge => "Gauge",
            EquipmentCategory::Communication => "Communication",
            EquipmentCategory::Computer => "Computer",
            EquipmentCategory::Cable => "Cable",
            EquipmentCategory::Fitting => "Fitting",
            EquipmentCategory::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// ChangeOp
// ---------------------------------------------------------------------------

/// Row-level change operation, matching Postgres TG_OP spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}
