//! Data models for Wellstock

pub mod allocation;
pub mod enums;
pub mod equipment;
pub mod equipment_type;
pub mod job;
pub mod location;

// Re-export commonly used types
pub use allocation::{BatchOutcome, EquipmentAllocation, EquipmentChange, EquipmentConflict};
pub use enums::{AllocationStatus, ChangeOp, EquipmentCategory, EquipmentStatus};
pub use equipment::{BulkEquipment, IndividualEquipment};
pub use equipment_type::EquipmentType;
pub use job::{EquipmentManifest, Job};
pub use location::StorageLocation;
