//! Job model and equipment manifest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// The equipment a job wants deployed: control box ids, an optional satellite
/// uplink id, and data-van computer ids. All entries are individual
/// equipment ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EquipmentManifest {
    #[serde(default)]
    pub box_ids: Vec<String>,
    #[serde(default)]
    pub satellite_id: Option<String>,
    #[serde(default)]
    pub computer_ids: Vec<String>,
}

impl EquipmentManifest {
    /// Full desired equipment set, deduplicated, in manifest order.
    pub fn desired_equipment(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let all = self
            .box_ids
            .iter()
            .chain(self.satellite_id.iter())
            .chain(self.computer_ids.iter());
        for id in all {
            if seen.insert(id.clone()) {
                out.push(id.clone());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.box_ids.is_empty() && self.satellite_id.is_none() && self.computer_ids.is_empty()
    }
}

/// A field job. By convention the job site itself is also a storage location.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Job {
    pub id: i32,
    pub name: String,
    pub client: Option<String>,
    pub wellsite: Option<String>,
    #[schema(value_type = EquipmentManifest)]
    pub equipment_manifest: sqlx::types::Json<EquipmentManifest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create job request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateJob {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: String,
    pub client: Option<String>,
    pub wellsite: Option<String>,
    pub equipment_manifest: Option<EquipmentManifest>,
}

/// Update job request (partial). Supplying a manifest triggers an equipment
/// sync for the job.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateJob {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: Option<String>,
    pub client: Option<String>,
    pub wellsite: Option<String>,
    pub equipment_manifest: Option<EquipmentManifest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_equipment_order_and_dedup() {
        let manifest = EquipmentManifest {
            box_ids: vec!["SS0001".into(), "SS0002".into()],
            satellite_id: Some("SL0001".into()),
            computer_ids: vec!["CC0001".into(), "SS0001".into()],
        };
        assert_eq!(
            manifest.desired_equipment(),
            vec!["SS0001", "SS0002", "SL0001", "CC0001"]
        );
    }

    #[test]
    fn test_empty_manifest() {
        assert!(EquipmentManifest::default().is_empty());
        assert!(EquipmentManifest::default().desired_equipment().is_empty());
    }
}
