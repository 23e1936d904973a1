//! Equipment catalog service: types, storage locations, and equipment CRUD.
//!
//! Thin layer over the repository. The allocation core keeps its own cached
//! view of the catalog; direct catalog edits reach it through the change
//! feed, not through this service.

use regex::Regex;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::EquipmentStatus,
        equipment::{
            BulkEquipment, CreateBulkEquipment, CreateIndividualEquipment, EquipmentQuery,
            IndividualEquipment, RedTagRequest, TransferRequest, UpdateBulkEquipment,
            UpdateIndividualEquipment,
        },
        equipment_type::{CreateEquipmentType, EquipmentType, UpdateEquipmentType},
        location::{CreateStorageLocation, StorageLocation, UpdateStorageLocation},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Database reachability probe for the readiness endpoint.
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.repository.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Equipment types
    // ------------------------------------------------------------------

    pub async fn list_types(&self) -> AppResult<Vec<EquipmentType>> {
        self.repository.equipment_types.list().await
    }

    pub async fn get_type(&self, id: i32) -> AppResult<EquipmentType> {
        self.repository.equipment_types.get_by_id(id).await
    }

    pub async fn create_type(&self, data: &CreateEquipmentType) -> AppResult<EquipmentType> {
        data.validate()?;
        self.repository.equipment_types.create(data).await
    }

    pub async fn update_type(&self, id: i32, data: &UpdateEquipmentType) -> AppResult<EquipmentType> {
        data.validate()?;
        self.repository.equipment_types.update(id, data).await
    }

    pub async fn delete_type(&self, id: i32) -> AppResult<()> {
        self.repository.equipment_types.delete(id).await
    }

    /// Next free equipment id for an individually-tracked type, following
    /// its prefix convention (SS, SL, CC, ...).
    pub async fn next_equipment_id(&self, type_id: i32) -> AppResult<String> {
        let equipment_type = self.repository.equipment_types.get_by_id(type_id).await?;
        if !equipment_type.requires_individual_tracking {
            return Err(AppError::BusinessRule(format!(
                "Type {} is bulk-tracked and has no equipment ids",
                equipment_type.name
            )));
        }
        let prefix = equipment_type.id_prefix.as_deref().ok_or_else(|| {
            AppError::BusinessRule(format!(
                "Type {} has no id prefix configured",
                equipment_type.name
            ))
        })?;
        let existing = self
            .repository
            .equipment_types
            .equipment_ids_for_type(type_id)
            .await?;
        next_id_from(prefix, &existing)
    }

    // ------------------------------------------------------------------
    // Storage locations
    // ------------------------------------------------------------------

    pub async fn list_locations(&self) -> AppResult<Vec<StorageLocation>> {
        self.repository.locations.list().await
    }

    pub async fn get_location(&self, id: i32) -> AppResult<StorageLocation> {
        self.repository.locations.get_by_id(id).await
    }

    pub async fn default_location(&self) -> AppResult<Option<StorageLocation>> {
        self.repository.locations.find_default().await
    }

    pub async fn create_location(&self, data: &CreateStorageLocation) -> AppResult<StorageLocation> {
        data.validate()?;
        self.repository.locations.create(data).await
    }

    pub async fn update_location(
        &self,
        id: i32,
        data: &UpdateStorageLocation,
    ) -> AppResult<StorageLocation> {
        data.validate()?;
        self.repository.locations.update(id, data).await
    }

    pub async fn set_default_location(&self, id: i32) -> AppResult<StorageLocation> {
        self.repository.locations.set_default(id).await
    }

    pub async fn delete_location(&self, id: i32) -> AppResult<()> {
        self.repository.locations.delete(id).await
    }

    // ------------------------------------------------------------------
    // Individual equipment
    // ------------------------------------------------------------------

    pub async fn list_individual(&self, query: &EquipmentQuery) -> AppResult<Vec<IndividualEquipment>> {
        self.repository.equipment.list_individual(query).await
    }

    pub async fn get_individual(&self, equipment_id: &str) -> AppResult<IndividualEquipment> {
        self.repository.equipment.get_individual(equipment_id).await
    }

    /// Create a unit, enforcing the type's id prefix convention when one is
    /// configured.
    pub async fn create_individual(
        &self,
        data: &CreateIndividualEquipment,
    ) -> AppResult<IndividualEquipment> {
        data.validate()?;
        reject_deployed_status(data.status)?;
        let equipment_type = self
            .repository
            .equipment_types
            .get_by_id(data.type_id)
            .await?;
        if !equipment_type.requires_individual_tracking {
            return Err(AppError::BusinessRule(format!(
                "Type {} is bulk-tracked; create a bulk row instead",
                equipment_type.name
            )));
        }
        if let Some(prefix) = equipment_type.id_prefix.as_deref() {
            let pattern = id_pattern(prefix)?;
            if !pattern.is_match(&data.equipment_id) {
                return Err(AppError::Validation(format!(
                    "Equipment id {} does not match the {} prefix convention ({}NNNN)",
                    data.equipment_id, equipment_type.name, prefix
                )));
            }
        }
        self.repository.equipment.create_individual(data).await
    }

    pub async fn update_individual(
        &self,
        equipment_id: &str,
        data: &UpdateIndividualEquipment,
    ) -> AppResult<IndividualEquipment> {
        data.validate()?;
        reject_deployed_status(data.status)?;
        self.repository
            .equipment
            .update_individual(equipment_id, data)
            .await
    }

    pub async fn delete_individual(&self, equipment_id: &str) -> AppResult<()> {
        let unit = self.repository.equipment.get_individual(equipment_id).await?;
        if unit.job_id.is_some() {
            return Err(AppError::BusinessRule(format!(
                "Equipment {} is deployed; release it before deleting",
                equipment_id
            )));
        }
        self.repository.equipment.delete_individual(equipment_id).await
    }

    pub async fn red_tag_individual(
        &self,
        equipment_id: &str,
        data: &RedTagRequest,
    ) -> AppResult<IndividualEquipment> {
        data.validate()?;
        self.repository
            .equipment
            .red_tag_individual(equipment_id, &data.reason)
            .await
    }

    pub async fn lift_red_tag_individual(&self, equipment_id: &str) -> AppResult<IndividualEquipment> {
        self.repository
            .equipment
            .lift_red_tag_individual(equipment_id)
            .await
    }

    pub async fn transfer_individual(
        &self,
        equipment_id: &str,
        data: &TransferRequest,
    ) -> AppResult<IndividualEquipment> {
        data.validate()?;
        // Destination must exist; a bad id would otherwise surface as a
        // foreign-key error.
        self.repository.locations.get_by_id(data.to_location_id).await?;
        self.repository
            .equipment
            .transfer_individual(equipment_id, data.to_location_id)
            .await
    }

    // ------------------------------------------------------------------
    // Bulk equipment
    // ------------------------------------------------------------------

    pub async fn list_bulk(&self, query: &EquipmentQuery) -> AppResult<Vec<BulkEquipment>> {
        self.repository.equipment.list_bulk(query).await
    }

    pub async fn get_bulk(&self, id: i32) -> AppResult<BulkEquipment> {
        self.repository.equipment.get_bulk(id).await
    }

    pub async fn create_bulk(&self, data: &CreateBulkEquipment) -> AppResult<BulkEquipment> {
        data.validate()?;
        reject_deployed_status(data.status)?;
        let equipment_type = self
            .repository
            .equipment_types
            .get_by_id(data.type_id)
            .await?;
        if equipment_type.requires_individual_tracking {
            return Err(AppError::BusinessRule(format!(
                "Type {} is individually tracked; create units instead",
                equipment_type.name
            )));
        }
        self.repository.equipment.create_bulk(data).await
    }

    pub async fn update_bulk(&self, id: i32, data: &UpdateBulkEquipment) -> AppResult<BulkEquipment> {
        data.validate()?;
        reject_deployed_status(data.status)?;
        self.repository.equipment.update_bulk(id, data).await
    }

    pub async fn delete_bulk(&self, id: i32) -> AppResult<()> {
        let row = self.repository.equipment.get_bulk(id).await?;
        if row.job_id.is_some() {
            return Err(AppError::BusinessRule(format!(
                "Bulk equipment {} is deployed; release it before deleting",
                id
            )));
        }
        self.repository.equipment.delete_bulk(id).await
    }

    pub async fn red_tag_bulk(&self, id: i32, data: &RedTagRequest) -> AppResult<()> {
        data.validate()?;
        self.repository
            .equipment
            .red_tag_bulk(id, &data.reason, data.quantity)
            .await
    }

    pub async fn lift_red_tag_bulk(&self, id: i32) -> AppResult<BulkEquipment> {
        self.repository.equipment.lift_red_tag_bulk(id).await
    }

    pub async fn transfer_bulk(&self, id: i32, data: &TransferRequest) -> AppResult<()> {
        data.validate()?;
        self.repository.locations.get_by_id(data.to_location_id).await?;
        self.repository
            .equipment
            .transfer_bulk(id, data.to_location_id, data.quantity)
            .await
    }

    /// Merge duplicate bulk rows. Also runs as part of every inventory
    /// resync; this entry point exists for manual cleanup.
    pub async fn consolidate(&self) -> AppResult<u64> {
        self.repository.equipment.consolidate_bulk().await
    }
}

fn id_pattern(prefix: &str) -> AppResult<Regex> {
    Regex::new(&format!(r"^{}(\d+)$", regex::escape(prefix)))
        .map_err(|e| AppError::Internal(format!("bad id pattern for prefix {}: {}", prefix, e)))
}

/// Catalog edits may not hand-set the deployed status; job assignment flows
/// through allocation so status and job id stay paired.
fn reject_deployed_status(status: Option<i16>) -> AppResult<()> {
    if status.map(EquipmentStatus::from) == Some(EquipmentStatus::Deployed) {
        return Err(AppError::BusinessRule(
            "Deployed status is assigned through allocation, not catalog edits".to_string(),
        ));
    }
    Ok(())
}

/// Next id for a prefix given the ids already issued: one past the highest
/// serial, zero-padded to at least four digits (wider if existing ids are).
fn next_id_from(prefix: &str, existing: &[String]) -> AppResult<String> {
    let pattern = id_pattern(prefix)?;
    let mut max_serial: u64 = 0;
    let mut width = 4;
    for id in existing {
        if let Some(serial) = pattern.captures(id).and_then(|caps| caps.get(1)) {
            if let Ok(n) = serial.as_str().parse::<u64>() {
                max_serial = max_serial.max(n);
                width = width.max(serial.as_str().len());
            }
        }
    }
    Ok(format!(
        "{}{:0width$}",
        prefix,
        max_serial + 1,
        width = width
    ))
}
