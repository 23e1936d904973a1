//! Jobs service: CRUD plus manifest-driven equipment synchronization.

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        allocation::{BatchOutcome, EquipmentAllocation},
        job::{CreateJob, Job, UpdateJob},
    },
    repository::Repository,
};

use super::allocation::AllocationService;

#[derive(Clone)]
pub struct JobsService {
    repository: Repository,
    allocation: Arc<AllocationService>,
}

impl JobsService {
    pub fn new(repository: Repository, allocation: Arc<AllocationService>) -> Self {
        Self {
            repository,
            allocation,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Job>> {
        self.repository.jobs.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Job> {
        self.repository.jobs.get_by_id(id).await
    }

    /// Create a job. A non-empty manifest triggers an immediate equipment
    /// sync; the job is created either way and a failed sync can be re-run
    /// through `sync_equipment`.
    pub async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        data.validate()?;
        let job = self.repository.jobs.create(data).await?;
        if !job.equipment_manifest.is_empty() {
            if let Err(e) = self.allocation.sync_job_equipment(&job).await {
                tracing::warn!("equipment sync for new job {} failed: {}", job.id, e);
            }
        }
        Ok(job)
    }

    /// Update a job. Supplying a manifest (even an unchanged one) re-syncs
    /// the job's equipment.
    pub async fn update(&self, id: i32, data: &UpdateJob) -> AppResult<Job> {
        data.validate()?;
        let job = self.repository.jobs.update(id, data).await?;
        if data.equipment_manifest.is_some() {
            if let Err(e) = self.allocation.sync_job_equipment(&job).await {
                tracing::warn!("equipment sync for job {} failed: {}", job.id, e);
            }
        }
        Ok(job)
    }

    /// Re-run the manifest sync on demand.
    pub async fn sync_equipment(&self, id: i32) -> AppResult<BatchOutcome> {
        let job = self.repository.jobs.get_by_id(id).await?;
        self.allocation.sync_job_equipment(&job).await
    }

    /// Equipment currently held by the job, from the allocation ledger.
    pub async fn allocations(&self, id: i32) -> AppResult<Vec<EquipmentAllocation>> {
        self.repository.jobs.get_by_id(id).await?;
        Ok(self.allocation.allocations_for_job(id))
    }

    /// Delete a job. Everything the job holds is released first so no
    /// equipment is left pointing at a missing job.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.jobs.get_by_id(id).await?;
        self.allocation.release_job_equipment(id).await?;
        self.repository.jobs.delete(id).await
    }
}
