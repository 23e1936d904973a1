//! Jobs repository for database operations

use chrono::Utc;
use sqlx::{types::Json, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::job::{CreateJob, EquipmentManifest, Job, UpdateJob},
};

#[derive(Clone)]
pub struct JobsRepository {
    pool: Pool<Postgres>,
}

impl JobsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all jobs
    pub async fn list(&self) -> AppResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get job by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
    }

    /// Create job
    pub async fn create(&self, data: &CreateJob) -> AppResult<Job> {
        let manifest = data.equipment_manifest.clone().unwrap_or_default();
        let row = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (name, client, wellsite, equipment_manifest)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.client)
        .bind(&data.wellsite)
        .bind(Json(manifest))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update job (partial)
    pub async fn update(&self, id: i32, data: &UpdateJob) -> AppResult<Job> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.client, "client");
        add_field!(data.wellsite, "wellsite");
        add_field!(data.equipment_manifest, "equipment_manifest");

        let query = format!("UPDATE jobs SET {} WHERE id = {} RETURNING *", sets.join(", "), id);

        let mut builder = sqlx::query_as::<_, Job>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.client);
        bind_field!(data.wellsite);
        if let Some(ref manifest) = data.equipment_manifest {
            builder = builder.bind(Json(manifest.clone()));
        }

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
    }

    /// Replace a job's manifest
    pub async fn set_manifest(&self, id: i32, manifest: &EquipmentManifest) -> AppResult<Job> {
        sqlx::query_as::<_, Job>(
            "UPDATE jobs SET equipment_manifest = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(Json(manifest.clone()))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
    }

    /// Delete job. Callers release the job's equipment first (see JobsService).
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", id)));
        }
        Ok(())
    }
}
