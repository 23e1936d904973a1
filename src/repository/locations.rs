//! Storage locations repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::location::{CreateStorageLocation, StorageLocation, UpdateStorageLocation},
};

#[derive(Clone)]
pub struct LocationsRepository {
    pool: Pool<Postgres>,
}

impl LocationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all locations
    pub async fn list(&self) -> AppResult<Vec<StorageLocation>> {
        let rows = sqlx::query_as::<_, StorageLocation>(
            "SELECT * FROM storage_locations ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get location by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<StorageLocation> {
        sqlx::query_as::<_, StorageLocation>("SELECT * FROM storage_locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location {} not found", id)))
    }

    /// The fallback/return location, if one is marked
    pub async fn find_default(&self) -> AppResult<Option<StorageLocation>> {
        let row = sqlx::query_as::<_, StorageLocation>(
            "SELECT * FROM storage_locations WHERE is_default = TRUE",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create location
    pub async fn create(&self, data: &CreateStorageLocation) -> AppResult<StorageLocation> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM storage_locations WHERE name = $1)",
        )
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            return Err(AppError::Conflict(format!(
                "Location '{}' already exists",
                data.name
            )));
        }

        let mut tx = self.pool.begin().await?;

        // A single default location; claiming the flag releases it elsewhere
        if data.is_default.unwrap_or(false) {
            sqlx::query("UPDATE storage_locations SET is_default = FALSE WHERE is_default = TRUE")
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, StorageLocation>(
            r#"
            INSERT INTO storage_locations (name, address, is_default)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.address)
        .bind(data.is_default.unwrap_or(false))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Update location (partial)
    pub async fn update(&self, id: i32, data: &UpdateStorageLocation) -> AppResult<StorageLocation> {
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
        add_field!(data.address, "address");

        let query = format!(
            "UPDATE storage_locations SET {} WHERE id = {} RETURNING *",
            sets.join(", "),
            id
        );

        let mut builder = sqlx::query_as::<_, StorageLocation>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.address);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location {} not found", id)))
    }

    /// Mark a location as the default return yard, clearing the flag elsewhere
    pub async fn set_default(&self, id: i32) -> AppResult<StorageLocation> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE storage_locations SET is_default = FALSE WHERE is_default = TRUE")
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, StorageLocation>(
            "UPDATE storage_locations SET is_default = TRUE, updated_at = $1 WHERE id = $2 RETURNING *",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Location {} not found", id)))?;

        tx.commit().await?;
        Ok(row)
    }

    /// Delete location. Blocked while equipment is stored there.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let occupied: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM individual_equipment WHERE location_id = $1)
                OR EXISTS(SELECT 1 FROM bulk_equipment WHERE location_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if occupied {
            return Err(AppError::Conflict(
                "Location still holds equipment".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM storage_locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Location {} not found", id)));
        }
        Ok(())
    }
}
