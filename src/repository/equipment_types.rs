//! Equipment types repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::equipment_type::{CreateEquipmentType, EquipmentType, UpdateEquipmentType},
};

#[derive(Clone)]
pub struct EquipmentTypesRepository {
    pool: Pool<Postgres>,
}

impl EquipmentTypesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all equipment types
    pub async fn list(&self) -> AppResult<Vec<EquipmentType>> {
        let rows = sqlx::query_as::<_, EquipmentType>(
            "SELECT * FROM equipment_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get equipment type by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<EquipmentType> {
        sqlx::query_as::<_, EquipmentType>("SELECT * FROM equipment_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment type {} not found", id)))
    }

    /// Create equipment type
    pub async fn create(&self, data: &CreateEquipmentType) -> AppResult<EquipmentType> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM equipment_types WHERE name = $1)",
        )
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            return Err(AppError::Conflict(format!(
                "Equipment type '{}' already exists",
                data.name
            )));
        }

        let row = sqlx::query_as::<_, EquipmentType>(
            r#"
            INSERT INTO equipment_types (name, category, requires_individual_tracking, id_prefix, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(data.category.unwrap_or(6))
        .bind(data.requires_individual_tracking.unwrap_or(false))
        .bind(&data.id_prefix)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update equipment type (partial)
    pub async fn update(&self, id: i32, data: &UpdateEquipmentType) -> AppResult<EquipmentType> {
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
        add_field!(data.category, "category");
        add_field!(data.requires_individual_tracking, "requires_individual_tracking");
        add_field!(data.id_prefix, "id_prefix");
        add_field!(data.notes, "notes");

        let query = format!(
            "UPDATE equipment_types SET {} WHERE id = {} RETURNING *",
            sets.join(", "),
            id
        );

        let mut builder = sqlx::query_as::<_, EquipmentType>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.category);
        bind_field!(data.requires_individual_tracking);
        bind_field!(data.id_prefix);
        bind_field!(data.notes);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment type {} not found", id)))
    }

    /// Delete equipment type. Blocked while any equipment references it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM individual_equipment WHERE type_id = $1)
                OR EXISTS(SELECT 1 FROM bulk_equipment WHERE type_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if referenced {
            return Err(AppError::Conflict(
                "Equipment type is referenced by existing equipment".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM equipment_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment type {} not found", id)));
        }
        Ok(())
    }

    /// All equipment ids of individually-tracked units of this type, used for
    /// next-id generation from the prefix convention.
    pub async fn equipment_ids_for_type(&self, type_id: i32) -> AppResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT equipment_id FROM individual_equipment WHERE type_id = $1",
        )
        .bind(type_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
