//! Equipment repository: individually-tracked units and bulk rows.
//!
//! Assignment writes always set (status, job_id) as a pair; the
//! `deployed_iff_job` check constraint rejects one without the other.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        allocation::BatchOutcome,
        enums::EquipmentStatus,
        equipment::{
            BulkEquipment, CreateBulkEquipment, CreateIndividualEquipment, EquipmentQuery,
            IndividualEquipment, UpdateBulkEquipment, UpdateIndividualEquipment,
        },
    },
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Individually-tracked equipment
    // =========================================================================

    /// List individual equipment with optional filters
    pub async fn list_individual(&self, query: &EquipmentQuery) -> AppResult<Vec<IndividualEquipment>> {
        let mut conditions = vec!["1=1".to_string()];

        if let Some(type_id) = query.type_id {
            conditions.push(format!("type_id = {}", type_id));
        }
        if let Some(location_id) = query.location_id {
            conditions.push(format!("location_id = {}", location_id));
        }
        if let Some(status) = query.status {
            conditions.push(format!("status = {}", status));
        }
        if let Some(job_id) = query.job_id {
            conditions.push(format!("job_id = {}", job_id));
        }

        let sql = format!(
            "SELECT * FROM individual_equipment WHERE {} ORDER BY equipment_id",
            conditions.join(" AND ")
        );

        let rows = sqlx::query_as::<_, IndividualEquipment>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get an individual unit by its human-assigned equipment id
    pub async fn get_individual(&self, equipment_id: &str) -> AppResult<IndividualEquipment> {
        sqlx::query_as::<_, IndividualEquipment>(
            "SELECT * FROM individual_equipment WHERE equipment_id = $1",
        )
        .bind(equipment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))
    }

    /// Create an individual unit
    pub async fn create_individual(
        &self,
        data: &CreateIndividualEquipment,
    ) -> AppResult<IndividualEquipment> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM individual_equipment WHERE equipment_id = $1)",
        )
        .bind(&data.equipment_id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            return Err(AppError::Conflict(format!(
                "Equipment id '{}' already exists",
                data.equipment_id
            )));
        }

        let row = sqlx::query_as::<_, IndividualEquipment>(
            r#"
            INSERT INTO individual_equipment (equipment_id, serial_number, type_id, location_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.equipment_id)
        .bind(&data.serial_number)
        .bind(data.type_id)
        .bind(data.location_id)
        .bind(data.status.unwrap_or(EquipmentStatus::Available as i16))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update an individual unit (partial)
    pub async fn update_individual(
        &self,
        equipment_id: &str,
        data: &UpdateIndividualEquipment,
    ) -> AppResult<IndividualEquipment> {
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

        add_field!(data.serial_number, "serial_number");
        add_field!(data.location_id, "location_id");
        add_field!(data.status, "status");

        let query = format!(
            "UPDATE individual_equipment SET {} WHERE equipment_id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, IndividualEquipment>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.serial_number);
        bind_field!(data.location_id);
        bind_field!(data.status);
        builder = builder.bind(equipment_id);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))
    }

    /// Delete an individual unit. Deployed units must be released first.
    pub async fn delete_individual(&self, equipment_id: &str) -> AppResult<()> {
        let unit = self.get_individual(equipment_id).await?;
        if EquipmentStatus::from(unit.status) == EquipmentStatus::Deployed {
            return Err(AppError::Conflict(format!(
                "Equipment {} is deployed; release it before deleting",
                equipment_id
            )));
        }

        sqlx::query("DELETE FROM individual_equipment WHERE equipment_id = $1")
            .bind(equipment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write the (status, job) assignment pair for an individual unit
    pub async fn set_individual_assignment(
        &self,
        equipment_id: &str,
        status: EquipmentStatus,
        job_id: Option<i32>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE individual_equipment SET status = $1, job_id = $2, updated_at = $3 WHERE equipment_id = $4",
        )
        .bind(status as i16)
        .bind(job_id)
        .bind(Utc::now())
        .bind(equipment_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", equipment_id)));
        }
        Ok(())
    }

    /// Red-tag an individual unit: terminal status, off its job, with reason
    pub async fn red_tag_individual(
        &self,
        equipment_id: &str,
        reason: &str,
    ) -> AppResult<IndividualEquipment> {
        sqlx::query_as::<_, IndividualEquipment>(
            r#"
            UPDATE individual_equipment
            SET status = $1, job_id = NULL, red_tag_reason = $2, red_tagged_at = $3, updated_at = $3
            WHERE equipment_id = $4
            RETURNING *
            "#,
        )
        .bind(EquipmentStatus::RedTagged as i16)
        .bind(reason)
        .bind(Utc::now())
        .bind(equipment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))
    }

    /// Lift a red tag, returning the unit to the available pool
    pub async fn lift_red_tag_individual(&self, equipment_id: &str) -> AppResult<IndividualEquipment> {
        let unit = self.get_individual(equipment_id).await?;
        if EquipmentStatus::from(unit.status) != EquipmentStatus::RedTagged {
            return Err(AppError::BusinessRule(format!(
                "Equipment {} is not red-tagged",
                equipment_id
            )));
        }

        sqlx::query_as::<_, IndividualEquipment>(
            r#"
            UPDATE individual_equipment
            SET status = $1, red_tag_reason = NULL, red_tagged_at = NULL, updated_at = $2
            WHERE equipment_id = $3
            RETURNING *
            "#,
        )
        .bind(EquipmentStatus::Available as i16)
        .bind(Utc::now())
        .bind(equipment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))
    }

    /// Move an individual unit to another location. Deployed units move only
    /// through release.
    pub async fn transfer_individual(
        &self,
        equipment_id: &str,
        to_location_id: i32,
    ) -> AppResult<IndividualEquipment> {
        let unit = self.get_individual(equipment_id).await?;
        if EquipmentStatus::from(unit.status) == EquipmentStatus::Deployed {
            return Err(AppError::BusinessRule(format!(
                "Equipment {} is deployed; release it before transfer",
                equipment_id
            )));
        }

        sqlx::query_as::<_, IndividualEquipment>(
            "UPDATE individual_equipment SET location_id = $1, updated_at = $2 WHERE equipment_id = $3 RETURNING *",
        )
        .bind(to_location_id)
        .bind(Utc::now())
        .bind(equipment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))
    }

    // =========================================================================
    // Bulk equipment
    // =========================================================================

    /// List bulk equipment with optional filters
    pub async fn list_bulk(&self, query: &EquipmentQuery) -> AppResult<Vec<BulkEquipment>> {
        let mut conditions = vec!["1=1".to_string()];

        if let Some(type_id) = query.type_id {
            conditions.push(format!("type_id = {}", type_id));
        }
        if let Some(location_id) = query.location_id {
            conditions.push(format!("location_id = {}", location_id));
        }
        if let Some(status) = query.status {
            conditions.push(format!("status = {}", status));
        }
        if let Some(job_id) = query.job_id {
            conditions.push(format!("job_id = {}", job_id));
        }

        let sql = format!(
            "SELECT * FROM bulk_equipment WHERE {} ORDER BY id",
            conditions.join(" AND ")
        );

        let rows = sqlx::query_as::<_, BulkEquipment>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get a bulk row by ID
    pub async fn get_bulk(&self, id: i32) -> AppResult<BulkEquipment> {
        sqlx::query_as::<_, BulkEquipment>("SELECT * FROM bulk_equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Bulk equipment {} not found", id)))
    }

    /// Create a bulk row
    pub async fn create_bulk(&self, data: &CreateBulkEquipment) -> AppResult<BulkEquipment> {
        let row = sqlx::query_as::<_, BulkEquipment>(
            r#"
            INSERT INTO bulk_equipment (type_id, location_id, quantity, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.type_id)
        .bind(data.location_id)
        .bind(data.quantity)
        .bind(data.status.unwrap_or(EquipmentStatus::Available as i16))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update a bulk row (partial)
    pub async fn update_bulk(&self, id: i32, data: &UpdateBulkEquipment) -> AppResult<BulkEquipment> {
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

        add_field!(data.type_id, "type_id");
        add_field!(data.location_id, "location_id");
        add_field!(data.quantity, "quantity");
        add_field!(data.status, "status");

        let query = format!(
            "UPDATE bulk_equipment SET {} WHERE id = {} RETURNING *",
            sets.join(", "),
            id
        );

        let mut builder = sqlx::query_as::<_, BulkEquipment>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.type_id);
        bind_field!(data.location_id);
        bind_field!(data.quantity);
        bind_field!(data.status);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Bulk equipment {} not found", id)))
    }

    /// Delete a bulk row. Deployed rows must be released first.
    pub async fn delete_bulk(&self, id: i32) -> AppResult<()> {
        let row = self.get_bulk(id).await?;
        if EquipmentStatus::from(row.status) == EquipmentStatus::Deployed {
            return Err(AppError::Conflict(format!(
                "Bulk equipment {} is deployed; release it before deleting",
                id
            )));
        }

        sqlx::query("DELETE FROM bulk_equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write the (status, job) assignment for a bulk row. A quantity smaller
    /// than the row splits it: the remainder keeps its coordinates, the moved
    /// units land in a fresh row. Consolidation merges the residue later.
    /// Returns the id of the row now carrying the assignment.
    pub async fn set_bulk_assignment(
        &self,
        id: i32,
        status: EquipmentStatus,
        job_id: Option<i32>,
        quantity: Option<i32>,
    ) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BulkEquipment>(
            "SELECT * FROM bulk_equipment WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bulk equipment {} not found", id)))?;

        let moved = quantity.unwrap_or(row.quantity);
        if moved > row.quantity {
            return Err(AppError::InsufficientQuantity {
                requested: moved,
                available: row.quantity,
            });
        }

        let now = Utc::now();
        let assigned_id = if moved == row.quantity {
            sqlx::query(
                "UPDATE bulk_equipment SET status = $1, job_id = $2, updated_at = $3 WHERE id = $4",
            )
            .bind(status as i16)
            .bind(job_id)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            id
        } else {
            sqlx::query("UPDATE bulk_equipment SET quantity = quantity - $1, updated_at = $2 WHERE id = $3")
                .bind(moved)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO bulk_equipment (type_id, location_id, quantity, status, job_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(row.type_id)
            .bind(row.location_id)
            .bind(moved)
            .bind(status as i16)
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;
        Ok(assigned_id)
    }

    /// Red-tag units from a bulk row, splitting on partial quantity
    pub async fn red_tag_bulk(
        &self,
        id: i32,
        reason: &str,
        quantity: Option<i32>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BulkEquipment>(
            "SELECT * FROM bulk_equipment WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bulk equipment {} not found", id)))?;

        let tagged = quantity.unwrap_or(row.quantity);
        if tagged > row.quantity {
            return Err(AppError::InsufficientQuantity {
                requested: tagged,
                available: row.quantity,
            });
        }

        let now = Utc::now();
        if tagged == row.quantity {
            sqlx::query(
                r#"
                UPDATE bulk_equipment
                SET status = $1, job_id = NULL, red_tag_reason = $2, red_tagged_at = $3, updated_at = $3
                WHERE id = $4
                "#,
            )
            .bind(EquipmentStatus::RedTagged as i16)
            .bind(reason)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("UPDATE bulk_equipment SET quantity = quantity - $1, updated_at = $2 WHERE id = $3")
                .bind(tagged)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO bulk_equipment (type_id, location_id, quantity, status, red_tag_reason, red_tagged_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(row.type_id)
            .bind(row.location_id)
            .bind(tagged)
            .bind(EquipmentStatus::RedTagged as i16)
            .bind(reason)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Lift the red tag on a bulk row, returning it to the available pool
    pub async fn lift_red_tag_bulk(&self, id: i32) -> AppResult<BulkEquipment> {
        let row = self.get_bulk(id).await?;
        if EquipmentStatus::from(row.status) != EquipmentStatus::RedTagged {
            return Err(AppError::BusinessRule(format!(
                "Bulk equipment {} is not red-tagged",
                id
            )));
        }

        sqlx::query_as::<_, BulkEquipment>(
            r#"
            UPDATE bulk_equipment
            SET status = $1, red_tag_reason = NULL, red_tagged_at = NULL, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(EquipmentStatus::Available as i16)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bulk equipment {} not found", id)))
    }

    /// Move bulk units to another location, splitting on partial quantity.
    /// Deployed rows move only through release.
    pub async fn transfer_bulk(
        &self,
        id: i32,
        to_location_id: i32,
        quantity: Option<i32>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BulkEquipment>(
            "SELECT * FROM bulk_equipment WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bulk equipment {} not found", id)))?;

        if EquipmentStatus::from(row.status) == EquipmentStatus::Deployed {
            return Err(AppError::BusinessRule(format!(
                "Bulk equipment {} is deployed; release it before transfer",
                id
            )));
        }

        let moved = quantity.unwrap_or(row.quantity);
        if moved > row.quantity {
            return Err(AppError::InsufficientQuantity {
                requested: moved,
                available: row.quantity,
            });
        }

        let now = Utc::now();
        if moved == row.quantity {
            sqlx::query("UPDATE bulk_equipment SET location_id = $1, updated_at = $2 WHERE id = $3")
                .bind(to_location_id)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query("UPDATE bulk_equipment SET quantity = quantity - $1, updated_at = $2 WHERE id = $3")
                .bind(moved)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO bulk_equipment (type_id, location_id, quantity, status, red_tag_reason, red_tagged_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(row.type_id)
            .bind(to_location_id)
            .bind(moved)
            .bind(row.status)
            .bind(&row.red_tag_reason)
            .bind(row.red_tagged_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Batch + maintenance
    // =========================================================================

    /// Batched deploy for a job: listed ids become deployed-under-job, units
    /// previously deployed under the same job but absent from the list are
    /// released. Units held by other jobs or in a terminal status are left
    /// alone and counted as failures.
    pub async fn batch_update_status(
        &self,
        job_id: i32,
        equipment_ids: &[String],
    ) -> AppResult<BatchOutcome> {
        let started = std::time::Instant::now();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let released = sqlx::query(
            r#"
            UPDATE individual_equipment
            SET status = $1, job_id = NULL, updated_at = $2
            WHERE job_id = $3 AND NOT (equipment_id = ANY($4))
            "#,
        )
        .bind(EquipmentStatus::Available as i16)
        .bind(now)
        .bind(job_id)
        .bind(equipment_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deployed = sqlx::query(
            r#"
            UPDATE individual_equipment
            SET status = $1, job_id = $2, updated_at = $3
            WHERE equipment_id = ANY($4)
              AND (status = $5 OR (status = $1 AND job_id = $2))
            "#,
        )
        .bind(EquipmentStatus::Deployed as i16)
        .bind(job_id)
        .bind(now)
        .bind(equipment_ids)
        .bind(EquipmentStatus::Available as i16)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        let outcome = BatchOutcome {
            success_count: deployed as i64,
            failure_count: equipment_ids.len() as i64 - deployed as i64,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::debug!(
            job_id,
            released,
            deployed,
            failures = outcome.failure_count,
            "batch status update applied"
        );
        Ok(outcome)
    }

    /// Merge duplicate bulk rows sharing (type, location, status, job) into
    /// the oldest row of each group. Red-tagged rows are skipped: their
    /// reasons differ per row. Returns the number of rows merged away.
    pub async fn consolidate_bulk(&self) -> AppResult<u64> {
        let groups = sqlx::query(
            r#"
            SELECT MIN(id) AS keeper_id, SUM(quantity)::int AS total,
                   type_id, location_id, status, job_id
            FROM bulk_equipment
            WHERE status <> $1
            GROUP BY type_id, location_id, status, job_id
            HAVING COUNT(*) > 1
            "#,
        )
        .bind(EquipmentStatus::RedTagged as i16)
        .fetch_all(&self.pool)
        .await?;

        if groups.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut merged = 0u64;
        let mut tx = self.pool.begin().await?;

        for group in &groups {
            let keeper_id: i32 = group.get("keeper_id");
            let total: i32 = group.get("total");
            let type_id: i32 = group.get("type_id");
            let location_id: i32 = group.get("location_id");
            let status: i16 = group.get("status");
            let job_id: Option<i32> = group.get("job_id");

            sqlx::query("UPDATE bulk_equipment SET quantity = $1, updated_at = $2 WHERE id = $3")
                .bind(total)
                .bind(now)
                .bind(keeper_id)
                .execute(&mut *tx)
                .await?;

            merged += sqlx::query(
                r#"
                DELETE FROM bulk_equipment
                WHERE type_id = $1 AND location_id = $2 AND status = $3
                  AND job_id IS NOT DISTINCT FROM $4 AND id <> $5
                "#,
            )
            .bind(type_id)
            .bind(location_id)
            .bind(status)
            .bind(job_id)
            .bind(keeper_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        if merged > 0 {
            tracing::info!(merged, "consolidated duplicate bulk equipment rows");
        }
        Ok(merged)
    }
}
