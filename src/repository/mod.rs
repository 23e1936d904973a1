//! Repository layer for database operations

pub mod equipment;
pub mod equipment_types;
pub mod jobs;
pub mod locations;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub equipment_types: equipment_types::EquipmentTypesRepository,
    pub locations: locations::LocationsRepository,
    pub equipment: equipment::EquipmentRepository,
    pub jobs: jobs::JobsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            equipment_types: equipment_types::EquipmentTypesRepository::new(pool.clone()),
            locations: locations::LocationsRepository::new(pool.clone()),
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            jobs: jobs::JobsRepository::new(pool.clone()),
            pool,
        }
    }
}
