//! API handlers for Wellstock REST endpoints

pub mod allocation;
pub mod equipment;
pub mod equipment_types;
pub mod events;
pub mod health;
pub mod jobs;
pub mod locations;
pub mod openapi;
