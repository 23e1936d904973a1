//! Wellstock Equipment Tracking System
//!
//! A Rust REST API server for tracking oilfield surface equipment across
//! storage locations and field jobs, with an in-memory allocation ledger,
//! double-booking conflict resolution, and a realtime change feed.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
