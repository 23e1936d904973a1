//! Business logic services

pub mod allocation;
pub mod catalog;
pub mod jobs;
pub mod realtime;

use std::sync::Arc;
use std::time::Duration;

use crate::{config::AllocationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub jobs: jobs::JobsService,
    pub allocation: Arc<allocation::AllocationService>,
    pub realtime: Arc<realtime::RealtimeService>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, allocation_config: &AllocationConfig) -> Self {
        let store = Arc::new(allocation::PgCatalogStore::new(repository.clone()));
        let allocation = Arc::new(allocation::AllocationService::new(
            store,
            Arc::new(allocation::LogNotifier),
            Duration::from_millis(allocation_config.resync_debounce_ms),
        ));
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            jobs: jobs::JobsService::new(repository, Arc::clone(&allocation)),
            realtime: Arc::new(realtime::RealtimeService::new(
                allocation_config.change_buffer,
            )),
            allocation,
        }
    }
}
