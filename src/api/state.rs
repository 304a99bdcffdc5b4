//! Application state for shared services

use std::sync::Arc;

use crate::domain::cache::Cache;
use crate::domain::record::RecordRepository;
use crate::infrastructure::services::DataProcessor;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub processor: DataProcessor,
    /// Used by readiness checks only; handlers go through the processor
    pub repository: Arc<dyn RecordRepository>,
    pub cache: Arc<dyn Cache>,
}

impl AppState {
    pub fn new(
        processor: DataProcessor,
        repository: Arc<dyn RecordRepository>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            processor,
            repository,
            cache,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}
