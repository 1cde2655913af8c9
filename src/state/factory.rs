use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::state::{InMemoryModelStore, ModelStore, SledModelStore};
use std::sync::Arc;

/// Create a model store based on configuration
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn ModelStore>> {
    match config.backend {
        StorageBackend::Sled => {
            let path = &config.model_storage_location;
            std::fs::create_dir_all(path)?;

            tracing::info!(path = ?path, "Initializing Sled model store");

            let store = SledModelStore::new(path)?;
            Ok(Arc::new(store))
        }

        StorageBackend::Memory => Ok(create_in_memory_store()),
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn ModelStore> {
    tracing::info!("Initializing in-memory model store");
    Arc::new(InMemoryModelStore::new())
}
