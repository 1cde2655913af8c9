pub mod factory;
pub mod sled_store;
pub mod store;

pub use factory::{create_in_memory_store, create_store};
pub use sled_store::SledModelStore;
pub use store::InMemoryModelStore;

use crate::error::Result;
use crate::ml::ModelArtifact;
use async_trait::async_trait;

/// Persistence contract for trained model artifacts.
///
/// A store keeps the latest artifact per scope. Implementations must not
/// expose a partially written artifact: `load` returns either the previous
/// artifact or the new one.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Latest artifact for a scope
    async fn load(&self, scope_id: &str) -> Result<Option<ModelArtifact>>;

    /// Persist an artifact, replacing the scope's previous one
    async fn save(&self, artifact: &ModelArtifact) -> Result<()>;

    /// Version string of the latest artifact for a scope
    async fn latest_version(&self, scope_id: &str) -> Result<Option<String>>;
}
