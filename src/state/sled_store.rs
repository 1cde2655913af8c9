use crate::error::{AppError, Result};
use crate::ml::ModelArtifact;
use crate::state::ModelStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sled::{Db, Transactional};
use std::path::Path;
use std::sync::Arc;

/// Small record kept next to each artifact so version checks skip
/// deserializing the model itself
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionEntry {
    version: String,
    trained_at: chrono::DateTime<chrono::Utc>,
}

/// Persistent artifact store using Sled embedded database
#[derive(Clone)]
pub struct SledModelStore {
    db: Arc<Db>,
    artifacts_tree: sled::Tree,
    versions_tree: sled::Tree,
}

impl SledModelStore {
    /// Open (or create) a store at the specified directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            AppError::Storage(format!("Failed to open Sled database: {}", e))
        })?;

        let artifacts_tree = db.open_tree("artifacts").map_err(|e| {
            AppError::Storage(format!("Failed to open artifacts tree: {}", e))
        })?;

        let versions_tree = db.open_tree("versions").map_err(|e| {
            AppError::Storage(format!("Failed to open versions tree: {}", e))
        })?;

        tracing::info!("Initialized Sled model store at {:?}", path.as_ref());

        Ok(Self {
            db: Arc::new(db),
            artifacts_tree,
            versions_tree,
        })
    }

    fn serialize_artifact(artifact: &ModelArtifact) -> Result<Vec<u8>> {
        bincode::serialize(artifact).map_err(|e| {
            AppError::Serialization(format!("Failed to serialize artifact: {}", e))
        })
    }

    fn deserialize_artifact(bytes: &[u8]) -> Result<ModelArtifact> {
        bincode::deserialize(bytes).map_err(|e| {
            AppError::Serialization(format!("Failed to deserialize artifact: {}", e))
        })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await.map_err(|e| {
            AppError::Storage(format!("Failed to flush database: {}", e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl ModelStore for SledModelStore {
    async fn load(&self, scope_id: &str) -> Result<Option<ModelArtifact>> {
        match self.artifacts_tree.get(scope_id.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize_artifact(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to load artifact for {}: {}",
                scope_id, e
            ))),
        }
    }

    async fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        let key = artifact.scope_id.as_bytes();
        let value = Self::serialize_artifact(artifact)?;
        let entry = bincode::serialize(&VersionEntry {
            version: artifact.version.clone(),
            trained_at: artifact.trained_at,
        })?;

        // Both trees change together or not at all
        (&self.artifacts_tree, &self.versions_tree)
            .transaction(|(artifacts, versions)| {
                artifacts.insert(key, value.as_slice())?;
                versions.insert(key, entry.as_slice())?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<()>| {
                AppError::Storage(format!("Failed to save artifact: {:?}", e))
            })?;

        self.flush().await?;

        tracing::debug!(
            scope_id = %artifact.scope_id,
            version = %artifact.version,
            "Artifact saved to Sled"
        );
        Ok(())
    }

    async fn latest_version(&self, scope_id: &str) -> Result<Option<String>> {
        match self.versions_tree.get(scope_id.as_bytes()) {
            Ok(Some(bytes)) => {
                let entry: VersionEntry = bincode::deserialize(&bytes)?;
                Ok(Some(entry.version))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read version for {}: {}",
                scope_id, e
            ))),
        }
    }
}
