use crate::error::Result;
use crate::ml::ModelArtifact;
use crate::state::ModelStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory artifact store (for tests and single-process deployments)
#[derive(Clone, Default)]
pub struct InMemoryModelStore {
    artifacts: Arc<DashMap<String, Arc<ModelArtifact>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes holding an artifact
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn load(&self, scope_id: &str) -> Result<Option<ModelArtifact>> {
        Ok(self
            .artifacts
            .get(scope_id)
            .map(|entry| entry.value().as_ref().clone()))
    }

    async fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        self.artifacts
            .insert(artifact.scope_id.clone(), Arc::new(artifact.clone()));
        tracing::debug!(
            scope_id = %artifact.scope_id,
            version = %artifact.version,
            "Artifact saved to memory"
        );
        Ok(())
    }

    async fn latest_version(&self, scope_id: &str) -> Result<Option<String>> {
        Ok(self
            .artifacts
            .get(scope_id)
            .map(|entry| entry.value().version.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MlConfig;
    use crate::ml::classifier::FittedModel;
    use crate::ml::layout::LayoutInfo;
    use crate::ml::{ModelFamily, ModelMetrics};

    fn artifact(scope: &str) -> ModelArtifact {
        ModelArtifact {
            scope_id: scope.to_string(),
            version: uuid::Uuid::now_v7().to_string(),
            family: ModelFamily::Tabular,
            trained_at: chrono::Utc::now(),
            layout: LayoutInfo::current(),
            model: FittedModel::for_family(ModelFamily::Tabular, &MlConfig::default()),
            metrics: ModelMetrics::default(),
            samples_used: 0,
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryModelStore::new();
        assert!(store.load("global").await.unwrap().is_none());

        let saved = artifact("global");
        store.save(&saved).await.unwrap();

        let loaded = store.load("global").await.unwrap().unwrap();
        assert_eq!(loaded.version, saved.version);
        assert_eq!(
            store.latest_version("global").await.unwrap(),
            Some(saved.version)
        );
        assert!(store.load("site-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let store = InMemoryModelStore::new();
        store.save(&artifact("site-1")).await.unwrap();
        let newer = artifact("site-1");
        store.save(&newer).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.latest_version("site-1").await.unwrap(),
            Some(newer.version)
        );
    }
}
