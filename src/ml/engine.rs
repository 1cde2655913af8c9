use crate::error::{AppError, Result};
use crate::metrics;
use crate::ml::classifier::{Classifier, ModelClassifier};
use crate::ml::features::FeatureVector;
use crate::ml::models::{ModelArtifact, ModelFamily, ModelInput};
use crate::ml::rules::RuleBasedClassifier;
use crate::models::{PredictionMode, PredictionResult};
use crate::GLOBAL_SCOPE;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Chooses between the active model and the rule-based fallback.
///
/// The active artifact sits behind a lock that is only held long enough
/// to clone or replace the `Arc`; inference always runs on a snapshot.
#[derive(Debug)]
pub struct ClassifierEngine {
    family: ModelFamily,
    active: RwLock<Option<Arc<ModelArtifact>>>,
    rules: RuleBasedClassifier,
}

impl ClassifierEngine {
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            active: RwLock::new(None),
            rules: RuleBasedClassifier::new(),
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Current artifact, if any
    pub fn snapshot(&self) -> Option<Arc<ModelArtifact>> {
        self.active.read().clone()
    }

    pub fn active_version(&self) -> Option<String> {
        self.active.read().as_ref().map(|a| a.version.clone())
    }

    pub fn has_model(&self) -> bool {
        self.active.read().is_some()
    }

    /// Install a new artifact. On rejection the previous one stays active.
    pub fn activate(&self, artifact: Arc<ModelArtifact>) -> Result<()> {
        if artifact.family != self.family {
            return Err(AppError::Inference(format!(
                "Artifact {} is a {} model, engine serves {}",
                artifact.version, artifact.family, self.family
            )));
        }
        if artifact.model.family() != artifact.family {
            return Err(AppError::Inference(format!(
                "Artifact {} holds a {} model under a {} header",
                artifact.version,
                artifact.model.family(),
                artifact.family
            )));
        }
        artifact.layout.validate()?;
        if !artifact.model.is_trained() {
            return Err(AppError::Inference(format!(
                "Artifact {} contains an untrained model",
                artifact.version
            )));
        }

        let version = artifact.version.clone();
        let scope = artifact.scope_id.clone();
        let previous = self.active.write().replace(artifact);

        tracing::info!(
            scope_id = %scope,
            version = %version,
            previous = ?previous.as_ref().map(|a| a.version.as_str()),
            "Model artifact activated"
        );
        Ok(())
    }

    /// Drop the active artifact and return to rule-based mode
    pub fn deactivate(&self) -> Option<Arc<ModelArtifact>> {
        self.active.write().take()
    }

    /// Classify one comment. Never fails: any inference problem degrades
    /// to the rule-based path.
    pub fn predict(&self, features: &FeatureVector, content: Option<&str>) -> PredictionResult {
        let timer = metrics::PREDICTION_DURATION.start_timer();
        let result = self.predict_inner(features, content);
        timer.observe_duration();

        metrics::PREDICTIONS_TOTAL
            .with_label_values(&[&result.mode.to_string(), &result.label().to_string()])
            .inc();
        result
    }

    fn predict_inner(&self, features: &FeatureVector, content: Option<&str>) -> PredictionResult {
        let Some(artifact) = self.snapshot() else {
            return self.rules.classify(features);
        };

        if artifact.family.requires_text() && content.is_none() {
            tracing::debug!(
                version = %artifact.version,
                "Text model active but no content supplied, using rules"
            );
            return self.rules.classify(features);
        }

        let version = artifact.version.clone();
        let classifier = ModelClassifier::new(artifact);
        match classifier.predict_one(ModelInput::new(features, content)) {
            Ok((label, proba)) => {
                PredictionResult::new(label.is_spam(), proba[1], PredictionMode::Model)
                    .with_model_version(version)
            }
            Err(e) => {
                metrics::INFERENCE_FALLBACKS_TOTAL.inc();
                tracing::warn!(
                    version = %version,
                    error = %e,
                    "Model inference failed, falling back to rules"
                );
                self.rules.classify(features)
            }
        }
    }
}

/// One engine per scope, all committed to the same model family.
///
/// Sites without a trained model of their own are served by the global
/// engine.
#[derive(Debug)]
pub struct EngineRegistry {
    family: ModelFamily,
    engines: DashMap<String, Arc<ClassifierEngine>>,
}

impl EngineRegistry {
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            engines: DashMap::new(),
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Engine owned by a scope, created empty on first use
    pub fn engine_for(&self, scope_id: &str) -> Arc<ClassifierEngine> {
        if let Some(engine) = self.engines.get(scope_id) {
            return Arc::clone(engine.value());
        }
        let entry = self
            .engines
            .entry(scope_id.to_string())
            .or_insert_with(|| Arc::new(ClassifierEngine::new(self.family)));
        Arc::clone(entry.value())
    }

    /// Engine that should classify a comment from `scope_id`
    pub fn resolve(&self, scope_id: &str) -> Arc<ClassifierEngine> {
        // Release the shard guard before touching the map again
        let own = self.engines.get(scope_id).map(|e| Arc::clone(e.value()));
        match own {
            Some(engine) if engine.has_model() => engine,
            _ => self.engine_for(GLOBAL_SCOPE),
        }
    }

    /// Scopes with an active model, sorted
    pub fn trained_scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self
            .engines
            .iter()
            .filter(|e| e.value().has_model())
            .map(|e| e.key().clone())
            .collect();
        scopes.sort();
        scopes
    }
}
