use crate::config::MlConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::ml::classifier::{Classifier, FittedModel};
use crate::ml::engine::EngineRegistry;
use crate::ml::layout::LayoutInfo;
use crate::ml::models::{
    stratified_split, ClassWeights, ModelArtifact, ModelMetrics, TrainingResult, TrainingSample,
};
use crate::models::Label;
use crate::state::ModelStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Fit and evaluate a new artifact. Pure CPU work, no I/O.
pub fn fit_artifact(
    config: &MlConfig,
    scope_id: &str,
    samples: &[TrainingSample],
) -> Result<ModelArtifact> {
    check_samples(config, samples)?;

    let (train, test) = stratified_split(samples, config.test_ratio, config.seed);
    let weights = ClassWeights::balanced(&train);

    let mut model = FittedModel::for_family(config.model_family, config);
    model.train(&train, weights)?;

    // Tiny sets can leave the held-out split empty
    let eval = if test.is_empty() { &train } else { &test };
    let metrics = evaluate(&model, eval)?;

    Ok(ModelArtifact {
        scope_id: scope_id.to_string(),
        version: Uuid::now_v7().to_string(),
        family: config.model_family,
        trained_at: Utc::now(),
        layout: LayoutInfo::current(),
        model,
        metrics,
        samples_used: samples.len(),
    })
}

fn check_samples(config: &MlConfig, samples: &[TrainingSample]) -> Result<()> {
    if samples.len() < config.min_samples_for_retrain {
        return Err(AppError::InsufficientData {
            available: samples.len(),
            required: config.min_samples_for_retrain,
        });
    }
    let spam = samples.iter().filter(|s| s.label == Label::Spam).count();
    if spam == 0 || spam == samples.len() {
        return Err(AppError::Validation(
            "Training data must contain both spam and ham samples".to_string(),
        ));
    }
    Ok(())
}

/// Spam-class metrics of a fitted model over labelled samples
pub fn evaluate(model: &dyn Classifier, samples: &[TrainingSample]) -> Result<ModelMetrics> {
    let mut truth = Vec::with_capacity(samples.len());
    let mut predicted = Vec::with_capacity(samples.len());
    for sample in samples {
        let (label, _) = model.predict(sample.input())?;
        truth.push(sample.label);
        predicted.push(label);
    }
    Ok(ModelMetrics::calculate(&truth, &predicted))
}

/// Trains, persists and activates artifacts for a scope.
///
/// An artifact is only activated after the store accepted it, so a crash or
/// store failure never leaves the engine serving an unsaved model.
pub struct TrainingPipeline {
    config: MlConfig,
    store: Arc<dyn ModelStore>,
    engines: Arc<EngineRegistry>,
}

impl TrainingPipeline {
    pub fn new(config: MlConfig, store: Arc<dyn ModelStore>, engines: Arc<EngineRegistry>) -> Self {
        Self {
            config,
            store,
            engines,
        }
    }

    pub fn config(&self) -> &MlConfig {
        &self.config
    }

    /// Run one training cycle. Failures are reported in the result, never
    /// as an error.
    pub async fn train(&self, scope_id: &str, samples: &[TrainingSample]) -> TrainingResult {
        let n = samples.len();

        if let Err(e) = check_samples(&self.config, samples) {
            let outcome = match e {
                AppError::InsufficientData { .. } => "insufficient_data",
                _ => "single_class",
            };
            metrics::TRAINING_RUNS_TOTAL
                .with_label_values(&[outcome])
                .inc();
            tracing::info!(scope_id = %scope_id, samples = n, reason = %e, "Training refused");
            return TrainingResult::failure(n, e.to_string());
        }

        tracing::info!(
            scope_id = %scope_id,
            samples = n,
            family = %self.config.model_family,
            "Training started"
        );

        let config = self.config.clone();
        let scope = scope_id.to_string();
        let owned = samples.to_vec();
        let fitted =
            tokio::task::spawn_blocking(move || fit_artifact(&config, &scope, &owned)).await;

        let artifact = match fitted {
            Ok(Ok(artifact)) => artifact,
            Ok(Err(e)) => {
                metrics::TRAINING_RUNS_TOTAL.with_label_values(&["error"]).inc();
                tracing::error!(scope_id = %scope_id, error = %e, "Training failed");
                return TrainingResult::failure(n, format!("Training failed: {}", e));
            }
            Err(e) => {
                metrics::TRAINING_RUNS_TOTAL.with_label_values(&["error"]).inc();
                tracing::error!(scope_id = %scope_id, error = %e, "Training task aborted");
                return TrainingResult::failure(n, format!("Training task aborted: {}", e));
            }
        };

        if let Err(e) = self.store.save(&artifact).await {
            metrics::TRAINING_RUNS_TOTAL
                .with_label_values(&["store_error"])
                .inc();
            tracing::error!(
                scope_id = %scope_id,
                version = %artifact.version,
                error = %e,
                "Failed to persist artifact, keeping previous model"
            );
            return TrainingResult::failure(n, format!("Failed to save model: {}", e));
        }

        let version = artifact.version.clone();
        let artifact_metrics = artifact.metrics.clone();
        let engine = self.engines.engine_for(scope_id);
        if let Err(e) = engine.activate(Arc::new(artifact)) {
            metrics::TRAINING_RUNS_TOTAL.with_label_values(&["error"]).inc();
            tracing::error!(scope_id = %scope_id, version = %version, error = %e, "Activation failed");
            return TrainingResult::failure(n, format!("Model saved but not activated: {}", e));
        }

        metrics::TRAINING_RUNS_TOTAL
            .with_label_values(&["success"])
            .inc();
        tracing::info!(
            scope_id = %scope_id,
            version = %version,
            samples = n,
            accuracy = artifact_metrics.accuracy,
            f1 = artifact_metrics.f1_score,
            "Training finished"
        );

        TrainingResult {
            success: true,
            message: format!(
                "Model trained on {} samples (accuracy {:.1}%)",
                n,
                artifact_metrics.accuracy * 100.0
            ),
            metrics: Some(artifact_metrics),
            samples_used: n,
            version: Some(version),
        }
    }
}
