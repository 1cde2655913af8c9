use crate::config::MlConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::ml::engine::EngineRegistry;
use crate::ml::explain::{Explanation, PredictionExplainer};
use crate::ml::features::{Clock, FeatureExtractor, FeatureVector, SystemClock};
use crate::ml::feedback::FeedbackAccumulator;
use crate::ml::models::{TrainingResult, TrainingSample};
use crate::ml::seed::seed_comments;
use crate::ml::training::TrainingPipeline;
use crate::models::{CommentRecord, CommentState, Label, PredictionMode, PredictionResult};
use crate::state::ModelStore;
use crate::GLOBAL_SCOPE;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What the service remembers about each analyzed comment
#[derive(Debug, Clone)]
struct LedgerEntry {
    scope_id: String,
    features: FeatureVector,
    content: String,
    predicted: Label,
    /// Moderator label, or the corpus label for seed entries
    label: Option<Label>,
    state: CommentState,
    /// Bootstrap corpus entry, excluded from statistics and counters
    seeded: bool,
    /// Insertion order, oldest first
    seq: u64,
}

impl LedgerEntry {
    fn training_sample(&self) -> Option<TrainingSample> {
        self.label
            .map(|label| TrainingSample::new(self.features.clone(), self.content.clone(), label))
    }

    fn awaiting_consumption(&self) -> bool {
        !self.seeded && matches!(self.state, CommentState::RetrainQueued | CommentState::Idle)
    }

    /// Unlabelled analyses carry no training value and may be dropped
    fn evictable(&self) -> bool {
        !self.seeded && self.label.is_none()
    }
}

/// Running totals per scope, kept independently of ledger eviction
#[derive(Debug, Default, Clone, Copy)]
struct ScopeCounters {
    analyzed: usize,
    spam: usize,
}

/// Clears a scope's in-flight marker when its retrain finishes or is dropped
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<String, ()>,
    scope_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.scope_id);
    }
}

/// Result of analyzing one comment
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub comment_id: Uuid,
    pub scope_id: String,
    pub prediction: PredictionResult,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    /// The scope reached its retrain threshold with this correction
    pub queued_for_training: bool,
    /// Corrections not yet consumed by a retrain
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelStatus {
    Trained,
    Baseline,
}

/// Per-scope service statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub scope_id: String,
    pub total_analyzed: usize,
    pub total_spam_blocked: usize,
    pub total_ham_approved: usize,
    /// Share of reviewed comments where the moderator agreed; `None`
    /// until any feedback exists
    pub accuracy: Option<f64>,
    pub spam_block_rate: f64,
    pub last_retrain: Option<DateTime<Utc>>,
    pub model_status: ModelStatus,
    pub model_version: Option<String>,
    pub pending_feedback: usize,
    pub retrain_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_status: ModelStatus,
    pub active_version: Option<String>,
    pub trained_scopes: Vec<String>,
    pub version: String,
}

/// Comment classification service: extraction, prediction, explanation,
/// feedback and retraining for every scope.
pub struct SpamService {
    config: MlConfig,
    extractor: FeatureExtractor,
    explainer: PredictionExplainer,
    engines: Arc<EngineRegistry>,
    feedback: FeedbackAccumulator,
    pipeline: TrainingPipeline,
    store: Arc<dyn ModelStore>,

    /// Analyzed comments by id
    ledger: DashMap<Uuid, LedgerEntry>,
    ledger_seq: AtomicU64,
    /// Ledger entries still waiting for a verdict
    unlabelled: AtomicUsize,

    counters: DashMap<String, ScopeCounters>,

    /// Last successful retrain per scope
    last_retrain: DashMap<String, DateTime<Utc>>,

    /// Scopes with a retrain currently running
    in_flight: DashMap<String, ()>,

    seeded: AtomicBool,
}

impl SpamService {
    pub fn new(config: MlConfig, store: Arc<dyn ModelStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build with an injected clock, for reproducible time-of-day features
    pub fn with_clock(config: MlConfig, store: Arc<dyn ModelStore>, clock: Arc<dyn Clock>) -> Self {
        let engines = Arc::new(EngineRegistry::new(config.model_family));
        let pipeline = TrainingPipeline::new(config.clone(), store.clone(), engines.clone());

        Self {
            feedback: FeedbackAccumulator::new(config.retrain_threshold),
            extractor: FeatureExtractor::new(clock),
            explainer: PredictionExplainer::new(),
            engines,
            pipeline,
            store,
            ledger: DashMap::new(),
            ledger_seq: AtomicU64::new(0),
            unlabelled: AtomicUsize::new(0),
            counters: DashMap::new(),
            last_retrain: DashMap::new(),
            in_flight: DashMap::new(),
            seeded: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &MlConfig {
        &self.config
    }

    pub fn engines(&self) -> &Arc<EngineRegistry> {
        &self.engines
    }

    /// Load the global artifact. Missing or unreadable artifacts leave the
    /// service in rule-based mode.
    pub async fn initialize(&self) {
        info!(family = %self.config.model_family, "Initializing spam service");
        match self.reload_if_newer(GLOBAL_SCOPE).await {
            Ok(true) => info!("Global model loaded"),
            Ok(false) => info!("No global model stored, using rule-based classification"),
            Err(e) => {
                error!(error = %e, "Failed to load global model");
                warn!("Spam service will continue in rule-based mode");
            }
        }
    }

    /// Activate the stored artifact for a scope when it differs from the
    /// active one. Returns whether a new artifact was activated.
    pub async fn reload_if_newer(&self, scope_id: &str) -> Result<bool> {
        let engine = self.engines.engine_for(scope_id);
        let stored = match self.store.latest_version(scope_id).await? {
            Some(version) => version,
            None => return Ok(false),
        };

        if let Some(active) = engine.active_version() {
            // v7 versions sort by creation time
            if active >= stored {
                return Ok(false);
            }
        }

        let artifact = self.store.load(scope_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Artifact {} for scope {}", stored, scope_id))
        })?;
        engine.activate(Arc::new(artifact))?;
        Ok(true)
    }

    /// Classify a comment and record it for later feedback
    pub fn analyze(&self, scope_id: &str, comment: &CommentRecord) -> Analysis {
        let features = self.extractor.extract(comment);
        let engine = self.engines.resolve(scope_id);

        let mut prediction = engine.predict(&features, Some(&comment.content));
        let explanation = self.explainer.explain_detailed(&features, &prediction);
        prediction.reasons = explanation.reasons.clone();

        let comment_id = Uuid::new_v4();
        let fingerprint = self.extractor.fingerprint(comment);
        debug!(
            scope_id = %scope_id,
            %comment_id,
            ip = %fingerprint.ip_hash,
            mode = %prediction.mode,
            is_spam = prediction.is_spam,
            confidence = prediction.confidence,
            "Comment analyzed"
        );

        {
            let mut counters = self.counters.entry(scope_id.to_string()).or_default();
            counters.analyzed += 1;
            if prediction.is_spam {
                counters.spam += 1;
            }
        }

        self.ledger.insert(
            comment_id,
            LedgerEntry {
                scope_id: scope_id.to_string(),
                features,
                content: comment.content.clone(),
                predicted: prediction.label(),
                label: None,
                state: CommentState::Analyzed(prediction.label()),
                seeded: false,
                seq: self.ledger_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
        self.unlabelled.fetch_add(1, Ordering::SeqCst);
        self.enforce_ledger_capacity();

        Analysis {
            comment_id,
            scope_id: scope_id.to_string(),
            prediction,
            explanation,
        }
    }

    /// Drop the oldest unlabelled analyses once there are more than the
    /// configured capacity. Evicts an extra tenth of the capacity at a time
    /// so the scan stays rare.
    fn enforce_ledger_capacity(&self) {
        let capacity = self.config.ledger_capacity.max(1);
        let unlabelled = self.unlabelled.load(Ordering::SeqCst);
        if unlabelled <= capacity {
            return;
        }

        let target = (unlabelled - capacity) + capacity / 10;
        let mut candidates: Vec<(u64, Uuid)> = self
            .ledger
            .iter()
            .filter(|e| e.evictable())
            .map(|e| (e.seq, *e.key()))
            .collect();
        candidates.sort_unstable();

        let mut evicted = 0usize;
        for (_, id) in candidates.into_iter().take(target) {
            if self.ledger.remove_if(&id, |_, e| e.evictable()).is_some() {
                evicted += 1;
            }
        }
        self.unlabelled.fetch_sub(evicted, Ordering::SeqCst);
        debug!(evicted, remaining = self.ledger.len(), "Ledger trimmed");
    }

    /// Record a moderator's verdict on a previously analyzed comment.
    ///
    /// Only the first verdict on a comment counts towards the retrain
    /// threshold. Later verdicts replace the label and are logged, and a
    /// comment already consumed by a retrain stays consumed.
    pub fn record_feedback(
        &self,
        comment_id: Uuid,
        scope_id: &str,
        is_spam: bool,
    ) -> Result<FeedbackOutcome> {
        let corrected = Label::from_is_spam(is_spam);

        let queued = {
            let mut entry = self
                .ledger
                .get_mut(&comment_id)
                .filter(|e| e.scope_id == scope_id && !e.seeded)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Comment {} in scope {}", comment_id, scope_id))
                })?;
            let predicted = entry.predicted;
            let state = entry.state;
            entry.label = Some(corrected);

            match state {
                CommentState::Analyzed(_) => {
                    self.unlabelled.fetch_sub(1, Ordering::SeqCst);
                    entry.state = CommentState::FeedbackReceived(corrected);
                    let queued = self
                        .feedback
                        .record(comment_id, predicted, corrected, scope_id);
                    entry.state = entry.state.after_feedback(queued);
                    queued
                }
                _ => {
                    self.feedback
                        .record_revision(comment_id, predicted, corrected, scope_id);
                    self.feedback.should_retrain(scope_id)
                }
            }
        };

        metrics::FEEDBACK_TOTAL
            .with_label_values(&[metrics::scope_kind(scope_id)])
            .inc();
        if queued {
            info!(scope_id = %scope_id, "Retrain threshold reached");
        }

        Ok(FeedbackOutcome {
            queued_for_training: queued,
            pending: self.feedback.pending(scope_id),
        })
    }

    /// Labelled samples for a scope, moderator feedback and imported
    /// comments alike
    pub fn training_samples(&self, scope_id: &str) -> Vec<TrainingSample> {
        self.ledger
            .iter()
            .filter(|e| e.scope_id == scope_id)
            .filter_map(|e| e.training_sample())
            .collect()
    }

    /// Train a new model for a scope from its labelled comments
    pub async fn retrain(&self, scope_id: &str) -> TrainingResult {
        if self.in_flight.insert(scope_id.to_string(), ()).is_some() {
            return TrainingResult::failure(0, format!("Retrain already running for {}", scope_id));
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            scope_id: scope_id.to_string(),
        };

        // Snapshot which entries this run will consume
        let consumed_ids: Vec<Uuid> = self
            .ledger
            .iter()
            .filter(|e| e.scope_id == scope_id && e.awaiting_consumption())
            .map(|e| *e.key())
            .collect();
        let samples = self.training_samples(scope_id);

        let result = self.pipeline.train(scope_id, &samples).await;

        if result.success {
            for id in &consumed_ids {
                if let Some(mut entry) = self.ledger.get_mut(id) {
                    entry.state = CommentState::Consumed;
                }
            }
            self.feedback.mark_consumed(scope_id, consumed_ids.len());
            self.last_retrain.insert(scope_id.to_string(), Utc::now());
        }

        result
    }

    /// Scopes whose feedback counters reached the threshold
    pub fn due_scopes(&self) -> Vec<String> {
        self.feedback.due_scopes()
    }

    pub fn stats(&self, scope_id: &str) -> ServiceStats {
        let counters = self
            .counters
            .get(scope_id)
            .map(|c| *c)
            .unwrap_or_default();
        let analyzed = counters.analyzed;
        let spam = counters.spam;

        // Labelled entries are never evicted, so the ledger holds every verdict
        let mut reviewed = 0usize;
        let mut agreed = 0usize;
        for entry in self
            .ledger
            .iter()
            .filter(|e| e.scope_id == scope_id && !e.seeded)
        {
            if let Some(label) = entry.label {
                reviewed += 1;
                if label == entry.predicted {
                    agreed += 1;
                }
            }
        }

        let engine = self.engines.resolve(scope_id);
        ServiceStats {
            scope_id: scope_id.to_string(),
            total_analyzed: analyzed,
            total_spam_blocked: spam,
            total_ham_approved: analyzed - spam,
            accuracy: (reviewed > 0).then(|| agreed as f64 / reviewed as f64),
            spam_block_rate: if analyzed > 0 {
                spam as f64 / analyzed as f64
            } else {
                0.0
            },
            last_retrain: self.last_retrain.get(scope_id).map(|t| *t),
            model_status: if engine.has_model() {
                ModelStatus::Trained
            } else {
                ModelStatus::Baseline
            },
            model_version: engine.active_version(),
            pending_feedback: self.feedback.pending(scope_id),
            retrain_threshold: self.feedback.retrain_threshold(),
        }
    }

    pub fn health(&self) -> HealthStatus {
        let global = self.engines.engine_for(GLOBAL_SCOPE);
        HealthStatus {
            status: "healthy".to_string(),
            model_status: if global.has_model() {
                ModelStatus::Trained
            } else {
                ModelStatus::Baseline
            },
            active_version: global.active_version(),
            trained_scopes: self.engines.trained_scopes(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Add already-labelled comments to a scope's training data. They do
    /// not count towards the retrain threshold.
    pub fn import_labelled(&self, scope_id: &str, comments: &[(CommentRecord, Label)]) -> usize {
        let records: Vec<CommentRecord> = comments.iter().map(|(c, _)| c.clone()).collect();
        let features = self.extractor.extract_batch(&records);

        for ((comment, label), features) in comments.iter().zip(features) {
            self.ledger.insert(
                Uuid::new_v4(),
                LedgerEntry {
                    scope_id: scope_id.to_string(),
                    features,
                    content: comment.content.clone(),
                    predicted: *label,
                    label: Some(*label),
                    state: CommentState::Consumed,
                    seeded: true,
                    seq: self.ledger_seq.fetch_add(1, Ordering::Relaxed),
                },
            );
        }

        info!(scope_id = %scope_id, samples = comments.len(), "Labelled comments imported");
        comments.len()
    }

    /// Load the built-in corpus into the global scope once
    pub fn seed_global(&self) -> usize {
        if self.seeded.swap(true, Ordering::SeqCst) {
            return 0;
        }
        self.import_labelled(GLOBAL_SCOPE, &seed_comments())
    }

    /// Mode a fresh comment in this scope would be classified with
    pub fn mode_for(&self, scope_id: &str) -> PredictionMode {
        if self.engines.resolve(scope_id).has_model() {
            PredictionMode::Model
        } else {
            PredictionMode::RuleBased
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::FixedClock;
    use crate::state::InMemoryModelStore;
    use chrono::TimeZone;
    use std::time::Duration;

    fn service(config: MlConfig) -> (SpamService, Arc<InMemoryModelStore>) {
        let store = Arc::new(InMemoryModelStore::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap()));
        (SpamService::with_clock(config, store.clone(), clock), store)
    }

    fn comment(content: &str) -> CommentRecord {
        CommentRecord::new(content, "Reader", "198.51.100.7", 3).with_user_agent("Mozilla/5.0")
    }

    #[tokio::test]
    async fn test_initialize_without_model() {
        let (service, _) = service(MlConfig::default());
        service.initialize().await;
        assert_eq!(service.health().model_status, ModelStatus::Baseline);
        assert_eq!(service.mode_for("site-1"), PredictionMode::RuleBased);
    }

    #[test]
    fn test_analyze_records_ledger() {
        let (service, _) = service(MlConfig::default());
        let analysis = service.analyze("site-1", &comment("Lovely write-up, thanks."));

        assert!(!analysis.prediction.is_spam);
        assert_eq!(analysis.prediction.mode, PredictionMode::RuleBased);
        assert_eq!(analysis.prediction.reasons, vec!["No spam indicators detected"]);

        let stats = service.stats("site-1");
        assert_eq!(stats.total_analyzed, 1);
        assert_eq!(stats.total_ham_approved, 1);
        assert_eq!(stats.accuracy, None);
        assert_eq!(stats.model_status, ModelStatus::Baseline);
    }

    #[test]
    fn test_feedback_unknown_comment() {
        let (service, _) = service(MlConfig::default());
        let result = service.record_feedback(Uuid::new_v4(), "site-1", true);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_feedback_wrong_scope_is_not_found() {
        let (service, _) = service(MlConfig::default());
        let analysis = service.analyze("site-1", &comment("hello"));
        let result = service.record_feedback(analysis.comment_id, "site-2", true);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_feedback_queues_at_threshold() {
        let config = MlConfig {
            retrain_threshold: 2,
            ..Default::default()
        };
        let (service, _) = service(config);

        let a = service.analyze("site-1", &comment("first"));
        let b = service.analyze("site-1", &comment("second"));

        let outcome = service.record_feedback(a.comment_id, "site-1", true).unwrap();
        assert!(!outcome.queued_for_training);
        let outcome = service.record_feedback(b.comment_id, "site-1", false).unwrap();
        assert!(outcome.queued_for_training);
        assert_eq!(service.due_scopes(), vec!["site-1"]);

        let stats = service.stats("site-1");
        assert_eq!(stats.accuracy, Some(0.5));
        assert_eq!(stats.pending_feedback, 2);
    }

    #[test]
    fn test_seed_global_once() {
        let (service, _) = service(MlConfig::default());
        assert_eq!(service.seed_global(), 50);
        assert_eq!(service.seed_global(), 0);
        assert_eq!(service.training_samples(GLOBAL_SCOPE).len(), 50);
        assert!(service.training_samples("site-1").is_empty());
        // Seeds never show up in statistics
        assert_eq!(service.stats(GLOBAL_SCOPE).total_analyzed, 0);
    }

    #[tokio::test]
    async fn test_retrain_global_on_seed() {
        // The built-in corpus alone meets the default sample floor
        let (service, store) = service(MlConfig::default());
        service.seed_global();

        let result = service.retrain(GLOBAL_SCOPE).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.samples_used, 50);
        assert_eq!(
            store.latest_version(GLOBAL_SCOPE).await.unwrap(),
            result.version
        );

        let stats = service.stats("site-7");
        assert_eq!(stats.model_status, ModelStatus::Trained);
        assert!(service.stats(GLOBAL_SCOPE).last_retrain.is_some());
        assert_eq!(service.mode_for("site-7"), PredictionMode::Model);
    }

    #[tokio::test]
    async fn test_retrain_consumes_feedback() {
        let config = MlConfig {
            retrain_threshold: 2,
            min_samples_for_retrain: 4,
            ..Default::default()
        };
        let (service, _) = service(config);

        let spam = ["casino bonus http://a.ru", "cheap pills http://b.cn"];
        let ham = ["nice read, thanks", "good point about caching"];
        for text in spam {
            let a = service.analyze("site-1", &comment(text));
            service.record_feedback(a.comment_id, "site-1", true).unwrap();
        }
        for text in ham {
            let a = service.analyze("site-1", &comment(text));
            service.record_feedback(a.comment_id, "site-1", false).unwrap();
        }
        assert_eq!(service.stats("site-1").pending_feedback, 4);

        let result = service.retrain("site-1").await;
        assert!(result.success, "{}", result.message);
        assert_eq!(service.stats("site-1").pending_feedback, 0);
        assert!(service.due_scopes().is_empty());
        assert_eq!(service.stats("site-1").model_status, ModelStatus::Trained);
    }

    #[tokio::test]
    async fn test_reload_if_newer() {
        let config = MlConfig::default();
        let (trainer, store) = service(config.clone());
        trainer.seed_global();
        let result = trainer.retrain(GLOBAL_SCOPE).await;
        assert!(result.success);

        // A second service sharing the store picks the artifact up
        let reader = SpamService::new(config, store);
        assert!(reader.reload_if_newer(GLOBAL_SCOPE).await.unwrap());
        assert!(!reader.reload_if_newer(GLOBAL_SCOPE).await.unwrap());
        assert_eq!(reader.health().active_version, result.version);
    }

    #[test]
    fn test_repeated_feedback_counts_once() {
        let config = MlConfig {
            retrain_threshold: 2,
            ..Default::default()
        };
        let (service, _) = service(config);
        let a = service.analyze("site-1", &comment("first"));

        let outcome = service.record_feedback(a.comment_id, "site-1", true).unwrap();
        assert_eq!(outcome.pending, 1);
        let outcome = service.record_feedback(a.comment_id, "site-1", false).unwrap();
        assert!(!outcome.queued_for_training);
        assert_eq!(outcome.pending, 1);
        assert!(service.due_scopes().is_empty());

        // The latest verdict is the one used for training
        let samples = service.training_samples("site-1");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, Label::Ham);
        assert_eq!(service.feedback.records_for("site-1").len(), 2);
    }

    #[tokio::test]
    async fn test_feedback_after_consumption_stays_consumed() {
        let config = MlConfig {
            retrain_threshold: 2,
            min_samples_for_retrain: 4,
            ..Default::default()
        };
        let (service, _) = service(config);

        let mut ids = Vec::new();
        for (text, is_spam) in [
            ("casino bonus http://a.ru", true),
            ("cheap pills http://b.cn", true),
            ("nice read, thanks", false),
            ("good point about caching", false),
        ] {
            let a = service.analyze("site-1", &comment(text));
            service.record_feedback(a.comment_id, "site-1", is_spam).unwrap();
            ids.push(a.comment_id);
        }
        assert!(service.retrain("site-1").await.success);
        assert_eq!(service.stats("site-1").pending_feedback, 0);

        let outcome = service.record_feedback(ids[2], "site-1", true).unwrap();
        assert_eq!(outcome.pending, 0);
        assert!(!outcome.queued_for_training);
        {
            let entry = service.ledger.get(&ids[2]).unwrap();
            assert_eq!(entry.state, CommentState::Consumed);
            assert_eq!(entry.label, Some(Label::Spam));
        }

        // A fresh comment still counts normally
        let b = service.analyze("site-1", &comment("another one"));
        let outcome = service.record_feedback(b.comment_id, "site-1", false).unwrap();
        assert_eq!(outcome.pending, 1);
    }

    #[tokio::test]
    async fn test_dropped_retrain_releases_scope() {
        let (service, _) = service(MlConfig::default());
        service.seed_global();

        // Cancel the run at its first await point
        let _ = tokio::time::timeout(Duration::ZERO, service.retrain(GLOBAL_SCOPE)).await;
        assert!(service.in_flight.is_empty());

        let result = service.retrain(GLOBAL_SCOPE).await;
        assert!(result.success, "{}", result.message);
        assert!(service.in_flight.is_empty());
    }

    #[test]
    fn test_ledger_evicts_oldest_unlabelled() {
        let config = MlConfig {
            ledger_capacity: 3,
            ..Default::default()
        };
        let (service, _) = service(config);

        let labelled = service.analyze("site-1", &comment("keep me"));
        service
            .record_feedback(labelled.comment_id, "site-1", false)
            .unwrap();
        let ids: Vec<Uuid> = (0..5)
            .map(|i| service.analyze("site-1", &comment(&format!("note {}", i))).comment_id)
            .collect();

        // Three unlabelled analyses plus the labelled one
        assert_eq!(service.ledger.len(), 4);
        assert!(service.ledger.contains_key(&labelled.comment_id));
        assert!(service.ledger.contains_key(&ids[2]));
        assert!(service.ledger.contains_key(&ids[4]));
        assert!(!service.ledger.contains_key(&ids[0]));
        assert!(!service.ledger.contains_key(&ids[1]));

        // Evicted comments can no longer receive feedback
        let result = service.record_feedback(ids[0], "site-1", true);
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let stats = service.stats("site-1");
        assert_eq!(stats.total_analyzed, 6);
        assert_eq!(stats.accuracy, Some(1.0));
    }

    #[test]
    fn test_seed_entries_survive_eviction() {
        let config = MlConfig {
            ledger_capacity: 10,
            ..Default::default()
        };
        let (service, _) = service(config);
        service.seed_global();
        for i in 0..20 {
            service.analyze("site-1", &comment(&format!("note {}", i)));
        }
        assert_eq!(service.training_samples(GLOBAL_SCOPE).len(), 50);
        assert!(service.unlabelled.load(Ordering::SeqCst) <= 10);
        assert_eq!(service.ledger.len() - 50, service.unlabelled.load(Ordering::SeqCst));
        assert_eq!(service.stats("site-1").total_analyzed, 20);
    }
}
