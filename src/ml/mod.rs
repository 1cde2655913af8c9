/// Comment classification: feature extraction, rule-based and trained
/// classifiers, explanations, feedback accumulation and retraining.
///
/// Every scope (the global model or a single site) owns a
/// [`ClassifierEngine`]. Engines serve the heuristic rules until a trained
/// artifact is activated, and keep serving the previous artifact when a
/// replacement is rejected.

pub mod classifier;
pub mod engine;
pub mod explain;
pub mod features;
pub mod feedback;
pub mod layout;
pub mod models;
pub mod rules;
pub mod seed;
pub mod service;
pub mod training;

pub use classifier::{
    Classifier, FittedModel, LogisticRegressionClassifier, NaiveBayesTextClassifier,
    StandardScaler, TextVectorizer,
};
pub use engine::{ClassifierEngine, EngineRegistry};
pub use explain::{Explanation, PredictionExplainer, SignalDetail};
pub use features::{Clock, CommentFingerprint, FeatureExtractor, FeatureVector, FixedClock, SystemClock};
pub use feedback::FeedbackAccumulator;
pub use layout::{LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use models::{
    ClassWeights, ConfusionMatrix, ModelArtifact, ModelFamily, ModelInput, ModelMetrics,
    TrainingResult, TrainingSample,
};
pub use rules::{RuleBasedClassifier, RuleSignal};
pub use service::{Analysis, FeedbackOutcome, HealthStatus, ModelStatus, ServiceStats, SpamService};
pub use training::{fit_artifact, TrainingPipeline};
