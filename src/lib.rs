//! SpamGuard: multi-tenant comment spam classification.
//!
//! Comments are turned into a fixed feature vector, scored by a trained
//! model when one is active (rule-based heuristics otherwise) and explained
//! with ranked reasons. Moderator corrections accumulate per scope and drive
//! retraining of new, versioned model artifacts that are hot-swapped into
//! the engine.

pub mod config;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod models;
pub mod scheduler;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use ml::{
    Analysis, ClassifierEngine, FeatureExtractor, FeatureVector, ModelArtifact, ModelFamily,
    SpamService, TrainingPipeline, TrainingResult,
};
pub use models::{CommentRecord, Label, PredictionMode, PredictionResult};
pub use state::{ModelStore, InMemoryModelStore, SledModelStore};

/// Scope identifier of the cross-tenant model.
pub const GLOBAL_SCOPE: &str = "global";
