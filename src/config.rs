use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ml::ModelFamily;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Classification and training configuration
    #[serde(default)]
    pub ml: MlConfig,

    /// Model store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Background retrain scheduling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("SPAMGUARD_CONFIG")
            .unwrap_or_else(|_| "config/spamguard.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: SPAMGUARD_)
            .add_source(
                config::Environment::with_prefix("SPAMGUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    /// Feedback corrections per scope before a retrain is due
    #[serde(default = "default_retrain_threshold")]
    pub retrain_threshold: usize,

    /// Minimum labelled samples a training run accepts
    #[serde(default = "default_min_samples")]
    pub min_samples_for_retrain: usize,

    /// Model family this deployment trains and serves
    #[serde(default)]
    pub model_family: ModelFamily,

    /// Held-out share for evaluation
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,

    /// Seed for the stratified split
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Solver iteration cap (tabular family)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Solver stops once the gradient norm falls below this (tabular family)
    #[serde(default = "default_gradient_tolerance")]
    pub gradient_tolerance: f64,

    /// L2 regularisation strength (tabular family)
    #[serde(default = "default_l2_penalty")]
    pub l2_penalty: f64,

    /// Minimum document frequency for vocabulary terms (text family)
    #[serde(default = "default_min_doc_freq")]
    pub min_doc_freq: usize,

    /// Maximum vocabulary size (text family)
    #[serde(default = "default_max_vocab_size")]
    pub max_vocab_size: usize,

    /// Unlabelled analyses kept in memory. Past this the oldest are dropped.
    #[serde(default = "default_ledger_capacity")]
    pub ledger_capacity: usize,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            retrain_threshold: default_retrain_threshold(),
            min_samples_for_retrain: default_min_samples(),
            model_family: ModelFamily::default(),
            test_ratio: default_test_ratio(),
            seed: default_seed(),
            max_iterations: default_max_iterations(),
            gradient_tolerance: default_gradient_tolerance(),
            l2_penalty: default_l2_penalty(),
            min_doc_freq: default_min_doc_freq(),
            max_vocab_size: default_max_vocab_size(),
            ledger_capacity: default_ledger_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store backend type
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for the embedded artifact database
    #[serde(default = "default_model_storage_location")]
    pub model_storage_location: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            model_storage_location: default_model_storage_location(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the background retrain job
    #[serde(default)]
    pub enabled: bool,

    /// Cron expression (with seconds) for the due-scope sweep
    #[serde(default = "default_retrain_cron")]
    pub retrain_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            retrain_cron: default_retrain_cron(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_retrain_threshold() -> usize {
    100
}

fn default_min_samples() -> usize {
    50
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_max_iterations() -> usize {
    500
}

fn default_gradient_tolerance() -> f64 {
    1e-4
}

fn default_l2_penalty() -> f64 {
    0.001
}

fn default_min_doc_freq() -> usize {
    1
}

fn default_max_vocab_size() -> usize {
    5000
}

fn default_ledger_capacity() -> usize {
    10_000
}

fn default_model_storage_location() -> PathBuf {
    PathBuf::from("./data/models")
}

fn default_retrain_cron() -> String {
    "0 */5 * * * *".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
