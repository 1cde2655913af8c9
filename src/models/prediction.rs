use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Classification label
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    pub fn from_is_spam(is_spam: bool) -> Self {
        if is_spam {
            Label::Spam
        } else {
            Label::Ham
        }
    }

    pub fn is_spam(&self) -> bool {
        matches!(self, Label::Spam)
    }

    /// Class index used by the classifiers (ham = 0, spam = 1)
    pub fn index(&self) -> usize {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 1 {
            Label::Spam
        } else {
            Label::Ham
        }
    }
}

/// Which path produced a prediction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionMode {
    RuleBased,
    Model,
}

/// Outcome of classifying one comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub is_spam: bool,

    /// Spam confidence (0.0 - 1.0)
    pub confidence: f64,

    /// Confidence scaled to 0 - 100
    pub score: f64,

    /// Ranked human-readable reasons, at most five
    pub reasons: Vec<String>,

    pub mode: PredictionMode,

    /// Artifact version when `mode` is `model`
    #[serde(default)]
    pub model_version: Option<String>,
}

impl PredictionResult {
    pub fn new(is_spam: bool, confidence: f64, mode: PredictionMode) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            is_spam,
            confidence,
            score: confidence * 100.0,
            reasons: Vec::new(),
            mode,
            model_version: None,
        }
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    pub fn label(&self) -> Label {
        Label::from_is_spam(self.is_spam)
    }
}
