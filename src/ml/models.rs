use crate::ml::classifier::FittedModel;
use crate::ml::features::FeatureVector;
use crate::ml::layout::{LayoutInfo, FEATURE_COUNT};
use crate::models::Label;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Model family a deployment trains and serves
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelFamily {
    /// Standardised feature vector + logistic regression
    #[default]
    Tabular,
    /// Bag of words over raw content + naive Bayes
    Text,
}

impl ModelFamily {
    /// Whether inference needs the raw comment text
    pub fn requires_text(&self) -> bool {
        matches!(self, ModelFamily::Text)
    }
}

/// What a fitted classifier consumes for one comment
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    pub features: &'a FeatureVector,
    pub content: Option<&'a str>,
}

impl<'a> ModelInput<'a> {
    pub fn new(features: &'a FeatureVector, content: Option<&'a str>) -> Self {
        Self { features, content }
    }
}

/// Labelled comment, in both representations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub content: String,
    pub label: Label,
}

impl TrainingSample {
    pub fn new(features: FeatureVector, content: impl Into<String>, label: Label) -> Self {
        Self {
            features,
            content: content.into(),
            label,
        }
    }

    pub fn input(&self) -> ModelInput<'_> {
        ModelInput::new(&self.features, Some(&self.content))
    }
}

/// Balanced class weights, `n / (2 * n_c)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    pub ham: f64,
    pub spam: f64,
}

impl ClassWeights {
    pub fn balanced(samples: &[TrainingSample]) -> Self {
        let n = samples.len() as f64;
        let n_spam = samples.iter().filter(|s| s.label.is_spam()).count() as f64;
        let n_ham = n - n_spam;
        let weight = |n_c: f64| if n_c > 0.0 { n / (2.0 * n_c) } else { 0.0 };
        Self {
            ham: weight(n_ham),
            spam: weight(n_spam),
        }
    }

    pub fn uniform() -> Self {
        Self { ham: 1.0, spam: 1.0 }
    }

    pub fn for_label(&self, label: Label) -> f64 {
        match label {
            Label::Ham => self.ham,
            Label::Spam => self.spam,
        }
    }
}

/// Dense view of a sample set for the tabular family
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples x FEATURE_COUNT)
    pub features: Array2<f64>,
    /// 1.0 for spam, 0.0 for ham
    pub targets: Array1<f64>,
    /// Per-sample class weights
    pub weights: Array1<f64>,
    pub n_samples: usize,
}

impl TrainingDataset {
    pub fn from_samples(samples: &[TrainingSample], class_weights: ClassWeights) -> Self {
        let n_samples = samples.len();
        let mut features = Array2::zeros((n_samples, FEATURE_COUNT));
        let mut targets = Array1::zeros(n_samples);
        let mut weights = Array1::zeros(n_samples);

        for (i, sample) in samples.iter().enumerate() {
            for (j, value) in sample.features.to_array().iter().enumerate() {
                features[[i, j]] = *value;
            }
            targets[i] = if sample.label.is_spam() { 1.0 } else { 0.0 };
            weights[i] = class_weights.for_label(sample.label);
        }

        Self {
            features,
            targets,
            weights,
            n_samples,
        }
    }
}

/// Split each class independently so both sides keep the class ratio.
/// Each class contributes at least one training sample, and at least one
/// test sample when it has two or more.
pub fn stratified_split(
    samples: &[TrainingSample],
    test_ratio: f64,
    seed: u64,
) -> (Vec<TrainingSample>, Vec<TrainingSample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for label in [Label::Ham, Label::Spam] {
        let mut class: Vec<&TrainingSample> =
            samples.iter().filter(|s| s.label == label).collect();
        class.shuffle(&mut rng);

        let n = class.len();
        let mut n_test = (n as f64 * test_ratio).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }

        let (test_part, train_part) = class.split_at(n_test);
        test.extend(test_part.iter().map(|s| (*s).clone()));
        train.extend(train_part.iter().map(|s| (*s).clone()));
    }

    (train, test)
}

/// Binary confusion matrix, spam as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Model evaluation metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,

    /// Spam-class precision
    pub precision: f64,

    /// Spam-class recall
    pub recall: f64,

    pub f1_score: f64,

    pub confusion_matrix: ConfusionMatrix,
}

impl ModelMetrics {
    /// Compute metrics from paired labels. Zero denominators yield 0.
    pub fn calculate(y_true: &[Label], y_pred: &[Label]) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (truth, pred) in y_true.iter().zip(y_pred.iter()) {
            match (truth, pred) {
                (Label::Spam, Label::Spam) => cm.true_positives += 1,
                (Label::Ham, Label::Spam) => cm.false_positives += 1,
                (Label::Ham, Label::Ham) => cm.true_negatives += 1,
                (Label::Spam, Label::Ham) => cm.false_negatives += 1,
            }
        }

        let ratio = |num: usize, den: usize| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64
            }
        };

        let accuracy = ratio(cm.true_positives + cm.true_negatives, cm.total());
        let precision = ratio(cm.true_positives, cm.true_positives + cm.false_positives);
        let recall = ratio(cm.true_positives, cm.true_positives + cm.false_negatives);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion_matrix: cm,
        }
    }
}

/// A trained, versioned, immutable model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub scope_id: String,

    /// UUID v7, ordered by creation time
    pub version: String,

    pub family: ModelFamily,

    pub trained_at: DateTime<Utc>,

    /// Feature layout the model was fitted against
    pub layout: LayoutInfo,

    /// Fitted classifier including its preprocessing
    pub model: FittedModel,

    /// Held-out evaluation
    pub metrics: ModelMetrics,

    pub samples_used: usize,
}

/// Outcome of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResult {
    pub success: bool,
    pub metrics: Option<ModelMetrics>,
    pub samples_used: usize,
    pub message: String,
    pub version: Option<String>,
}

impl TrainingResult {
    pub fn failure(samples_used: usize, message: impl Into<String>) -> Self {
        Self {
            success: false,
            metrics: None,
            samples_used,
            message: message.into(),
            version: None,
        }
    }
}
