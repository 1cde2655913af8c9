use crate::config::MlConfig;
use crate::error::{AppError, Result};
use crate::ml::layout::FEATURE_COUNT;
use crate::ml::models::{
    ClassWeights, ModelArtifact, ModelFamily, ModelInput, TrainingDataset, TrainingSample,
};
use crate::models::Label;
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for binary spam classifiers
pub trait Classifier: Send + Sync {
    /// Fit on labelled samples with per-class weights
    fn train(&mut self, samples: &[TrainingSample], weights: ClassWeights) -> Result<()>;

    /// `[p_ham, p_spam]` for one comment
    fn predict_proba(&self, input: ModelInput<'_>) -> Result<[f64; 2]>;

    /// Argmax label together with the probability vector
    fn predict(&self, input: ModelInput<'_>) -> Result<(Label, [f64; 2])> {
        let proba = self.predict_proba(input)?;
        if proba.iter().any(|p| !p.is_finite()) {
            return Err(AppError::Inference(
                "Classifier produced non-finite probabilities".to_string(),
            ));
        }
        let label = if proba[1] > proba[0] {
            Label::Spam
        } else {
            Label::Ham
        };
        Ok((label, proba))
    }

    fn family(&self) -> ModelFamily;

    fn is_trained(&self) -> bool;
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Zero-mean, unit-variance scaling fitted per column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Array2<f64>) -> Result<Self> {
        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| AppError::Internal("Cannot fit scaler on empty data".to_string()))?;
        // Constant columns scale by 1 so they centre to zero
        let std = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        Ok(Self { mean, std })
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.mean) / &self.std
    }

    pub fn transform_row(&self, row: &Array1<f64>) -> Result<Array1<f64>> {
        if row.len() != self.mean.len() {
            return Err(AppError::Inference(format!(
                "Scaler expects {} features, got {}",
                self.mean.len(),
                row.len()
            )));
        }
        Ok((row - &self.mean) / &self.std)
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

/// Logistic regression over the scaled feature vector, fitted with
/// `linfa-logistic` (L-BFGS with an L2 penalty).
///
/// Only the fitted coefficients are kept, oriented so that the positive
/// class is spam. Class weights are applied by resampling before the fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionClassifier {
    scaler: StandardScaler,
    weights: Array1<f64>,
    bias: f64,
    max_iterations: usize,
    gradient_tolerance: f64,
    l2_penalty: f64,
    is_trained: bool,
}

impl LogisticRegressionClassifier {
    pub fn new(max_iterations: usize, gradient_tolerance: f64, l2_penalty: f64) -> Self {
        Self {
            scaler: StandardScaler::default(),
            weights: Array1::zeros(FEATURE_COUNT),
            bias: 0.0,
            max_iterations,
            gradient_tolerance,
            l2_penalty,
            is_trained: false,
        }
    }

    pub fn from_config(config: &MlConfig) -> Self {
        Self::new(
            config.max_iterations,
            config.gradient_tolerance,
            config.l2_penalty,
        )
    }

    /// Learned coefficients in layout order, on the scaled inputs
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.weights
    }
}

/// Repeat rows so each class's row count is proportional to its total
/// weight. Rows are cycled in order, so the result is deterministic.
fn weighted_resample(
    dataset: &TrainingDataset,
    weights: ClassWeights,
) -> (Array2<f64>, Array1<bool>) {
    let (spam_rows, ham_rows): (Vec<usize>, Vec<usize>) =
        (0..dataset.n_samples).partition(|&i| dataset.targets[i] > 0.5);

    let min_weight = [weights.ham, weights.spam]
        .into_iter()
        .filter(|w| *w > 0.0)
        .fold(f64::INFINITY, f64::min);
    let copies = |rows: &[usize], weight: f64| -> usize {
        if !min_weight.is_finite() || weight <= 0.0 {
            return rows.len();
        }
        ((rows.len() as f64 * weight / min_weight).round() as usize).max(rows.len())
    };

    let mut indices = Vec::new();
    let mut targets = Vec::new();
    for (rows, weight, is_spam) in [
        (&ham_rows, weights.ham, false),
        (&spam_rows, weights.spam, true),
    ] {
        if rows.is_empty() {
            continue;
        }
        for k in 0..copies(rows, weight) {
            indices.push(rows[k % rows.len()]);
            targets.push(is_spam);
        }
    }

    (
        dataset.features.select(Axis(0), &indices),
        Array1::from_vec(targets),
    )
}

impl Classifier for LogisticRegressionClassifier {
    fn train(&mut self, samples: &[TrainingSample], weights: ClassWeights) -> Result<()> {
        if samples.is_empty() {
            return Err(AppError::Internal(
                "Cannot train on an empty sample set".to_string(),
            ));
        }

        let dataset = TrainingDataset::from_samples(samples, weights);
        let scaler = StandardScaler::fit(&dataset.features)?;
        let (features, targets) = weighted_resample(&dataset, weights);
        let records = Dataset::new(scaler.transform(&features), targets);

        let fitted = LogisticRegression::default()
            .alpha(self.l2_penalty)
            .max_iterations(self.max_iterations as u64)
            .gradient_tolerance(self.gradient_tolerance)
            .fit(&records)
            .map_err(|e| AppError::Internal(format!("Logistic regression failed: {}", e)))?;

        // p(ham) = 1 - sigmoid(z) = sigmoid(-z)
        let (w, b) = if fitted.labels().pos.class {
            (fitted.params().clone(), fitted.intercept())
        } else {
            (-fitted.params(), -fitted.intercept())
        };

        if w.iter().any(|v| !v.is_finite()) || !b.is_finite() {
            return Err(AppError::Internal(
                "Logistic regression diverged".to_string(),
            ));
        }

        self.scaler = scaler;
        self.weights = w;
        self.bias = b;
        self.is_trained = true;
        Ok(())
    }

    fn predict_proba(&self, input: ModelInput<'_>) -> Result<[f64; 2]> {
        if !self.is_trained {
            return Err(AppError::Inference("Model not trained".to_string()));
        }
        if self.weights.len() != FEATURE_COUNT {
            return Err(AppError::Inference(format!(
                "Model expects {} features, layout has {}",
                self.weights.len(),
                FEATURE_COUNT
            )));
        }

        let row = Array1::from_vec(input.features.to_array().to_vec());
        let scaled = self.scaler.transform_row(&row)?;
        let p_spam = sigmoid(scaled.dot(&self.weights) + self.bias);
        Ok([1.0 - p_spam, p_spam])
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Tabular
    }

    fn is_trained(&self) -> bool {
        self.is_trained
    }
}

/// Lowercased tokens of two or more characters
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(|w| w.to_string())
        .collect()
}

/// Unigram and bigram terms of a document
pub fn extract_terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut terms = tokens.clone();
    for window in tokens.windows(2) {
        terms.push(format!("{} {}", window[0], window[1]));
    }
    terms
}

/// Term vocabulary with a document-frequency cut-off
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    min_doc_freq: usize,
    max_vocab_size: usize,
}

impl TextVectorizer {
    pub fn new(min_doc_freq: usize, max_vocab_size: usize) -> Self {
        Self {
            vocabulary: HashMap::new(),
            min_doc_freq: min_doc_freq.max(1),
            max_vocab_size,
        }
    }

    pub fn fit<'a, I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let mut terms = extract_terms(doc);
            terms.sort();
            terms.dedup();
            for term in terms {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Most frequent first; ties broken alphabetically for a stable index
        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= self.min_doc_freq)
            .collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(self.max_vocab_size);

        self.vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(idx, (term, _))| (term, idx))
            .collect();
    }

    /// Sparse term counts; out-of-vocabulary terms are dropped
    pub fn transform(&self, text: &str) -> HashMap<usize, f64> {
        let mut counts = HashMap::new();
        for term in extract_terms(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        counts
    }

    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }
}

/// Multinomial naive Bayes over term counts with Laplace smoothing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesTextClassifier {
    vectorizer: TextVectorizer,
    /// Log priors, indexed by class (ham = 0, spam = 1)
    log_prior: [f64; 2],
    /// Log term likelihoods, shape (vocab, 2)
    log_likelihood: Array2<f64>,
    is_trained: bool,
}

impl NaiveBayesTextClassifier {
    pub fn new(min_doc_freq: usize, max_vocab_size: usize) -> Self {
        Self {
            vectorizer: TextVectorizer::new(min_doc_freq, max_vocab_size),
            log_prior: [0.0; 2],
            log_likelihood: Array2::zeros((0, 2)),
            is_trained: false,
        }
    }

    pub fn from_config(config: &MlConfig) -> Self {
        Self::new(config.min_doc_freq, config.max_vocab_size)
    }

    pub fn vectorizer(&self) -> &TextVectorizer {
        &self.vectorizer
    }
}

impl Classifier for NaiveBayesTextClassifier {
    fn train(&mut self, samples: &[TrainingSample], weights: ClassWeights) -> Result<()> {
        if samples.is_empty() {
            return Err(AppError::Internal(
                "Cannot train on an empty sample set".to_string(),
            ));
        }

        let mut vectorizer = self.vectorizer.clone();
        vectorizer.fit(samples.iter().map(|s| s.content.as_str()));
        let vocab = vectorizer.vocab_size();

        let mut term_counts = Array2::<f64>::zeros((vocab, 2));
        let mut class_mass = [0.0f64; 2];

        for sample in samples {
            let class = sample.label.index();
            let w = weights.for_label(sample.label);
            class_mass[class] += w;
            for (idx, count) in vectorizer.transform(&sample.content) {
                term_counts[[idx, class]] += w * count;
            }
        }

        let total_mass = class_mass[0] + class_mass[1];
        let mut log_prior = [0.0; 2];
        for class in 0..2 {
            // Unseen class keeps a tiny prior so the log stays finite
            log_prior[class] = (class_mass[class].max(f64::EPSILON) / total_mass).ln();
        }

        let class_totals = term_counts.sum_axis(Axis(0));
        let mut log_likelihood = Array2::<f64>::zeros((vocab, 2));
        for class in 0..2 {
            let denom = class_totals[class] + vocab as f64;
            for idx in 0..vocab {
                log_likelihood[[idx, class]] = ((term_counts[[idx, class]] + 1.0) / denom).ln();
            }
        }

        self.vectorizer = vectorizer;
        self.log_prior = log_prior;
        self.log_likelihood = log_likelihood;
        self.is_trained = true;
        Ok(())
    }

    fn predict_proba(&self, input: ModelInput<'_>) -> Result<[f64; 2]> {
        if !self.is_trained {
            return Err(AppError::Inference("Model not trained".to_string()));
        }
        let content = input.content.ok_or_else(|| {
            AppError::Inference("Text model requires the raw comment content".to_string())
        })?;

        let mut log_post = self.log_prior;
        for (idx, count) in self.vectorizer.transform(content) {
            if idx >= self.log_likelihood.nrows() {
                return Err(AppError::Inference(format!(
                    "Term index {} outside fitted vocabulary",
                    idx
                )));
            }
            for (class, value) in log_post.iter_mut().enumerate() {
                *value += count * self.log_likelihood[[idx, class]];
            }
        }

        // Softmax over the two log posteriors
        let max = log_post[0].max(log_post[1]);
        let e0 = (log_post[0] - max).exp();
        let e1 = (log_post[1] - max).exp();
        let sum = e0 + e1;
        Ok([e0 / sum, e1 / sum])
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Text
    }

    fn is_trained(&self) -> bool {
        self.is_trained
    }
}

/// A fitted model of either family, as stored in an artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    Tabular(LogisticRegressionClassifier),
    Text(NaiveBayesTextClassifier),
}

impl FittedModel {
    /// Untrained model of the configured family
    pub fn for_family(family: ModelFamily, config: &MlConfig) -> Self {
        match family {
            ModelFamily::Tabular => {
                FittedModel::Tabular(LogisticRegressionClassifier::from_config(config))
            }
            ModelFamily::Text => FittedModel::Text(NaiveBayesTextClassifier::from_config(config)),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            FittedModel::Tabular(model) => model,
            FittedModel::Text(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            FittedModel::Tabular(model) => model,
            FittedModel::Text(model) => model,
        }
    }
}

impl Classifier for FittedModel {
    fn train(&mut self, samples: &[TrainingSample], weights: ClassWeights) -> Result<()> {
        self.inner_mut().train(samples, weights)
    }

    fn predict_proba(&self, input: ModelInput<'_>) -> Result<[f64; 2]> {
        self.inner().predict_proba(input)
    }

    fn family(&self) -> ModelFamily {
        self.inner().family()
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }
}

/// Inference wrapper around an active artifact
#[derive(Debug, Clone)]
pub struct ModelClassifier {
    artifact: Arc<ModelArtifact>,
}

impl ModelClassifier {
    pub fn new(artifact: Arc<ModelArtifact>) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Label and `[p_ham, p_spam]`, or an inference error the caller is
    /// expected to recover from.
    pub fn predict_one(&self, input: ModelInput<'_>) -> Result<(Label, [f64; 2])> {
        self.artifact.layout.validate()?;
        if self.artifact.model.family() != self.artifact.family {
            return Err(AppError::Inference(format!(
                "Artifact {} declares family {} but holds a {} model",
                self.artifact.version,
                self.artifact.family,
                self.artifact.model.family()
            )));
        }
        self.artifact.model.predict(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::FeatureVector;

    fn tabular_samples() -> Vec<TrainingSample> {
        let mut samples = Vec::new();
        for i in 0..20 {
            let spam = FeatureVector {
                url_count: 4 + i % 3,
                spam_keyword_count: 2 + i % 2,
                has_suspicious_tld: true,
                ..Default::default()
            };
            samples.push(TrainingSample::new(spam, "buy cheap pills", Label::Spam));

            let ham = FeatureVector {
                word_count: 10 + i % 4,
                has_user_agent: true,
                ..Default::default()
            };
            samples.push(TrainingSample::new(ham, "thanks for sharing", Label::Ham));
        }
        samples
    }

    #[test]
    fn test_scaler_constant_column() {
        let data = Array2::from_shape_vec((2, 2), vec![1.0, 5.0, 3.0, 5.0]).unwrap();
        let scaler = StandardScaler::fit(&data).unwrap();
        let scaled = scaler.transform(&data);
        assert_eq!(scaled[[0, 0]], -1.0);
        assert_eq!(scaled[[1, 0]], 1.0);
        assert_eq!(scaled[[0, 1]], 0.0);
    }

    #[test]
    fn test_logistic_regression_classifier() {
        let samples = tabular_samples();
        let mut classifier = LogisticRegressionClassifier::new(500, 1e-4, 0.001);
        assert!(!classifier.is_trained());

        classifier
            .train(&samples, ClassWeights::balanced(&samples))
            .unwrap();
        assert!(classifier.is_trained());

        for sample in &samples {
            let (label, proba) = classifier.predict(sample.input()).unwrap();
            assert_eq!(label, sample.label);
            assert!((proba[0] + proba[1] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_weighted_resample_balances_classes() {
        let mut samples = tabular_samples();
        // 20 ham, 5 spam
        let mut spam_seen = 0;
        samples.retain(|s| {
            if s.label.is_spam() {
                spam_seen += 1;
                spam_seen <= 5
            } else {
                true
            }
        });
        let weights = ClassWeights::balanced(&samples);
        let dataset = TrainingDataset::from_samples(&samples, weights);
        let (features, targets) = weighted_resample(&dataset, weights);

        assert_eq!(features.nrows(), targets.len());
        assert_eq!(targets.iter().filter(|t| **t).count(), 20);
        assert_eq!(targets.iter().filter(|t| !**t).count(), 20);

        let (_, targets) = weighted_resample(&dataset, ClassWeights::uniform());
        assert_eq!(targets.len(), 25);
    }

    #[test]
    fn test_minority_spam_still_learned() {
        let samples: Vec<TrainingSample> = tabular_samples()
            .into_iter()
            .enumerate()
            .filter(|(i, s)| !s.label.is_spam() || i % 8 == 0)
            .map(|(_, s)| s)
            .collect();
        let mut classifier = LogisticRegressionClassifier::new(500, 1e-4, 0.001);
        classifier
            .train(&samples, ClassWeights::balanced(&samples))
            .unwrap();

        let spam = samples.iter().find(|s| s.label.is_spam()).unwrap();
        let (label, _) = classifier.predict(spam.input()).unwrap();
        assert_eq!(label, Label::Spam);
    }

    #[test]
    fn test_untrained_model_is_inference_error() {
        let classifier = LogisticRegressionClassifier::new(10, 1e-4, 0.0);
        let features = FeatureVector::default();
        let result = classifier.predict(ModelInput::new(&features, None));
        assert!(matches!(result, Err(AppError::Inference(_))));
    }

    #[test]
    fn test_tokenize_and_terms() {
        assert_eq!(tokenize("Buy NOW, a b!"), vec!["buy", "now"]);
        assert_eq!(
            extract_terms("click here now"),
            vec!["click", "here", "now", "click here", "here now"]
        );
    }

    #[test]
    fn test_vectorizer_doc_freq_cutoff() {
        let mut vectorizer = TextVectorizer::new(2, 100);
        vectorizer.fit(["cheap pills", "cheap watches", "lovely post"]);
        assert!(vectorizer.contains("cheap"));
        assert!(!vectorizer.contains("lovely"));
        assert_eq!(vectorizer.vocab_size(), 1);
    }

    #[test]
    fn test_naive_bayes_text_classifier() {
        let features = FeatureVector::default();
        let mut samples = Vec::new();
        for i in 0..10 {
            samples.push(TrainingSample::new(
                features.clone(),
                format!("cheap pills casino bonus offer {}", i),
                Label::Spam,
            ));
            samples.push(TrainingSample::new(
                features.clone(),
                format!("great article thanks for the explanation {}", i),
                Label::Ham,
            ));
        }

        let mut classifier = NaiveBayesTextClassifier::new(1, 1000);
        classifier
            .train(&samples, ClassWeights::balanced(&samples))
            .unwrap();

        let (label, proba) = classifier
            .predict(ModelInput::new(&features, Some("casino bonus pills")))
            .unwrap();
        assert_eq!(label, Label::Spam);
        assert!(proba[1] > 0.9);

        let (label, _) = classifier
            .predict(ModelInput::new(&features, Some("thanks, great explanation")))
            .unwrap();
        assert_eq!(label, Label::Ham);
    }

    #[test]
    fn test_text_model_requires_content() {
        let features = FeatureVector::default();
        let samples = vec![
            TrainingSample::new(features.clone(), "spam words", Label::Spam),
            TrainingSample::new(features.clone(), "ham words", Label::Ham),
        ];
        let mut classifier = NaiveBayesTextClassifier::new(1, 100);
        classifier.train(&samples, ClassWeights::uniform()).unwrap();

        let result = classifier.predict(ModelInput::new(&features, None));
        assert!(matches!(result, Err(AppError::Inference(_))));
    }

    #[test]
    fn test_fitted_model_family() {
        let config = MlConfig::default();
        assert_eq!(
            FittedModel::for_family(ModelFamily::Text, &config).family(),
            ModelFamily::Text
        );
        assert!(!FittedModel::for_family(ModelFamily::Tabular, &config).is_trained());
    }
}
