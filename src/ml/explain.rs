use crate::ml::features::FeatureVector;
use crate::ml::rules::{RuleBasedClassifier, RuleSignal};
use crate::models::{PredictionMode, PredictionResult};
use serde::Serialize;
use std::cmp::Ordering;

pub const MAX_REASONS: usize = 5;

pub const NO_INDICATORS: &str = "No spam indicators detected";
pub const APPEARS_LEGITIMATE: &str = "Content appears legitimate";

/// One signal in a detailed explanation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalDetail {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
    pub reason: String,
}

/// Structured breakdown for the request layer's `explanation` object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub mode: PredictionMode,
    pub is_spam: bool,
    pub confidence: f64,
    /// Sum of rule contributions, before clamping
    pub rule_score: f64,
    /// Strongest first
    pub signals: Vec<SignalDetail>,
    pub reasons: Vec<String>,
}

/// Turns features and a prediction into ranked, human-readable reasons
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionExplainer {
    rules: RuleBasedClassifier,
}

impl PredictionExplainer {
    pub fn new() -> Self {
        Self {
            rules: RuleBasedClassifier::new(),
        }
    }

    fn ranked_signals(&self, features: &FeatureVector) -> Vec<RuleSignal> {
        let mut signals = self.rules.signals(features);
        // Stable: equal strengths keep rule order
        signals.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
        });
        signals
    }

    /// At most [`MAX_REASONS`] reasons, strongest first
    pub fn explain(&self, features: &FeatureVector, prediction: &PredictionResult) -> Vec<String> {
        let signals = self.ranked_signals(features);
        let mut reasons = Vec::with_capacity(MAX_REASONS);

        match prediction.mode {
            PredictionMode::RuleBased => {
                if signals.is_empty() && !prediction.is_spam {
                    reasons.push(NO_INDICATORS.to_string());
                }
            }
            PredictionMode::Model => {
                reasons.push(if prediction.is_spam {
                    format!("Model confidence: {:.1}% spam", prediction.confidence * 100.0)
                } else {
                    format!(
                        "Model confidence: {:.1}% legitimate",
                        (1.0 - prediction.confidence) * 100.0
                    )
                });
                if signals.is_empty() && !prediction.is_spam {
                    reasons.push(APPEARS_LEGITIMATE.to_string());
                }
            }
        }

        reasons.extend(signals.into_iter().map(|s| s.reason));
        reasons.truncate(MAX_REASONS);
        reasons
    }

    pub fn explain_detailed(
        &self,
        features: &FeatureVector,
        prediction: &PredictionResult,
    ) -> Explanation {
        let signals = self.ranked_signals(features);
        let rule_score = signals.iter().map(|s| s.contribution).sum();

        Explanation {
            mode: prediction.mode,
            is_spam: prediction.is_spam,
            confidence: prediction.confidence,
            rule_score,
            signals: signals
                .into_iter()
                .map(|s| SignalDetail {
                    name: s.feature.to_string(),
                    value: s.value,
                    weight: s.weight,
                    contribution: s.contribution,
                    reason: s.reason,
                })
                .collect(),
            reasons: self.explain(features, prediction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean() -> FeatureVector {
        FeatureVector {
            word_count: 8,
            has_user_agent: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_rule_mode_no_indicators() {
        let explainer = PredictionExplainer::new();
        let prediction = PredictionResult::new(false, 0.0, PredictionMode::RuleBased);
        assert_eq!(explainer.explain(&clean(), &prediction), vec![NO_INDICATORS]);
    }

    #[test]
    fn test_reasons_sorted_by_strength() {
        let explainer = PredictionExplainer::new();
        let features = FeatureVector {
            has_user_agent: false,
            is_bot: true,
            has_suspicious_tld: true,
            spam_keyword_count: 3,
            ..clean()
        };
        let prediction = PredictionResult::new(true, 1.0, PredictionMode::RuleBased);
        let reasons = explainer.explain(&features, &prediction);

        assert_eq!(
            reasons,
            vec![
                "Contains spam keywords (3)",
                "Submitted by an automated client",
                "Links to suspicious domains",
                "Missing user agent",
            ]
        );
    }

    #[test]
    fn test_reasons_truncated_to_five() {
        let explainer = PredictionExplainer::new();
        let features = FeatureVector {
            url_count: 9,
            has_suspicious_tld: true,
            spam_keyword_count: 1,
            email_domain_suspicious: true,
            uppercase_ratio: 0.9,
            special_char_ratio: 0.5,
            has_html: true,
            is_bot: true,
            has_user_agent: false,
            ..Default::default()
        };
        let prediction = PredictionResult::new(true, 1.0, PredictionMode::Model);
        let reasons = explainer.explain(&features, &prediction);

        assert_eq!(reasons.len(), MAX_REASONS);
        assert_eq!(reasons[0], "Model confidence: 100.0% spam");
        assert_eq!(reasons[1], "Submitted by an automated client");
    }

    #[test]
    fn test_model_mode_legitimate() {
        let explainer = PredictionExplainer::new();
        let prediction = PredictionResult::new(false, 0.034, PredictionMode::Model);
        assert_eq!(
            explainer.explain(&clean(), &prediction),
            vec!["Model confidence: 96.6% legitimate", APPEARS_LEGITIMATE]
        );
    }

    #[test]
    fn test_explain_detailed() {
        let explainer = PredictionExplainer::new();
        let features = FeatureVector {
            spam_keyword_count: 2,
            has_html: true,
            ..clean()
        };
        let prediction = PredictionResult::new(false, 0.5, PredictionMode::RuleBased);
        let detail = explainer.explain_detailed(&features, &prediction);

        assert_eq!(detail.rule_score, 50.0);
        assert_eq!(detail.signals.len(), 2);
        assert_eq!(detail.signals[0].name, "spam_keyword_count");
        assert_eq!(detail.signals[0].weight, 15.0);
        assert_eq!(detail.signals[0].contribution, 30.0);
        assert_eq!(detail.reasons.len(), 2);
    }
}
