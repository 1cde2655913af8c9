use crate::ml::features::FeatureVector;
use crate::models::{PredictionMode, PredictionResult};
use serde::Serialize;

/// Points added when a comment links to more than [`MAX_URLS`] places
pub const WEIGHT_MANY_URLS: f64 = 30.0;
pub const WEIGHT_SUSPICIOUS_TLD: f64 = 25.0;
/// Points per keyword occurrence
pub const WEIGHT_PER_KEYWORD: f64 = 15.0;
pub const WEIGHT_DISPOSABLE_EMAIL: f64 = 20.0;
pub const WEIGHT_UPPERCASE: f64 = 15.0;
pub const WEIGHT_SPECIAL_CHARS: f64 = 10.0;
pub const WEIGHT_HTML: f64 = 20.0;
pub const WEIGHT_BOT: f64 = 35.0;
pub const WEIGHT_MISSING_USER_AGENT: f64 = 15.0;

pub const MAX_URLS: usize = 3;
pub const UPPERCASE_THRESHOLD: f64 = 0.5;
pub const SPECIAL_CHAR_THRESHOLD: f64 = 0.3;

/// A heuristic that fired for a comment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSignal {
    /// Layout field the rule reads
    pub feature: &'static str,
    /// Observed feature value
    pub value: f64,
    /// Points per unit of the signal
    pub weight: f64,
    /// Points contributed to the 0-100 score
    pub contribution: f64,
    /// Human-readable reason
    pub reason: String,
}

/// Deterministic heuristic scorer used when no trained model applies
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self
    }

    /// All rules that fire, in evaluation order
    pub fn signals(&self, features: &FeatureVector) -> Vec<RuleSignal> {
        let mut signals = Vec::new();

        if features.url_count > MAX_URLS {
            signals.push(RuleSignal {
                feature: "url_count",
                value: features.url_count as f64,
                weight: WEIGHT_MANY_URLS,
                contribution: WEIGHT_MANY_URLS,
                reason: format!("Too many links ({})", features.url_count),
            });
        }

        if features.has_suspicious_tld {
            signals.push(RuleSignal {
                feature: "has_suspicious_tld",
                value: 1.0,
                weight: WEIGHT_SUSPICIOUS_TLD,
                contribution: WEIGHT_SUSPICIOUS_TLD,
                reason: "Links to suspicious domains".to_string(),
            });
        }

        if features.spam_keyword_count > 0 {
            signals.push(RuleSignal {
                feature: "spam_keyword_count",
                value: features.spam_keyword_count as f64,
                weight: WEIGHT_PER_KEYWORD,
                contribution: WEIGHT_PER_KEYWORD * features.spam_keyword_count as f64,
                reason: format!("Contains spam keywords ({})", features.spam_keyword_count),
            });
        }

        if features.email_domain_suspicious {
            signals.push(RuleSignal {
                feature: "email_domain_suspicious",
                value: 1.0,
                weight: WEIGHT_DISPOSABLE_EMAIL,
                contribution: WEIGHT_DISPOSABLE_EMAIL,
                reason: "Disposable email address".to_string(),
            });
        }

        if features.uppercase_ratio > UPPERCASE_THRESHOLD {
            signals.push(RuleSignal {
                feature: "uppercase_ratio",
                value: features.uppercase_ratio,
                weight: WEIGHT_UPPERCASE,
                contribution: WEIGHT_UPPERCASE,
                reason: "Excessive uppercase text".to_string(),
            });
        }

        if features.special_char_ratio > SPECIAL_CHAR_THRESHOLD {
            signals.push(RuleSignal {
                feature: "special_char_ratio",
                value: features.special_char_ratio,
                weight: WEIGHT_SPECIAL_CHARS,
                contribution: WEIGHT_SPECIAL_CHARS,
                reason: "Excessive special characters".to_string(),
            });
        }

        if features.has_html {
            signals.push(RuleSignal {
                feature: "has_html",
                value: 1.0,
                weight: WEIGHT_HTML,
                contribution: WEIGHT_HTML,
                reason: "Contains HTML markup".to_string(),
            });
        }

        if features.is_bot {
            signals.push(RuleSignal {
                feature: "is_bot",
                value: 1.0,
                weight: WEIGHT_BOT,
                contribution: WEIGHT_BOT,
                reason: "Submitted by an automated client".to_string(),
            });
        }

        if !features.has_user_agent {
            signals.push(RuleSignal {
                feature: "has_user_agent",
                value: 0.0,
                weight: WEIGHT_MISSING_USER_AGENT,
                contribution: WEIGHT_MISSING_USER_AGENT,
                reason: "Missing user agent".to_string(),
            });
        }

        signals
    }

    /// Raw 0-100+ score before clamping
    pub fn score(&self, features: &FeatureVector) -> f64 {
        self.signals(features).iter().map(|s| s.contribution).sum()
    }

    /// Spam confidence, `min(score / 100, 1)`
    pub fn confidence(&self, features: &FeatureVector) -> f64 {
        (self.score(features) / 100.0).min(1.0)
    }

    pub fn classify(&self, features: &FeatureVector) -> PredictionResult {
        let confidence = self.confidence(features);
        PredictionResult::new(confidence > 0.5, confidence, PredictionMode::RuleBased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean() -> FeatureVector {
        FeatureVector {
            text_length: 40,
            word_count: 7,
            avg_word_length: 5.0,
            has_user_agent: true,
            hour_of_day: 12,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_comment_scores_zero() {
        let classifier = RuleBasedClassifier::new();
        assert!(classifier.signals(&clean()).is_empty());
        let result = classifier.classify(&clean());
        assert!(!result.is_spam);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.mode, PredictionMode::RuleBased);
    }

    #[test]
    fn test_rule_weights() {
        let classifier = RuleBasedClassifier::new();
        let features = FeatureVector {
            url_count: 4,
            has_suspicious_tld: true,
            spam_keyword_count: 2,
            ..clean()
        };
        assert_eq!(classifier.score(&features), 30.0 + 25.0 + 30.0);
        assert!(classifier.classify(&features).is_spam);
    }

    #[test]
    fn test_confidence_is_capped() {
        let classifier = RuleBasedClassifier::new();
        let features = FeatureVector {
            spam_keyword_count: 10,
            is_bot: true,
            ..clean()
        };
        assert_eq!(classifier.confidence(&features), 1.0);
        assert_eq!(classifier.classify(&features).score, 100.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let classifier = RuleBasedClassifier::new();
        // 15 (missing UA) + 35 (bot) lands exactly on 0.5
        let features = FeatureVector {
            has_user_agent: false,
            is_bot: true,
            ..clean()
        };
        let result = classifier.classify(&features);
        assert_eq!(result.confidence, 0.5);
        assert!(!result.is_spam);
    }
}
