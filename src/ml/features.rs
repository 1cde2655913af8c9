use crate::ml::layout::{feature_index, FEATURE_COUNT};
use crate::models::CommentRecord;
use chrono::{DateTime, Timelike, Utc};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// Phrases commonly found in comment spam, matched case-insensitively
pub const SPAM_KEYWORDS: &[&str] = &[
    "viagra",
    "cialis",
    "pharmacy",
    "casino",
    "poker",
    "loan",
    "mortgage",
    "credit",
    "earn money",
    "work from home",
    "click here",
    "buy now",
    "limited offer",
    "act now",
    "free money",
    "weight loss",
    "bitcoin",
    "crypto",
];

pub const SUSPICIOUS_TLDS: &[&str] = &[".ru", ".cn", ".tk", ".ml", ".ga"];

/// Throwaway mailbox providers
pub const DISPOSABLE_EMAIL_DOMAINS: &[&str] = &[
    "tempmail.com",
    "guerrillamail.com",
    "10minutemail.com",
    "mailinator.com",
    "throwaway.email",
];

lazy_static! {
    static ref URL_PATTERN: Regex =
        Regex::new(r#"https?://[^\s<>"']+"#).expect("url pattern is valid");
    static ref HTML_PATTERN: Regex = Regex::new(
        r"(?i)<\s*/?\s*(a|script|iframe|img|div|span|p|b|i|u|em|strong|br|font|style|form|input|object|embed)\b|href\s*=|src\s*="
    )
    .expect("html pattern is valid");
    static ref BOT_PATTERN: Regex =
        Regex::new(r"(?i)bot|crawler|spider").expect("bot pattern is valid");
}

/// Source of the evaluation instant for time-of-day features
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for reproducible extraction
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed-schema comment features, in layout order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub text_length: usize,
    pub word_count: usize,
    pub avg_word_length: f64,
    pub url_count: usize,
    pub has_url: bool,
    pub url_to_text_ratio: f64,
    pub unique_domains: usize,
    pub has_suspicious_tld: bool,
    pub spam_keyword_count: usize,
    pub has_spam_keywords: bool,
    pub special_char_ratio: f64,
    pub uppercase_ratio: f64,
    pub digit_ratio: f64,
    pub exclamation_count: usize,
    pub question_count: usize,
    pub has_html: bool,
    pub has_email: bool,
    pub email_domain_suspicious: bool,
    pub email_length: usize,
    pub author_length: usize,
    pub author_has_numbers: bool,
    pub author_all_caps: bool,
    pub has_author_url: bool,
    pub author_url_suspicious_tld: bool,
    pub hour_of_day: u32,
    pub is_night_time: bool,
    pub has_user_agent: bool,
    pub is_bot: bool,
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn count(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.round() as usize
    } else {
        0
    }
}

impl FeatureVector {
    /// Numeric view in `FEATURE_LAYOUT` order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.text_length as f64,
            self.word_count as f64,
            self.avg_word_length,
            self.url_count as f64,
            flag(self.has_url),
            self.url_to_text_ratio,
            self.unique_domains as f64,
            flag(self.has_suspicious_tld),
            self.spam_keyword_count as f64,
            flag(self.has_spam_keywords),
            self.special_char_ratio,
            self.uppercase_ratio,
            self.digit_ratio,
            self.exclamation_count as f64,
            self.question_count as f64,
            flag(self.has_html),
            flag(self.has_email),
            flag(self.email_domain_suspicious),
            self.email_length as f64,
            self.author_length as f64,
            flag(self.author_has_numbers),
            flag(self.author_all_caps),
            flag(self.has_author_url),
            flag(self.author_url_suspicious_tld),
            self.hour_of_day as f64,
            flag(self.is_night_time),
            flag(self.has_user_agent),
            flag(self.is_bot),
        ]
    }

    /// Inverse of [`to_array`](Self::to_array). Counts are rounded and
    /// clamped at zero, flags are any non-zero value.
    pub fn from_array(values: &[f64; FEATURE_COUNT]) -> Self {
        Self {
            text_length: count(values[0]),
            word_count: count(values[1]),
            avg_word_length: values[2],
            url_count: count(values[3]),
            has_url: values[4] != 0.0,
            url_to_text_ratio: values[5],
            unique_domains: count(values[6]),
            has_suspicious_tld: values[7] != 0.0,
            spam_keyword_count: count(values[8]),
            has_spam_keywords: values[9] != 0.0,
            special_char_ratio: values[10],
            uppercase_ratio: values[11],
            digit_ratio: values[12],
            exclamation_count: count(values[13]),
            question_count: count(values[14]),
            has_html: values[15] != 0.0,
            has_email: values[16] != 0.0,
            email_domain_suspicious: values[17] != 0.0,
            email_length: count(values[18]),
            author_length: count(values[19]),
            author_has_numbers: values[20] != 0.0,
            author_all_caps: values[21] != 0.0,
            has_author_url: values[22] != 0.0,
            author_url_suspicious_tld: values[23] != 0.0,
            hour_of_day: count(values[24]).min(23) as u32,
            is_night_time: values[25] != 0.0,
            has_user_agent: values[26] != 0.0,
            is_bot: values[27] != 0.0,
        }
    }

    /// Build from name/value pairs. Unknown names are ignored and
    /// missing ones default to zero/false.
    pub fn from_named<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values = [0.0; FEATURE_COUNT];
        for (name, value) in pairs {
            if let Some(idx) = feature_index(name) {
                values[idx] = value;
            }
        }
        Self::from_array(&values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|idx| self.to_array()[idx])
    }
}

/// Truncated SHA-256 digests of identifying fields. Logged, never fed to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentFingerprint {
    pub ip_hash: String,
    pub email_hash: Option<String>,
}

/// Turns raw comments into [`FeatureVector`]s
#[derive(Clone)]
pub struct FeatureExtractor {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor").finish_non_exhaustive()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl FeatureExtractor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Extract the feature vector for a comment. Never fails.
    pub fn extract(&self, comment: &CommentRecord) -> FeatureVector {
        let content = comment.content.as_str();
        let len = content.chars().count();
        let denom = len.max(1) as f64;

        let words: Vec<&str> = content.split_whitespace().collect();
        let word_chars: usize = words.iter().map(|w| w.chars().count()).sum();

        // Links
        let urls: Vec<&str> = URL_PATTERN
            .find_iter(content)
            .map(|m| trim_url(m.as_str()))
            .filter(|u| url_host(u).is_some())
            .collect();
        let url_chars: usize = urls.iter().map(|u| u.chars().count()).sum();
        let hosts: Vec<String> = urls.iter().filter_map(|u| url_host(u)).collect();
        let unique_domains = hosts.iter().collect::<HashSet<_>>().len();
        let any_suspicious_tld = hosts.iter().any(|h| has_suspicious_tld(h));

        let spam_keyword_count = count_keywords(content);

        let mut special = 0usize;
        let mut upper = 0usize;
        let mut digits = 0usize;
        for c in content.chars() {
            if !(c.is_ascii_alphanumeric() || c.is_whitespace()) {
                special += 1;
            }
            if c.is_uppercase() {
                upper += 1;
            }
            if c.is_ascii_digit() {
                digits += 1;
            }
        }

        // Email
        let email = comment
            .author_email
            .as_deref()
            .filter(|e| !e.trim().is_empty());
        let email_domain_suspicious = email
            .and_then(|e| e.rsplit_once('@'))
            .map(|(_, domain)| {
                let domain = domain.to_ascii_lowercase();
                DISPOSABLE_EMAIL_DOMAINS.contains(&domain.as_str())
            })
            .unwrap_or(false);

        // Author
        let author = comment.author.as_str();
        let has_letters = author.chars().any(|c| c.is_alphabetic());
        let author_all_caps = has_letters
            && author
                .chars()
                .filter(|c| c.is_alphabetic())
                .all(|c| c.is_uppercase());

        let author_url = comment
            .author_url
            .as_deref()
            .filter(|u| !u.trim().is_empty());
        let author_url_suspicious_tld = author_url
            .and_then(url_host)
            .map(|h| has_suspicious_tld(&h))
            .unwrap_or(false);

        let hour = self.clock.now().hour();

        let user_agent = comment
            .user_agent
            .as_deref()
            .filter(|ua| !ua.trim().is_empty());

        FeatureVector {
            text_length: len,
            word_count: words.len(),
            avg_word_length: word_chars as f64 / words.len().max(1) as f64,
            url_count: urls.len(),
            has_url: !urls.is_empty(),
            url_to_text_ratio: url_chars as f64 / denom,
            unique_domains,
            has_suspicious_tld: any_suspicious_tld,
            spam_keyword_count,
            has_spam_keywords: spam_keyword_count > 0,
            special_char_ratio: special as f64 / denom,
            uppercase_ratio: upper as f64 / denom,
            digit_ratio: digits as f64 / denom,
            exclamation_count: content.matches('!').count(),
            question_count: content.matches('?').count(),
            has_html: HTML_PATTERN.is_match(content),
            has_email: email.is_some(),
            email_domain_suspicious,
            email_length: email.map(|e| e.chars().count()).unwrap_or(0),
            author_length: author.chars().count(),
            author_has_numbers: author.chars().any(|c| c.is_ascii_digit()),
            author_all_caps,
            has_author_url: author_url.is_some(),
            author_url_suspicious_tld,
            hour_of_day: hour,
            is_night_time: hour < 6,
            has_user_agent: user_agent.is_some(),
            is_bot: user_agent.map(|ua| BOT_PATTERN.is_match(ua)).unwrap_or(false),
        }
    }

    /// Extract many comments in parallel, preserving order
    pub fn extract_batch(&self, comments: &[CommentRecord]) -> Vec<FeatureVector> {
        comments.par_iter().map(|c| self.extract(c)).collect()
    }

    /// Privacy-preserving identifiers for log correlation
    pub fn fingerprint(&self, comment: &CommentRecord) -> CommentFingerprint {
        CommentFingerprint {
            ip_hash: short_digest(&comment.author_ip),
            email_hash: comment
                .author_email
                .as_deref()
                .map(|e| short_digest(&e.to_lowercase())),
        }
    }
}

/// Total keyword occurrences in the lowercased text
pub fn count_keywords(content: &str) -> usize {
    let lowered = content.to_lowercase();
    SPAM_KEYWORDS
        .iter()
        .map(|keyword| lowered.matches(keyword).count())
        .sum()
}

/// Sentence punctuation following a link is not part of it.
fn trim_url(raw: &str) -> &str {
    raw.trim_end_matches(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '}'))
}

fn url_host(raw: &str) -> Option<String> {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
}

fn has_suspicious_tld(host: &str) -> bool {
    SUSPICIOUS_TLDS.iter().any(|tld| host.ends_with(tld))
}

fn short_digest(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn extractor_at(hour: u32) -> FeatureExtractor {
        let instant = Utc.with_ymd_and_hms(2024, 3, 14, hour, 30, 0).unwrap();
        FeatureExtractor::new(Arc::new(FixedClock(instant)))
    }

    #[test]
    fn test_extract_spam_comment() {
        let comment = CommentRecord::new(
            "BUY VIAGRA NOW http://x.ru http://y.cn",
            "Spammer",
            "203.0.113.9",
            1,
        );
        let features = extractor_at(12).extract(&comment);

        assert_eq!(features.text_length, 38);
        assert_eq!(features.word_count, 5);
        assert_eq!(features.url_count, 2);
        assert!(features.has_url);
        assert_eq!(features.unique_domains, 2);
        assert!(features.has_suspicious_tld);
        assert_eq!(features.spam_keyword_count, 1);
        assert!(features.has_spam_keywords);
        assert!(!features.has_user_agent);
        assert!(!features.is_bot);
        assert_eq!(features.hour_of_day, 12);
        assert!(!features.is_night_time);
    }

    #[test]
    fn test_keyword_occurrences_are_counted() {
        assert_eq!(count_keywords("Casino casino CASINO"), 3);
        assert_eq!(count_keywords("Buy now, click here for crypto"), 3);
        assert_eq!(count_keywords("a perfectly ordinary sentence"), 0);
    }

    #[test]
    fn test_author_and_email_features() {
        let comment = CommentRecord::new("hello", "JOHN99", "10.0.0.1", 1)
            .with_email("x@Mailinator.com")
            .with_url("https://cheap.example.tk/path")
            .with_user_agent("Googlebot/2.1");
        let features = extractor_at(3).extract(&comment);

        assert!(features.has_email);
        assert!(features.email_domain_suspicious);
        assert_eq!(features.email_length, 16);
        assert!(features.author_has_numbers);
        assert!(features.author_all_caps);
        assert!(features.has_author_url);
        assert!(features.author_url_suspicious_tld);
        assert!(features.is_night_time);
        assert!(features.has_user_agent);
        assert!(features.is_bot);
    }

    #[test]
    fn test_author_url_with_suspicious_tld() {
        let extractor = extractor_at(12);
        let flagged = CommentRecord::new("hello", "a", "ip", 1).with_url("http://me.tk");
        let plain = CommentRecord::new("hello", "a", "ip", 1).with_url("https://me.example.org");
        assert!(extractor.extract(&flagged).author_url_suspicious_tld);
        assert!(!extractor.extract(&plain).author_url_suspicious_tld);
    }

    #[test]
    fn test_trailing_punctuation_is_not_part_of_link() {
        let extractor = extractor_at(12);
        for content in [
            "visit http://spam.ru, now",
            "see http://spam.ru! now",
            "go (http://spam.cn)",
            "is it http://spam.cn?",
            "end of sentence http://spam.ru.",
        ] {
            let features = extractor.extract(&CommentRecord::new(content, "a", "ip", 1));
            assert_eq!(features.url_count, 1, "{}", content);
            assert_eq!(features.unique_domains, 1, "{}", content);
            assert!(features.has_suspicious_tld, "{}", content);
        }
        assert_eq!(trim_url("http://a.com/path?x=1."), "http://a.com/path?x=1");
    }

    #[test]
    fn test_author_without_letters_is_not_all_caps() {
        let comment = CommentRecord::new("hello", "1234", "10.0.0.1", 1);
        assert!(!extractor_at(12).extract(&comment).author_all_caps);
    }

    #[test]
    fn test_html_detection() {
        let extractor = extractor_at(12);
        let html = CommentRecord::new("see <a href='http://x'>this</a>", "a", "ip", 1);
        let plain = CommentRecord::new("2 < 3 and 4 > 1", "a", "ip", 1);
        assert!(extractor.extract(&html).has_html);
        assert!(!extractor.extract(&plain).has_html);
    }

    #[test]
    fn test_empty_user_agent_is_missing() {
        let comment = CommentRecord::new("hello", "a", "ip", 1).with_user_agent("  ");
        assert!(!extractor_at(12).extract(&comment).has_user_agent);
    }

    #[test]
    fn test_array_roundtrip_and_named() {
        let comment = CommentRecord::new("Check http://a.com now!", "Bob", "ip", 1)
            .with_user_agent("Mozilla/5.0");
        let features = extractor_at(8).extract(&comment);
        assert_eq!(FeatureVector::from_array(&features.to_array()), features);

        let named = FeatureVector::from_named([
            ("url_count", 4.0),
            ("is_bot", 1.0),
            ("not_a_feature", 99.0),
        ]);
        assert_eq!(named.url_count, 4);
        assert!(named.is_bot);
        assert_eq!(named.text_length, 0);
        assert_eq!(named.get("url_count"), Some(4.0));
        assert_eq!(named.get("not_a_feature"), None);
    }

    #[test]
    fn test_fingerprint_is_truncated_digest() {
        let comment = CommentRecord::new("hi", "a", "192.0.2.1", 1).with_email("A@b.com");
        let fp = extractor_at(12).fingerprint(&comment);
        assert_eq!(fp.ip_hash.len(), 16);
        assert_ne!(fp.ip_hash, "192.0.2.1");
        assert_eq!(fp.email_hash.as_ref().map(|h| h.len()), Some(16));
    }

    #[test]
    fn test_batch_matches_single() {
        let extractor = extractor_at(12);
        let comments = vec![
            CommentRecord::new("one", "a", "ip", 1),
            CommentRecord::new("two http://b.cn", "b", "ip", 2),
        ];
        let batch = extractor.extract_batch(&comments);
        assert_eq!(batch[0], extractor.extract(&comments[0]));
        assert_eq!(batch[1], extractor.extract(&comments[1]));
    }
}
