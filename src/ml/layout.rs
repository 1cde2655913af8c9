//! Feature layout: the authoritative order of the comment feature vector.
//!
//! Adding, removing or reordering a field requires bumping
//! [`FEATURE_VERSION`]. Artifacts record the version and hash they were
//! trained against and are refused when either differs.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Feature names in vector order
pub const FEATURE_LAYOUT: &[&str] = &[
    // content (0-2)
    "text_length",
    "word_count",
    "avg_word_length",
    // links (3-7)
    "url_count",
    "has_url",
    "url_to_text_ratio",
    "unique_domains",
    "has_suspicious_tld",
    // keywords (8-9)
    "spam_keyword_count",
    "has_spam_keywords",
    // character mix (10-15)
    "special_char_ratio",
    "uppercase_ratio",
    "digit_ratio",
    "exclamation_count",
    "question_count",
    "has_html",
    // email (16-18)
    "has_email",
    "email_domain_suspicious",
    "email_length",
    // author (19-23)
    "author_length",
    "author_has_numbers",
    "author_all_caps",
    "has_author_url",
    "author_url_suspicious_tld",
    // timing (24-25)
    "hour_of_day",
    "is_night_time",
    // client (26-27)
    "has_user_agent",
    "is_bot",
];

/// Must match `FEATURE_LAYOUT.len()`
pub const FEATURE_COUNT: usize = 28;

/// CRC32 over the version and the ordered field names
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Layout identity recorded alongside each trained artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
        }
    }

    pub fn is_compatible(&self) -> bool {
        *self == Self::current()
    }

    /// Fails with an inference error when this layout is not the running one
    pub fn validate(&self) -> Result<()> {
        let current = Self::current();
        if *self != current {
            return Err(AppError::Inference(format!(
                "Feature layout mismatch: expected v{} ({:08x}), got v{} ({:08x})",
                current.version, current.hash, self.version, self.hash
            )));
        }
        Ok(())
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}
