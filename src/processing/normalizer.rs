//! Text normalization policy shared by extraction and signal computation

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Text that has been through [`normalize`]: lowercase ASCII alphanumerics
/// separated by single spaces, no leading or trailing space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize raw text.
///
/// Steps: NFKD decomposition, drop non-ASCII and control characters, drop
/// anything that is not alphanumeric or whitespace, collapse whitespace,
/// lowercase. Total and idempotent.
pub fn normalize(raw: &str) -> NormalizedText {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.nfkd() {
        if !c.is_ascii() {
            continue;
        }
        if c.is_ascii_whitespace() {
            pending_space = true;
            continue;
        }
        // Punctuation, underscore and control characters.
        if !c.is_ascii_alphanumeric() {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c.to_ascii_lowercase());
    }

    NormalizedText(out)
}

/// Normalize each line independently, dropping lines that end up empty.
pub fn normalize_lines(raw: &str) -> Vec<NormalizedText> {
    raw.lines()
        .map(normalize)
        .filter(|line| !line.is_empty())
        .collect()
}
