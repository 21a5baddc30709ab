//! Tag key normalization.
//!
//! Turns an arbitrary resource display name into a canonical, platform-safe
//! tag key. Normalization is a pure function of its input: the same name
//! always yields the same key.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from tag key normalization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The name is empty or whitespace-only; the resource has no basis
    /// for a tag and must be skipped.
    #[error("resource has no usable name")]
    NoName,
}

/// Platform tag-key constraints, injected rather than hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagKeyConstraints {
    /// Maximum key length in characters.
    pub max_len: usize,
    /// Characters allowed in addition to alphanumerics and `-`.
    #[serde(default)]
    pub extra_allowed: Vec<char>,
}

impl Default for TagKeyConstraints {
    fn default() -> Self {
        // AWS tag keys: 128 characters.
        Self {
            max_len: 128,
            extra_allowed: Vec::new(),
        }
    }
}

impl TagKeyConstraints {
    fn is_allowed(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || self.extra_allowed.contains(&c)
    }
}

/// A normalized tag key, guaranteed non-empty and within constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TagKey(String);

impl TagKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TagKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a raw display name into a tag key.
///
/// Surrounding whitespace is trimmed; an empty result fails with
/// [`NormalizationError::NoName`]. Runs of inner whitespace collapse to a
/// single `-`, every other disallowed character is replaced one-for-one
/// with `-`, and the result is truncated to the maximum key length.
/// Truncation is the only lossy step.
pub fn normalize(
    raw_name: &str,
    constraints: &TagKeyConstraints,
) -> Result<TagKey, NormalizationError> {
    let trimmed = raw_name.trim();
    if trimmed.is_empty() {
        return Err(NormalizationError::NoName);
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_whitespace = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('-');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if constraints.is_allowed(c) {
            out.push(c);
        } else {
            out.push('-');
        }
    }

    let key: String = out.chars().take(constraints.max_len).collect();
    Ok(TagKey(key))
}
