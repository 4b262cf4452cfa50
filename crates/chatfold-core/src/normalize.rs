//! Message text normalization for duplicate comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical comparison key derived from raw message text.
///
/// Two raw texts that differ only in letter case or surrounding whitespace
/// map to the same key. The empty key marks text that is not eligible for
/// deduplication; callers must skip processing entirely for it, so unrelated
/// blank messages never collapse into each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase and trim raw text into its comparison key.
///
/// Pure and total; internal whitespace is left untouched and no
/// locale-sensitive folding is applied.
pub fn normalize(raw: &str) -> NormalizedKey {
    NormalizedKey(raw.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["  HeLLo  ", "hello", "HELLO\t", "", "  ", "a  b"] {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn case_and_surrounding_whitespace_are_ignored() {
        assert_eq!(normalize("Hello "), normalize("hello"));
        assert_eq!(normalize("\tGG  "), normalize("gg"));
    }

    #[test]
    fn internal_whitespace_is_preserved() {
        assert_ne!(normalize("a b"), normalize("ab"));
        assert_eq!(normalize("A  B").as_str(), "a  b");
    }

    #[test]
    fn blank_input_maps_to_the_empty_key() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
        assert!(normalize("\n\t").is_empty());
        assert!(!normalize("x").is_empty());
    }
}
