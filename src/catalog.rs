//! Catalog-number extraction ("BWV 846", "K. 525", ...).
//!
//! Classical tracklists often disagree on titles but agree on the catalog
//! identifier, so a shared token is a strong pairing signal. The pattern set
//! is open: callers can add schemes on top of (or instead of) the built-ins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigError, Result};

/// Built-in schemes: Bach, Handel, Vivaldi, Mozart (Köchel).
static BUILTIN_PATTERNS: Lazy<Vec<CatalogPattern>> = Lazy::new(|| {
    vec![
        CatalogPattern::builtin("BWV", r"(?i)\bBWV\.?\s*(\d+[a-z]?)\b"),
        CatalogPattern::builtin("HWV", r"(?i)\bHWV\.?\s*(\d+[a-z]?)\b"),
        CatalogPattern::builtin("RV", r"(?i)\bRV\.?\s*(\d+[a-z]?)\b"),
        CatalogPattern::builtin("KV", r"(?i)\bK(?:V\.?|\.)\s*(\d+[a-z]?)\b"),
    ]
});

/// One cataloguing scheme: a canonical label and a regex whose first capture
/// group is the catalog number.
#[derive(Clone, Debug)]
pub struct CatalogPattern {
    label: String,
    regex: Regex,
}

impl CatalogPattern {
    pub fn new(label: &str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidCatalogPattern {
            label: label.to_string(),
            source,
        })?;
        // captures_len counts the implicit whole-match group
        if regex.captures_len() < 2 {
            return Err(ConfigError::MissingCatalogCapture(label.to_string()));
        }
        Ok(Self {
            label: label.trim().to_uppercase(),
            regex,
        })
    }

    fn builtin(label: &str, pattern: &str) -> Self {
        Self {
            label: label.to_string(),
            regex: Regex::new(pattern).unwrap(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Canonical token ("BWV 846") if `text` carries this scheme.
    pub fn extract(&self, text: &str) -> Option<String> {
        let caps = self.regex.captures(text)?;
        let number = caps.get(1)?.as_str();
        Some(format!("{} {}", self.label, number.to_ascii_uppercase()))
    }
}

/// Ordered set of catalog schemes; the first scheme that matches wins.
#[derive(Clone, Debug)]
pub struct CatalogPatterns {
    patterns: Vec<CatalogPattern>,
}

impl CatalogPatterns {
    /// The built-in schemes only.
    pub fn builtin() -> Self {
        Self {
            patterns: BUILTIN_PATTERNS.clone(),
        }
    }

    /// No schemes at all; every extraction yields `None`.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn push(&mut self, pattern: CatalogPattern) {
        self.patterns.push(pattern);
    }

    /// Add a scheme from a label and regex source.
    pub fn with_pattern(mut self, label: &str, pattern: &str) -> Result<Self> {
        self.push(CatalogPattern::new(label, pattern)?);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(CatalogPattern::label)
    }

    pub fn extract(&self, text: &str) -> Option<String> {
        self.patterns.iter().find_map(|p| p.extract(text))
    }
}

impl Default for CatalogPatterns {
    fn default() -> Self {
        Self::builtin()
    }
}
