//! Ranking and snippet configuration.
//!
//! All knobs have defaults that work for a documentation corpus of a few
//! hundred segments. A TOML file can override any subset:
//!
//! ```toml
//! title_weight = 5.0
//! phrase_bonus = 2.0
//! snippet_max_chars = 160
//! ```

use crate::search::Field;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Tunable parameters for ranking and snippet extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Weight applied to BM25 contributions from title (breadcrumb) matches.
    /// Breadcrumbs name the concept a user is searching for, so this is the
    /// strongest positive signal.
    pub title_weight: f32,
    /// Weight applied to prose paragraph matches.
    pub body_weight: f32,
    /// Weight applied to code paragraph matches.
    pub code_weight: f32,
    /// Flat score added when a query term appears as a substring of a
    /// segment's breadcrumb text, even if it is not a whole indexed token.
    pub title_contains_bonus: f32,
    /// Multiplier applied to phrase-clause contributions over what the same
    /// terms would score independently.
    pub phrase_bonus: f32,
    /// Upper bound on snippet length, in characters of plain text.
    pub snippet_max_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            title_weight: 5.0,
            body_weight: 1.0,
            code_weight: 0.25,
            title_contains_bonus: 5.0,
            phrase_bonus: 2.0,
            snippet_max_chars: 160,
        }
    }
}

impl SearchConfig {
    /// The per-field ranking weight. Invariant: title > body > code.
    pub fn field_weight(&self, field: Field) -> f32 {
        match field {
            Field::Title => self.title_weight,
            Field::Body => self.body_weight,
            Field::Code => self.code_weight,
        }
    }

    /// Load overrides from a TOML file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }
}
