//! Full-text search infrastructure for documentation segments.
//!
//! Tokenization, inverted indexing, query parsing, BM25 ranking, and
//! snippet extraction. The service facade in [`crate::service`] wires these
//! together over one immutable snapshot per build.

// Module declarations
pub(crate) mod build;
pub(crate) mod index;
pub(crate) mod query;
pub(crate) mod scoring;
pub(crate) mod snippet;
pub(crate) mod tokenize;

// Public re-exports (used via lib.rs)
pub use build::build_index;
pub use index::{Field, InvertedIndex, Posting};
pub use query::{QueryClause, parse_query};
pub use scoring::{RankedHit, RankedResults, Ranker, bm25};
pub use snippet::extract_snippet;
pub use tokenize::{Token, strip_markup, tokenize, tokenize_markup};
