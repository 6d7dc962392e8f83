//! Lexical search over documentation segments.
//!
//! A segment is one documentation section: a breadcrumb of titles, a page
//! path, and the section's paragraphs. This crate validates a corpus of
//! segments, builds an immutable inverted index over it, and serves ranked,
//! snippeted query results through [`SearchService`].

pub mod cache;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod search;
pub mod service;
pub mod tracing;

pub use config::SearchConfig;
pub use corpus::{Corpus, Paragraph, ParagraphKind, Segment};
pub use error::{BuildError, BuildFailure, Result, SearchError};
pub use service::{BuildReport, SearchResult, SearchResults, SearchService, ServiceStatus};
