//! Error handling types and utilities.

use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for docsearch operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods in the binary layer.
pub type Result<T> = anyhow::Result<T>;

/// Error returned by [`SearchService::search`](crate::service::SearchService::search).
///
/// A query that times out is not an error; it is surfaced through the
/// `partial` flag on the result set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// No index has completed building yet. Retryable.
    #[error("no search index is ready yet")]
    NotReady,
    /// The query could not be tokenized at all.
    ///
    /// The tokenizer degrades gracefully on malformed markup and strange
    /// input, so this is practically unreachable; it exists so callers can
    /// distinguish "bad query" from "no results" if that ever changes.
    #[error("query could not be tokenized")]
    InvalidQuery,
}

/// Catastrophic failure during index construction.
///
/// The previous good snapshot, if any, continues serving; the failed build
/// is discarded and never partially published.
#[derive(Debug, Clone, Error)]
#[error("index build failed: {reason}")]
pub struct BuildFailure {
    pub reason: String,
}

/// Error returned when loading or indexing a corpus fails outright.
///
/// Individual malformed records are *not* errors; they are dropped with a
/// warning and counted in the build report.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The corpus file could not be read.
    #[error("failed to read corpus at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The corpus file is not a valid JSON array of segment records.
    #[error("failed to parse corpus at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
