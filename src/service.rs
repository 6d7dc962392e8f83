//! The search service: owns the corpus/index snapshot and serves queries.
//!
//! Lifecycle is `Empty → Building → Ready`, and on rebuild `Ready →
//! Building → Ready`; never `Ready → Empty`. A build constructs its entire
//! snapshot off-lock and publishes it with a single pointer swap, so an
//! in-flight query — which clones the current `Arc` once up front — always
//! sees one consistent, fully built index from start to finish. The query
//! path takes no locks beyond that initial clone and mutates nothing.

use crate::config::SearchConfig;
use crate::corpus::Corpus;
use crate::error::{BuildFailure, SearchError};
use crate::search::{InvertedIndex, Ranker, build_index, extract_snippet, parse_query};
use parking_lot::RwLock;
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// One immutable corpus + index pair.
pub(crate) struct Snapshot {
    pub(crate) corpus: Corpus,
    pub(crate) index: InvertedIndex,
}

/// Where the service is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// No build has ever completed.
    Empty,
    /// A build is in flight. A previous snapshot, if any, keeps serving.
    Building,
    /// A snapshot is published and serving.
    Ready,
}

/// Summary of one completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub segments: usize,
    /// Raw records dropped during corpus validation.
    pub dropped: usize,
    pub terms: usize,
    pub elapsed: Duration,
}

/// One search hit, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub titles: Vec<String>,
    /// Escaped excerpt with highlight marks; empty for title-only matches,
    /// where callers fall back to showing the breadcrumb.
    pub snippet: String,
    pub score: f32,
    /// Rendered-page link, with a heading fragment for sub-page segments.
    pub href: String,
    /// Content-derived segment identity, stable across rebuilds.
    #[serde(skip)]
    pub anchor: u64,
}

/// A ranked result list. Always well-formed: an empty or unmatched query
/// yields an empty list, and a deadline expiry yields whatever was ranked
/// in time with `partial` set — neither is an error.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub partial: bool,
}

impl SearchResults {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            partial: false,
        }
    }
}

/// Stateless query facade over the current snapshot.
pub struct SearchService {
    config: SearchConfig,
    current: RwLock<Option<Arc<Snapshot>>>,
    building: AtomicBool,
}

impl Default for SearchService {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl SearchService {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            building: AtomicBool::new(false),
        }
    }

    /// Build and publish a new snapshot from the corpus.
    ///
    /// Synchronous and possibly long-running. The snapshot is constructed
    /// entirely before publication; on failure the previous snapshot (if
    /// any) keeps serving and the error is reported to the caller.
    pub fn build(&self, corpus: Corpus) -> Result<BuildReport, BuildFailure> {
        self.building.store(true, Ordering::SeqCst);
        let started = Instant::now();

        let built = catch_unwind(AssertUnwindSafe(|| build_index(&corpus)));
        let index = match built {
            Ok(index) => index,
            Err(panic) => {
                self.building.store(false, Ordering::SeqCst);
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "index construction panicked".to_string());
                tracing::error!(reason = %reason, "discarding failed index build");
                return Err(BuildFailure { reason });
            }
        };

        let report = BuildReport {
            segments: corpus.len(),
            dropped: corpus.dropped_records(),
            terms: index.term_count(),
            elapsed: started.elapsed(),
        };
        self.publish(Snapshot { corpus, index });
        tracing::info!(
            segments = report.segments,
            terms = report.terms,
            elapsed = ?report.elapsed,
            "published new index snapshot"
        );
        Ok(report)
    }

    /// Publish a snapshot from a corpus and a previously built (cached)
    /// index. The caller must have validated that the index was built over
    /// this corpus; see [`crate::cache`].
    pub fn install(&self, corpus: Corpus, index: InvertedIndex) {
        debug_assert_eq!(index.segment_count() as usize, corpus.len());
        self.publish(Snapshot { corpus, index });
        tracing::info!("published snapshot from cached index");
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.current.write() = Some(Arc::new(snapshot));
        self.building.store(false, Ordering::SeqCst);
    }

    /// Run a query against the current snapshot.
    ///
    /// `deadline` bounds ranking time; on expiry the results ranked so far
    /// come back with `partial` set. Fails only with
    /// [`SearchError::NotReady`] before the first successful build.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        deadline: Option<Duration>,
    ) -> Result<SearchResults, SearchError> {
        let snapshot = self
            .current
            .read()
            .clone()
            .ok_or(SearchError::NotReady)?;

        let clauses = parse_query(query);
        if clauses.is_empty() {
            // an empty query is a valid request with a well-defined answer
            return Ok(SearchResults::empty());
        }

        let ranker = Ranker::new(&snapshot.index, &snapshot.corpus, &self.config);
        let ranked = ranker.rank(&clauses, limit, deadline);

        let results = ranked
            .hits
            .iter()
            .filter_map(|hit| {
                let segment = snapshot.corpus.get(hit.segment)?;
                Some(SearchResult {
                    path: segment.path.clone(),
                    titles: segment.titles.clone(),
                    snippet: extract_snippet(segment, &hit.matched_terms, &self.config),
                    score: hit.score,
                    href: segment.href(),
                    anchor: segment.anchor,
                })
            })
            .collect();

        Ok(SearchResults {
            results,
            partial: ranked.partial,
        })
    }

    /// A copy of the currently published index, if any. Used by the cache
    /// layer; query traffic goes through [`SearchService::search`].
    pub fn index(&self) -> Option<InvertedIndex> {
        self.current
            .read()
            .as_ref()
            .map(|snapshot| snapshot.index.clone())
    }

    pub fn status(&self) -> ServiceStatus {
        if self.building.load(Ordering::SeqCst) {
            ServiceStatus::Building
        } else if self.current.read().is_some() {
            ServiceStatus::Ready
        } else {
            ServiceStatus::Empty
        }
    }
}
