//! Optional warm-restart cache for built indexes.
//!
//! The on-disk format (postcard) is implementation-defined and carries no
//! compatibility promise. Freshness is keyed on file times alone: an index
//! file older than the corpus it was built from is stale, removed, and
//! rebuilt. Every failure path degrades to a fresh build.

use crate::search::InvertedIndex;
use std::path::Path;
use std::time::SystemTime;

/// Load a cached index if it is newer than the corpus file it serves.
pub async fn load(path: &Path, corpus_mtime: Option<SystemTime>) -> Option<InvertedIndex> {
    let index_mtime = tokio::fs::metadata(path).await.ok()?.modified().ok()?;
    let corpus_mtime = corpus_mtime?;

    if index_mtime.duration_since(corpus_mtime).is_err() {
        tracing::info!(
            file = %path.display(),
            "index cache older than corpus, rebuilding"
        );
        let _ = tokio::fs::remove_file(path).await;
        return None;
    }

    let path = path.to_path_buf();
    // Decoding is CPU-bound; keep it off the async workers.
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).ok()?;
        match postcard::from_bytes(&bytes) {
            Ok(index) => {
                tracing::debug!(file = %path.display(), "loaded cached index");
                Some(index)
            }
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    error = %e,
                    "failed to decode cached index"
                );
                None
            }
        }
    })
    .await
    .ok()?
}

/// Write an index to the cache path.
///
/// Uses `create_new` so a concurrent writer cannot clobber a file another
/// process just produced; losing that race is fine, the content is the same.
pub async fn store(index: &InvertedIndex, path: &Path) {
    let path = path.to_path_buf();
    let index = index.clone();

    tokio::task::spawn_blocking(move || {
        let bytes = match postcard::to_stdvec(&index) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode index for caching");
                return;
            }
        };
        match std::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
        {
            Ok(mut file) => {
                use std::io::Write;
                if let Err(e) = file.write_all(&bytes) {
                    tracing::warn!(file = %path.display(), error = %e, "failed to write index cache");
                    let _ = std::fs::remove_file(&path);
                } else {
                    tracing::debug!(file = %path.display(), "cached index");
                }
            }
            Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists => {
                tracing::warn!(file = %path.display(), error = %e, "failed to create index cache");
            }
            _ => {
                tracing::debug!(file = %path.display(), "index cache already exists");
            }
        }
    })
    .await
    .expect("index cache task panicked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::search::build_index;
    use assert2::check;
    use std::time::Duration;

    fn sample_index() -> InvertedIndex {
        let corpus = Corpus::from_json_slice(
            br#"[{"titles": ["Aggregates"],
                  "paragraphs": [{"type": "p", "text": "distinct counts"}],
                  "path": "/a.md"}]"#,
            Path::new("cache.json"),
        )
        .unwrap();
        build_index(&corpus)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.index");
        let index = sample_index();

        store(&index, &path).await;
        let corpus_mtime = Some(SystemTime::now() - Duration::from_secs(60));
        let loaded = load(&path, corpus_mtime).await.unwrap();

        check!(loaded.term_count() == index.term_count());
        check!(loaded.segment_count() == index.segment_count());
        check!(loaded.postings("distinct").len() == index.postings("distinct").len());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_cache_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.index");
        store(&sample_index(), &path).await;

        // corpus "modified" after the cache was written
        let corpus_mtime = Some(SystemTime::now() + Duration::from_secs(60));
        check!(load(&path, corpus_mtime).await.is_none());
        check!(!path.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_file_and_missing_mtime_miss_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.index");
        check!(load(&path, Some(SystemTime::now())).await.is_none());

        store(&sample_index(), &path).await;
        check!(load(&path, None).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn corrupt_cache_degrades_to_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.index");
        std::fs::write(&path, b"not a postcard payload").unwrap();

        let corpus_mtime = Some(SystemTime::now() - Duration::from_secs(60));
        check!(load(&path, corpus_mtime).await.is_none());
    }
}
