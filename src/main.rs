use anyhow::Context;
use clap::Parser;
use docsearch::cli::{Cli, Commands};
use docsearch::corpus::Corpus;
use docsearch::error::BuildError;
use docsearch::{SearchConfig, SearchService, cache};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docsearch::tracing::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus, cache } => build(&corpus, cache.as_deref()).await,
        Commands::Search {
            query,
            corpus,
            limit,
            timeout_ms,
            json,
            cache,
            config,
        } => {
            search(
                &query,
                &corpus,
                limit,
                timeout_ms.map(Duration::from_millis),
                json,
                cache.as_deref(),
                config.as_deref(),
            )
            .await
        }
    }
}

async fn build(corpus_path: &Path, cache_path: Option<&Path>) -> anyhow::Result<()> {
    let corpus = load_corpus(corpus_path).await?;
    let service = SearchService::default();
    let report = service.build(corpus)?;

    println!(
        "indexed {} segments ({} dropped), {} terms in {:?}",
        report.segments, report.dropped, report.terms, report.elapsed
    );

    if let Some(path) = cache_path {
        let index = service
            .index()
            .context("build completed but no index was published")?;
        cache::store(&index, path).await;
        println!("cached index at {}", path.display());
    }
    Ok(())
}

async fn search(
    query: &str,
    corpus_path: &Path,
    limit: usize,
    deadline: Option<Duration>,
    json: bool,
    cache_path: Option<&Path>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::default(),
    };
    let corpus = load_corpus(corpus_path).await?;
    let service = SearchService::new(config);

    let cached = match cache_path {
        Some(path) => cache::load(path, corpus_mtime(corpus_path).await).await,
        None => None,
    };
    match cached {
        Some(index) if index.segment_count() as usize == corpus.len() => {
            service.install(corpus, index);
        }
        _ => {
            service.build(corpus)?;
            if let Some(path) = cache_path
                && let Some(index) = service.index()
            {
                cache::store(&index, path).await;
            }
        }
    }

    let results = service.search(query, limit, deadline)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.results.is_empty() {
        println!("No results");
        return Ok(());
    }
    if results.partial {
        println!("(partial results: ranking deadline exceeded)");
    }
    for result in &results.results {
        println!("{:>7.2}  {}", result.score, result.titles.join(" › "));
        println!("         {}", result.href);
        if !result.snippet.is_empty() {
            println!("         {}", result.snippet);
        }
    }
    Ok(())
}

async fn load_corpus(path: &Path) -> anyhow::Result<Corpus> {
    let bytes = tokio::fs::read(path).await.map_err(|source| BuildError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    Ok(Corpus::from_json_slice(&bytes, path)?)
}

async fn corpus_mtime(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}
