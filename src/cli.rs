use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "Index and search documentation segments", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an index from a segment corpus and report its shape.
    Build {
        /// Corpus file: a JSON array of segment records.
        #[arg(short, long)]
        corpus: PathBuf,
        /// Also write the built index here for warm restarts.
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// Query a corpus and print ranked results.
    Search {
        query: String,
        #[arg(short, long)]
        corpus: PathBuf,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
        /// Soft ranking deadline; expiry returns partial results.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Emit the result list as JSON on stdout.
        #[arg(long)]
        json: bool,
        /// Reuse (or create) a cached index at this path.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// TOML file overriding ranking/snippet defaults.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
