//! Shared fixtures for service-level tests.
//!
//! The sample corpus mirrors the shapes found in a real docs corpus: deep
//! breadcrumbs, code-only sections, heading-only sections, two sections
//! sharing one page path, embedded markup, and an old-style bare-string
//! paragraph.

use docsearch::{Corpus, SearchService};
use rstest::fixture;
use std::path::Path;

pub const CORPUS_JSON: &str = r#"[
    {
        "titles": ["Aggregates", "Basic Syntax", "Distinct Counts"],
        "paragraphs": [
            {"type": "p", "text": "Distinct counts may be used to count the number of distinct values."},
            {"type": "code", "text": "aggregate: flight_count is count(distinct tail_num)"}
        ],
        "path": "/language/aggregates.md"
    },
    {
        "titles": ["SQL Blocks"],
        "paragraphs": [
            {"type": "code", "text": "SELECT count(distinct id) FROM flights"}
        ],
        "path": "/language/sql_blocks.md"
    },
    {
        "titles": ["Expressions"],
        "paragraphs": [
            {"type": "p", "text": "Counts appear in many expressions. A distinct topic is covered elsewhere."}
        ],
        "path": "/language/expressions.md"
    },
    {
        "titles": ["Connecting a Database", "BigQuery"],
        "paragraphs": [
            {"type": "p", "text": "Authenticating to BigQuery can be done via OAuth using your <a href=\"https://cloud.google.com\">Google Cloud account</a>."}
        ],
        "path": "/connection_instructions.md"
    },
    {
        "titles": ["Connecting a Database", "PostgreSQL"],
        "paragraphs": [],
        "path": "/connection_instructions.md"
    },
    {
        "titles": ["Filters"],
        "paragraphs": ["Bare string paragraphs still appear in older corpora."],
        "path": "/language/filters.md"
    }
]"#;

pub fn sample_corpus() -> Corpus {
    Corpus::from_json_slice(CORPUS_JSON.as_bytes(), Path::new("fixture.json")).unwrap()
}

/// A service with the sample corpus built and ready to query.
#[fixture]
pub fn ready_service() -> SearchService {
    let service = SearchService::default();
    service.build(sample_corpus()).unwrap();
    service
}
