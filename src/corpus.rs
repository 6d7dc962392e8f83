//! Corpus loading: raw segment records to validated, indexable segments.
//!
//! Raw records come from the docs build pipeline as a JSON array. Two
//! paragraph shapes exist in the wild: a tagged `{"type": "p"|"code",
//! "text": "..."}` object and a bare string (older generator output, always
//! prose). Both are accepted at the boundary and converted to the strict
//! [`Paragraph`] type here; everything downstream sees only validated data.

use crate::error::BuildError;
use crate::search::strip_markup;
use serde::Deserialize;
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

/// Separator between hashed anchor components. Cannot occur in either a
/// path or a title, so distinct breadcrumbs never collide by concatenation.
const ANCHOR_SEPARATOR: u8 = 0x1f;

/// A raw segment record as found in the corpus JSON.
#[derive(Debug, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    titles: Vec<String>,
    #[serde(default)]
    paragraphs: Vec<RawParagraph>,
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawParagraph {
    Tagged {
        #[serde(rename = "type")]
        kind: RawParagraphKind,
        text: String,
    },
    Bare(String),
}

#[derive(Debug, Deserialize)]
enum RawParagraphKind {
    #[serde(rename = "p")]
    Prose,
    #[serde(rename = "code")]
    Code,
}

/// Whether a paragraph holds prose or a code block. Prose matches carry more
/// ranking weight and make better snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphKind {
    Prose,
    Code,
}

/// One paragraph of a segment, keeping both the original markup-bearing text
/// (for faithful excerpt rendering) and its plain-text projection (the only
/// form the tokenizer and snippet extractor ever read). The projection is
/// computed once at load time; the query path never parses markup.
#[derive(Debug, Clone)]
pub struct Paragraph {
    pub kind: ParagraphKind,
    /// Original text. May embed markup; never trust as plain text.
    pub text: String,
    /// Plain-text projection of `text`.
    pub plain: String,
}

/// One indexable documentation section: a breadcrumb of titles, the page
/// path, and the section's paragraphs.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Snapshot-local identifier, assigned in load order. Not stable across
    /// rebuilds; use [`Segment::anchor`] for cross-build identity.
    pub id: u32,
    /// Canonical page URL. Not unique: each section of a page is its own
    /// segment sharing the page's path.
    pub path: String,
    /// Breadcrumb from the page's top-level heading down to the section
    /// heading, outermost first. Never empty.
    pub titles: Vec<String>,
    /// Plain-text projections of `titles`, same order.
    pub titles_plain: Vec<String>,
    pub paragraphs: Vec<Paragraph>,
    /// Content-derived identity: xxh3 of path and breadcrumb. Stable across
    /// rebuilds of the same record, unlike `id`.
    pub anchor: u64,
}

impl Segment {
    fn from_raw(id: u32, raw: RawSegment) -> Self {
        let titles_plain = raw.titles.iter().map(|t| strip_markup(t)).collect();
        let paragraphs = raw
            .paragraphs
            .into_iter()
            .map(|p| {
                let (kind, text) = match p {
                    RawParagraph::Tagged {
                        kind: RawParagraphKind::Code,
                        text,
                    } => (ParagraphKind::Code, text),
                    RawParagraph::Tagged {
                        kind: RawParagraphKind::Prose,
                        text,
                    } => (ParagraphKind::Prose, text),
                    RawParagraph::Bare(text) => (ParagraphKind::Prose, text),
                };
                let plain = strip_markup(&text);
                Paragraph { kind, text, plain }
            })
            .collect();
        let anchor = anchor_hash(&raw.path, &raw.titles);
        Self {
            id,
            path: raw.path,
            titles: raw.titles,
            titles_plain,
            paragraphs,
            anchor,
        }
    }

    /// The rendered-page link for this segment: `.md` becomes `.html`, a
    /// leading `/` becomes the `documentation/` prefix, and sub-page
    /// segments get a fragment for their deepest heading.
    pub fn href(&self) -> String {
        let mut href = page_href(&self.path);
        if self.titles.len() > 1
            && let Some(last) = self.titles_plain.last()
        {
            href.push('#');
            href.push_str(&heading_slug(last));
        }
        href
    }
}

/// Map a corpus path like `/language/aggregates.md` to its rendered page
/// `documentation/language/aggregates.html`.
pub fn page_href(path: &str) -> String {
    let html = path.strip_suffix(".md").map_or_else(
        || path.to_string(),
        |stripped| format!("{stripped}.html"),
    );
    html.strip_prefix('/')
        .map_or(html.clone(), |rest| format!("documentation/{rest}"))
}

/// Slugify a heading the way the docs renderer does: lowercase, with every
/// run of non-word characters collapsed to a single dash.
pub fn heading_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn anchor_hash(path: &str, titles: &[String]) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(path.as_bytes());
    for title in titles {
        hasher.update(&[ANCHOR_SEPARATOR]);
        hasher.update(title.as_bytes());
    }
    hasher.digest()
}

/// The validated, ordered collection of segments for one index build.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    segments: Vec<Segment>,
    dropped: usize,
}

impl Corpus {
    /// Validate and normalize raw records into a corpus.
    ///
    /// Records with an empty path or no titles are dropped with a warning;
    /// a record-level problem never fails the load.
    pub fn from_records(records: Vec<RawSegment>) -> Self {
        let mut segments: Vec<Segment> = Vec::with_capacity(records.len());
        let mut dropped = 0usize;
        for record in records {
            if record.path.is_empty() || record.titles.is_empty() {
                dropped += 1;
                tracing::warn!(
                    path = %record.path,
                    titles = record.titles.len(),
                    "dropping segment record that failed validation"
                );
                continue;
            }
            let id = segments.len() as u32;
            segments.push(Segment::from_raw(id, record));
        }
        tracing::info!(
            segments = segments.len(),
            dropped,
            "corpus loaded and validated"
        );
        Self { segments, dropped }
    }

    /// Parse a corpus from raw JSON bytes. `origin` is only used in error
    /// messages.
    ///
    /// Only a file that is not a JSON array at all fails the load. A record
    /// with an unexpected shape is dropped and counted like any other
    /// validation failure.
    pub fn from_json_slice(bytes: &[u8], origin: &Path) -> Result<Self, BuildError> {
        let values: Vec<serde_json::Value> =
            serde_json::from_slice(bytes).map_err(|source| BuildError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;

        let mut malformed = 0usize;
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<RawSegment>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    malformed += 1;
                    tracing::warn!(error = %e, "dropping structurally invalid segment record");
                }
            }
        }

        let mut corpus = Self::from_records(records);
        corpus.dropped += malformed;
        Ok(corpus)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, id: u32) -> Option<&Segment> {
        self.segments.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// How many raw records failed validation during the load.
    pub fn dropped_records(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    fn corpus_from_json(json: &str) -> Corpus {
        Corpus::from_json_slice(json.as_bytes(), Path::new("test.json")).unwrap()
    }

    #[test]
    fn accepts_both_paragraph_shapes() {
        let corpus = corpus_from_json(
            r#"[{
                "titles": ["Aggregates"],
                "paragraphs": [
                    "bare string paragraph",
                    {"type": "p", "text": "tagged prose"},
                    {"type": "code", "text": "count() > 1"}
                ],
                "path": "/language/aggregates.md"
            }]"#,
        );
        let segment = corpus.get(0).unwrap();
        check!(segment.paragraphs.len() == 3);
        check!(segment.paragraphs[0].kind == ParagraphKind::Prose);
        check!(segment.paragraphs[1].kind == ParagraphKind::Prose);
        check!(segment.paragraphs[2].kind == ParagraphKind::Code);
    }

    #[test]
    fn invalid_records_dropped_not_fatal() {
        let corpus = corpus_from_json(
            r#"[
                {"titles": [], "paragraphs": [], "path": "/no-titles.md"},
                {"titles": ["No Path"], "paragraphs": []},
                {"titles": ["Kept"], "paragraphs": [], "path": "/kept.md"}
            ]"#,
        );
        check!(corpus.len() == 1);
        check!(corpus.dropped_records() == 2);
        check!(corpus.get(0).unwrap().path == "/kept.md");
    }

    #[test]
    fn structurally_invalid_record_dropped_not_fatal() {
        let corpus = corpus_from_json(
            r#"[
                {"titles": ["Odd"], "paragraphs": [{"text": "missing type tag", "type": "h1"}], "path": "/odd.md"},
                {"titles": ["Kept"], "paragraphs": [], "path": "/kept.md"}
            ]"#,
        );
        check!(corpus.len() == 1);
        check!(corpus.dropped_records() == 1);
    }

    #[test]
    fn ids_assigned_in_load_order() {
        let corpus = corpus_from_json(
            r#"[
                {"titles": ["A"], "paragraphs": [], "path": "/a.md"},
                {"titles": ["B"], "paragraphs": [], "path": "/b.md"}
            ]"#,
        );
        check!(corpus.get(0).unwrap().path == "/a.md");
        check!(corpus.get(1).unwrap().path == "/b.md");
    }

    #[test]
    fn projection_precomputed_at_load() {
        let corpus = corpus_from_json(
            r#"[{
                "titles": ["Links"],
                "paragraphs": [{"type": "p", "text": "see <a href=\"/x.md\">the docs</a> &amp; more"}],
                "path": "/links.md"
            }]"#,
        );
        let paragraph = &corpus.get(0).unwrap().paragraphs[0];
        check!(paragraph.plain.contains("the docs"));
        check!(paragraph.plain.contains("& more"));
        check!(!paragraph.plain.contains('<'));
        // original markup retained alongside the projection
        check!(paragraph.text.contains("<a href"));
    }

    #[test]
    fn anchor_stable_across_rebuilds_and_distinct_per_breadcrumb() {
        let json = r#"[
            {"titles": ["Page", "Section A"], "paragraphs": [], "path": "/page.md"},
            {"titles": ["Page", "Section B"], "paragraphs": [], "path": "/page.md"}
        ]"#;
        let first = corpus_from_json(json);
        let second = corpus_from_json(json);
        check!(first.get(0).unwrap().anchor == second.get(0).unwrap().anchor);
        // same path, different breadcrumb: individually addressable
        check!(first.get(0).unwrap().anchor != first.get(1).unwrap().anchor);
    }

    #[rstest]
    #[case("/language/aggregates.md", "documentation/language/aggregates.html")]
    #[case("relative.md", "relative.html")]
    #[case("/no-extension", "documentation/no-extension")]
    fn page_href_cases(#[case] path: &str, #[case] expected: &str) {
        check!(page_href(path) == expected);
    }

    #[rstest]
    #[case("Distinct Counts", "distinct-counts")]
    #[case("Option 2: Service Account", "option-2-service-account")]
    #[case("group_by", "group_by")]
    fn heading_slug_cases(#[case] title: &str, #[case] expected: &str) {
        check!(heading_slug(title) == expected);
    }

    #[test]
    fn sub_page_segment_href_carries_fragment() {
        let corpus = corpus_from_json(
            r#"[
                {"titles": ["Aggregates"], "paragraphs": [], "path": "/language/aggregates.md"},
                {"titles": ["Aggregates", "Distinct Counts"], "paragraphs": [], "path": "/language/aggregates.md"}
            ]"#,
        );
        check!(corpus.get(0).unwrap().href() == "documentation/language/aggregates.html");
        check!(
            corpus.get(1).unwrap().href()
                == "documentation/language/aggregates.html#distinct-counts"
        );
    }
}
