//! Snippet extraction: bounded, highlighted excerpts around query matches.
//!
//! Snippets are cut from the plain-text projection computed at load time,
//! never from raw markup. Output is escaped for direct interpolation into a
//! result page, with matched terms wrapped in the renderer's highlight mark.

use super::tokenize::tokenize;
use crate::config::SearchConfig;
use crate::corpus::{Paragraph, ParagraphKind, Segment};
use ahash::AHashSet;

const HIGHLIGHT_OPEN: &str = "<mark class=\"search-highlight\">";
const HIGHLIGHT_CLOSE: &str = "</mark>";
const ELLIPSIS: &str = "…";

/// Extract a highlighted excerpt for one ranked segment.
///
/// Picks the paragraph with the most distinct matched terms (prose beats
/// code on ties, first paragraph wins otherwise) and windows it around the
/// densest cluster of matches. Returns an empty string when no paragraph
/// matched — a title-only hit, where the caller falls back to showing the
/// breadcrumb alone.
pub fn extract_snippet(segment: &Segment, matched_terms: &[String], config: &SearchConfig) -> String {
    let matched: AHashSet<&str> = matched_terms.iter().map(String::as_str).collect();
    if matched.is_empty() {
        return String::new();
    }
    match best_paragraph(segment, &matched) {
        Some((paragraph, spans)) => {
            render_window(&paragraph.plain, &spans, config.snippet_max_chars)
        }
        None => String::new(),
    }
}

/// The paragraph to excerpt and the byte spans of its matches.
fn best_paragraph<'a>(
    segment: &'a Segment,
    matched: &AHashSet<&str>,
) -> Option<(&'a Paragraph, Vec<(usize, usize)>)> {
    let mut best: Option<(usize, bool, &Paragraph, Vec<(usize, usize)>)> = None;
    for paragraph in &segment.paragraphs {
        let mut distinct: AHashSet<String> = AHashSet::new();
        let mut spans = Vec::new();
        for token in tokenize(&paragraph.plain) {
            if matched.contains(token.text.as_str()) {
                spans.push((token.start, token.end));
                distinct.insert(token.text);
            }
        }
        if spans.is_empty() {
            continue;
        }
        let prose = paragraph.kind == ParagraphKind::Prose;
        let replaces = best
            .as_ref()
            .is_none_or(|(count, was_prose, ..)| (distinct.len(), prose) > (*count, *was_prose));
        if replaces {
            best = Some((distinct.len(), prose, paragraph, spans));
        }
    }
    best.map(|(_, _, paragraph, spans)| (paragraph, spans))
}

/// Cut a window of at most `max_chars` characters around the densest run of
/// match spans and render it with highlights.
fn render_window(plain: &str, spans: &[(usize, usize)], max_chars: usize) -> String {
    // Byte offset of every char boundary, with an end sentinel. Token spans
    // always land on these.
    let boundaries: Vec<usize> = plain
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(plain.len()))
        .collect();
    let char_at = |byte: usize| boundaries.partition_point(|&b| b < byte);
    let total_chars = boundaries.len() - 1;

    let (first, last) = densest_cluster(spans, max_chars, &char_at);
    let cluster_start = char_at(spans[first].0);
    let cluster_end = char_at(spans[last].1);

    // Pad the cluster out to the budget, spilling leftover space to the
    // other side when one side hits the paragraph edge.
    let budget = max_chars.max(cluster_end - cluster_start);
    let mut start_char = cluster_start.saturating_sub((budget - (cluster_end - cluster_start)) / 2);
    let end_char = (start_char + budget).min(total_chars);
    start_char = end_char.saturating_sub(budget);

    let window = (boundaries[start_char], boundaries[end_char]);
    render(plain, window, spans)
}

/// The maximal run of spans `[i..=j]` fitting the char budget with the most
/// matches; earliest run wins ties.
fn densest_cluster(
    spans: &[(usize, usize)],
    max_chars: usize,
    char_at: &impl Fn(usize) -> usize,
) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_count = 0;
    let mut j = 0;
    for i in 0..spans.len() {
        j = j.max(i);
        while j + 1 < spans.len() && char_at(spans[j + 1].1) - char_at(spans[i].0) <= max_chars {
            j += 1;
        }
        if j - i + 1 > best_count {
            best_count = j - i + 1;
            best = (i, j);
        }
    }
    best
}

fn render(plain: &str, window: (usize, usize), spans: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(window.1 - window.0 + 64);
    if window.0 > 0 {
        out.push_str(ELLIPSIS);
    }
    let mut cursor = window.0;
    for &(start, end) in spans {
        if end <= window.0 || start >= window.1 || end <= cursor {
            continue;
        }
        let clipped_start = start.max(cursor);
        let clipped_end = end.min(window.1);
        push_escaped(&mut out, &plain[cursor..clipped_start]);
        out.push_str(HIGHLIGHT_OPEN);
        push_escaped(&mut out, &plain[clipped_start..clipped_end]);
        out.push_str(HIGHLIGHT_CLOSE);
        cursor = clipped_end;
    }
    push_escaped(&mut out, &plain[cursor..window.1]);
    if window.1 < plain.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Escape for safe interpolation into result markup. The projection already
/// had its markup stripped; anything left that looks like markup is data.
fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
