//! Sharded index construction.
//!
//! The corpus is partitioned into shards indexed independently (the map
//! phase shares no mutable state), then merged in shard order. Merge order
//! is fixed regardless of how the map phase was scheduled, so the final
//! index content is deterministic; parallelism only changes wall-clock time.

use super::index::{Field, InvertedIndex, Posting};
use super::tokenize::tokenize;
use crate::corpus::{Corpus, ParagraphKind, Segment};
use ahash::AHashMap;
use rayon::prelude::*;
use std::time::Instant;

/// Segments per shard in the parallel map phase.
const SHARD_SIZE: usize = 64;

/// Extra position distance inserted between adjacent titles or paragraphs
/// within one field stream, so a phrase can never match across that boundary.
const STREAM_GAP: u32 = 1;

struct Shard {
    postings: AHashMap<String, Vec<Posting>>,
    field_lengths: Vec<(u32, [u32; 3])>,
}

/// Build an inverted index over the corpus. An empty corpus produces a
/// valid empty index, not an error.
pub fn build_index(corpus: &Corpus) -> InvertedIndex {
    let started = Instant::now();

    let shards: Vec<Shard> = corpus
        .segments()
        .par_chunks(SHARD_SIZE)
        .map(index_shard)
        .collect();
    let index = merge_shards(corpus, shards);

    tracing::info!(
        terms = index.term_count(),
        segments = index.segment_count(),
        elapsed = ?started.elapsed(),
        "built search index"
    );
    index
}

fn index_shard(segments: &[Segment]) -> Shard {
    let mut postings: AHashMap<String, Vec<Posting>> = AHashMap::new();
    let mut field_lengths = Vec::with_capacity(segments.len());

    for segment in segments {
        let mut lengths = [0u32; 3];
        for field in Field::ALL {
            let stream = field_stream(segment, field);
            lengths[field.index()] = stream.len() as u32;
            accumulate(&mut postings, segment.id, field, stream);
        }
        field_lengths.push((segment.id, lengths));
    }

    Shard {
        postings,
        field_lengths,
    }
}

/// The ordered (token, position) stream for one field of one segment.
fn field_stream(segment: &Segment, field: Field) -> Vec<(String, u32)> {
    let mut stream = Vec::new();
    let mut base = 0u32;
    match field {
        Field::Title => {
            for plain in &segment.titles_plain {
                append_tokens(&mut stream, plain, &mut base);
            }
        }
        Field::Body => {
            for paragraph in &segment.paragraphs {
                if paragraph.kind == ParagraphKind::Prose {
                    append_tokens(&mut stream, &paragraph.plain, &mut base);
                }
            }
        }
        Field::Code => {
            for paragraph in &segment.paragraphs {
                if paragraph.kind == ParagraphKind::Code {
                    append_tokens(&mut stream, &paragraph.plain, &mut base);
                }
            }
        }
    }
    stream
}

fn append_tokens(stream: &mut Vec<(String, u32)>, plain: &str, base: &mut u32) {
    let mut highest = None;
    for token in tokenize(plain) {
        highest = Some(token.position);
        stream.push((token.text, *base + token.position));
    }
    if let Some(high) = highest {
        *base += high + 1 + STREAM_GAP;
    }
}

fn accumulate(
    postings: &mut AHashMap<String, Vec<Posting>>,
    segment: u32,
    field: Field,
    stream: Vec<(String, u32)>,
) {
    let mut per_token: AHashMap<String, Vec<u32>> = AHashMap::new();
    for (token, position) in stream {
        per_token.entry(token).or_default().push(position);
    }
    for (token, positions) in per_token {
        postings.entry(token).or_default().push(Posting {
            segment,
            field,
            term_frequency: positions.len() as u32,
            positions,
        });
    }
}

fn merge_shards(corpus: &Corpus, shards: Vec<Shard>) -> InvertedIndex {
    let mut postings: AHashMap<String, Vec<Posting>> = AHashMap::new();
    let mut field_lengths = vec![[0u32; 3]; corpus.len()];

    // Shards partition the id space in order, and within a shard each
    // posting list is already in (segment, field) order, so appending in
    // shard order keeps every merged list sorted.
    for shard in shards {
        for (token, mut list) in shard.postings {
            postings.entry(token).or_default().append(&mut list);
        }
        for (segment, lengths) in shard.field_lengths {
            field_lengths[segment as usize] = lengths;
        }
    }

    // Document frequency: postings are sorted by segment, so distinct
    // segments show up as transitions.
    let mut doc_freq = AHashMap::with_capacity(postings.len());
    for (token, list) in &postings {
        let mut df = 0u32;
        let mut previous = None;
        for posting in list {
            if previous != Some(posting.segment) {
                df += 1;
                previous = Some(posting.segment);
            }
        }
        doc_freq.insert(token.clone(), df);
    }

    let mut avg_field_lengths = [1.0f32; 3];
    for (i, avg) in avg_field_lengths.iter_mut().enumerate() {
        let total: u64 = field_lengths.iter().map(|l| u64::from(l[i])).sum();
        if total > 0 {
            *avg = total as f32 / field_lengths.len() as f32;
        }
    }

    let title_text = corpus
        .segments()
        .iter()
        .map(|s| s.titles_plain.join(" ").to_lowercase())
        .collect();

    InvertedIndex::new(postings, doc_freq, field_lengths, avg_field_lengths, title_text)
}
