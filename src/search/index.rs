//! The immutable inverted index: token postings and field statistics.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Which stream of a segment a posting came from. Field weighting is the
/// main ranking lever: a breadcrumb names the concept a page is about, so
/// title matches outrank body matches, which outrank code matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Title,
    Body,
    Code,
}

impl Field {
    pub(crate) const ALL: [Self; 3] = [Self::Title, Self::Body, Self::Code];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Title => 0,
            Self::Body => 1,
            Self::Code => 2,
        }
    }
}

/// One entry in a token's posting list: where the token occurred and how
/// often. Positions are token ordinals within the segment's field stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub segment: u32,
    pub field: Field,
    pub term_frequency: u32,
    pub positions: Vec<u32>,
}

/// Derived search structure over one corpus. Immutable once built: a rebuild
/// produces an entirely new index, never a mutation of this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvertedIndex {
    /// Token → postings, each list sorted by (segment, field).
    postings: AHashMap<String, Vec<Posting>>,
    /// Token → number of distinct segments containing it in any field.
    doc_freq: AHashMap<String, u32>,
    /// Per-segment token counts, indexed by segment id then [`Field::index`].
    field_lengths: Vec<[u32; 3]>,
    /// Mean field lengths across the corpus, for BM25 normalization.
    avg_field_lengths: [f32; 3],
    /// Lowercased plain breadcrumb text per segment, for substring matching
    /// against partial query terms.
    title_text: Vec<String>,
}

impl InvertedIndex {
    pub(crate) fn new(
        postings: AHashMap<String, Vec<Posting>>,
        doc_freq: AHashMap<String, u32>,
        field_lengths: Vec<[u32; 3]>,
        avg_field_lengths: [f32; 3],
        title_text: Vec<String>,
    ) -> Self {
        debug_assert_eq!(field_lengths.len(), title_text.len());
        Self {
            postings,
            doc_freq,
            field_lengths,
            avg_field_lengths,
            title_text,
        }
    }

    /// Posting list for a token; empty if the token is unknown.
    pub fn postings(&self, token: &str) -> &[Posting] {
        self.postings.get(token).map_or(&[], Vec::as_slice)
    }

    /// The posting for one exact (token, segment, field) coordinate.
    pub fn posting_for(&self, token: &str, segment: u32, field: Field) -> Option<&Posting> {
        let list = self.postings(token);
        list.binary_search_by_key(&(segment, field.index()), |p| (p.segment, p.field.index()))
            .ok()
            .map(|i| &list[i])
    }

    /// Number of distinct segments containing the token in any field.
    pub fn doc_freq(&self, token: &str) -> u32 {
        self.doc_freq.get(token).copied().unwrap_or(0)
    }

    pub fn field_length(&self, segment: u32, field: Field) -> u32 {
        self.field_lengths
            .get(segment as usize)
            .map_or(0, |lengths| lengths[field.index()])
    }

    pub fn avg_field_length(&self, field: Field) -> f32 {
        self.avg_field_lengths[field.index()]
    }

    /// Lowercased breadcrumb text per segment.
    pub(crate) fn title_texts(&self) -> impl Iterator<Item = (u32, &str)> {
        self.title_text
            .iter()
            .enumerate()
            .map(|(id, text)| (id as u32, text.as_str()))
    }

    /// Number of unique tokens in the index.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Number of segments the index was built over.
    pub fn segment_count(&self) -> u32 {
        self.field_lengths.len() as u32
    }
}
