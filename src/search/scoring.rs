//! BM25 ranking over the inverted index.

use super::index::{Field, InvertedIndex};
use super::query::QueryClause;
use crate::config::SearchConfig;
use crate::corpus::Corpus;
use ahash::{AHashMap, AHashSet};
use std::time::{Duration, Instant};

/// Standard BM25 constants.
pub(crate) const BM25_K1: f32 = 1.2;
pub(crate) const BM25_B: f32 = 0.75;

/// BM25 contribution of one term in one field of one segment.
pub fn bm25(
    term_frequency: f32,
    doc_freq: f32,
    segment_count: f32,
    field_length: f32,
    avg_field_length: f32,
) -> f32 {
    let idf = ((segment_count - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln();
    let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * field_length / avg_field_length);
    idf * (term_frequency * (BM25_K1 + 1.0)) / (term_frequency + norm)
}

/// One scored segment, with the query terms that actually matched it (the
/// snippet extractor highlights these).
#[derive(Debug, Clone)]
pub struct RankedHit {
    pub segment: u32,
    pub score: f32,
    pub matched_terms: Vec<String>,
}

/// Ranked output, truncated to the requested limit.
#[derive(Debug, Clone)]
pub struct RankedResults {
    pub hits: Vec<RankedHit>,
    /// True when a deadline expired mid-evaluation and the hits reflect only
    /// the clauses scored so far.
    pub partial: bool,
}

/// Scores parsed query clauses against one index snapshot.
pub struct Ranker<'a> {
    index: &'a InvertedIndex,
    corpus: &'a Corpus,
    config: &'a SearchConfig,
}

impl<'a> Ranker<'a> {
    pub fn new(index: &'a InvertedIndex, corpus: &'a Corpus, config: &'a SearchConfig) -> Self {
        Self {
            index,
            corpus,
            config,
        }
    }

    /// Rank all segments against the query clauses.
    ///
    /// The deadline is checked between clause evaluations; on expiry the
    /// scores accumulated so far are ranked and returned with `partial`
    /// set. Evaluation never blocks indefinitely.
    pub fn rank(
        &self,
        clauses: &[QueryClause],
        limit: usize,
        deadline: Option<Duration>,
    ) -> RankedResults {
        let started = Instant::now();
        let mut scores: AHashMap<u32, f32> = AHashMap::new();
        let mut matched: AHashMap<u32, AHashSet<&str>> = AHashMap::new();
        let mut partial = false;

        for clause in clauses {
            if let Some(budget) = deadline
                && started.elapsed() >= budget
            {
                partial = true;
                break;
            }
            match clause {
                QueryClause::Term(term) => self.score_term(term, &mut scores, &mut matched),
                QueryClause::Phrase(terms) => self.score_phrase(terms, &mut scores, &mut matched),
            }
        }

        let mut hits: Vec<RankedHit> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(segment, score)| {
                let mut matched_terms: Vec<String> = matched
                    .get(&segment)
                    .into_iter()
                    .flatten()
                    .map(ToString::to_string)
                    .collect();
                matched_terms.sort_unstable();
                RankedHit {
                    segment,
                    score,
                    matched_terms,
                }
            })
            .collect();

        // Deterministic order: score, then shallower breadcrumb, then path,
        // then id. Ties on score are common for heading-only segments.
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| self.tie_key(a.segment).cmp(&self.tie_key(b.segment)))
                .then_with(|| a.segment.cmp(&b.segment))
        });
        hits.truncate(limit);

        RankedResults { hits, partial }
    }

    fn tie_key(&self, segment: u32) -> (usize, &str) {
        self.corpus
            .get(segment)
            .map_or((usize::MAX, ""), |s| (s.titles.len(), s.path.as_str()))
    }

    fn score_term<'q>(
        &self,
        term: &'q str,
        scores: &mut AHashMap<u32, f32>,
        matched: &mut AHashMap<u32, AHashSet<&'q str>>,
    ) {
        let segment_count = self.index.segment_count() as f32;
        let doc_freq = self.index.doc_freq(term) as f32;

        for posting in self.index.postings(term) {
            let contribution = self.config.field_weight(posting.field)
                * bm25(
                    posting.term_frequency as f32,
                    doc_freq,
                    segment_count,
                    self.index.field_length(posting.segment, posting.field) as f32,
                    self.index.avg_field_length(posting.field),
                );
            *scores.entry(posting.segment).or_insert(0.0) += contribution;
            matched.entry(posting.segment).or_default().insert(term);
        }

        // Substring containment against the breadcrumb catches partial
        // words the token index cannot ("distin" still finds "Distinct
        // Counts"). Flat bonus, on top of any exact-token contribution.
        for (segment, title) in self.index.title_texts() {
            if title.contains(term) {
                *scores.entry(segment).or_insert(0.0) += self.config.title_contains_bonus;
                matched.entry(segment).or_default().insert(term);
            }
        }
    }

    fn score_phrase<'q>(
        &self,
        terms: &'q [String],
        scores: &mut AHashMap<u32, f32>,
        matched: &mut AHashMap<u32, AHashSet<&'q str>>,
    ) {
        let Some(first) = terms.first() else { return };
        let segment_count = self.index.segment_count() as f32;

        // Candidates are exactly the (segment, field) coordinates where the
        // first term occurs; the rest of the phrase is verified positionally.
        for posting in self.index.postings(first) {
            let occurrences = self.phrase_occurrences(terms, posting.segment, posting.field);
            if occurrences == 0 {
                continue;
            }

            let field_length = self.index.field_length(posting.segment, posting.field) as f32;
            let avg = self.index.avg_field_length(posting.field);
            let mut contribution = 0.0;
            for term in terms {
                contribution += bm25(
                    occurrences as f32,
                    self.index.doc_freq(term) as f32,
                    segment_count,
                    field_length,
                    avg,
                );
            }
            contribution *= self.config.field_weight(posting.field) * self.config.phrase_bonus;

            *scores.entry(posting.segment).or_insert(0.0) += contribution;
            let terms_matched = matched.entry(posting.segment).or_default();
            for term in terms {
                terms_matched.insert(term.as_str());
            }
        }

        // Whole-phrase containment in the breadcrumb, like single terms.
        let phrase_text = terms.join(" ");
        for (segment, title) in self.index.title_texts() {
            if title.contains(&phrase_text) {
                *scores.entry(segment).or_insert(0.0) += self.config.title_contains_bonus;
                let terms_matched = matched.entry(segment).or_default();
                for term in terms {
                    terms_matched.insert(term.as_str());
                }
            }
        }
    }

    /// Count positions where every phrase term appears contiguously, in
    /// order, within the given field of the given segment.
    fn phrase_occurrences(&self, terms: &[String], segment: u32, field: Field) -> u32 {
        let mut position_lists = Vec::with_capacity(terms.len());
        for term in terms {
            match self.index.posting_for(term, segment, field) {
                Some(posting) => position_lists.push(posting.positions.as_slice()),
                None => return 0,
            }
        }
        let Some((starts, rest)) = position_lists.split_first() else {
            return 0;
        };
        starts
            .iter()
            .filter(|&&start| {
                rest.iter().enumerate().all(|(i, positions)| {
                    positions.binary_search(&(start + 1 + i as u32)).is_ok()
                })
            })
            .count() as u32
    }
}
