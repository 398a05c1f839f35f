//! Rank fusion over one lexical and one semantic hit list.
//!
//! Both strategies merge by document id, keep each ranker's raw score and
//! 1-based rank on the result for diagnostics, and order ties by first
//! appearance (lexical list first).

use std::collections::HashMap;

use rankfuse_core::{DocId, Document, ScoredResult, SearchHit};

/// Linear rescale to `[0, 1]`. Uniform input (including a single score)
/// maps to all `1.0`.
pub fn min_max_normalize(scores: &[f64]) -> Vec<f64> {
    let Some((min, max)) = min_max(scores) else { return Vec::new() };
    if max == min {
        return vec![1.0; scores.len()];
    }
    let range = max - min;
    scores.iter().map(|s| (s - min) / range).collect()
}

fn min_max(scores: &[f64]) -> Option<(f64, f64)> {
    let first = *scores.first()?;
    Some(scores.iter().fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s))))
}

/// `alpha * lexical + (1 - alpha) * semantic`
pub fn hybrid_score(lexical: f64, semantic: f64, alpha: f64) -> f64 {
    alpha * lexical + (1.0 - alpha) * semantic
}

/// `1 / (k + rank)` for a 1-based rank.
pub fn rrf_contribution(k: f64, rank: usize) -> f64 {
    1.0 / (k + rank as f64)
}

/// Hits best-first (stable on ties) paired with their 1-based rank.
fn ranked(hits: &[SearchHit]) -> Vec<(usize, SearchHit)> {
    let mut sorted = hits.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
    sorted.into_iter().enumerate().map(|(i, h)| (i + 1, h)).collect()
}

/// Keyed accumulator preserving first-seen order.
struct Merger<'a, F> {
    lookup: F,
    results: Vec<ScoredResult<'a>>,
    positions: HashMap<DocId, usize>,
}

impl<'a, F> Merger<'a, F>
where
    F: Fn(DocId) -> Option<&'a Document>,
{
    fn new(lookup: F) -> Self {
        Self { lookup, results: Vec::new(), positions: HashMap::new() }
    }

    fn entry(&mut self, id: DocId) -> Option<&mut ScoredResult<'a>> {
        if let Some(&pos) = self.positions.get(&id) {
            return self.results.get_mut(pos);
        }
        let Some(document) = (self.lookup)(id) else {
            tracing::warn!(id, "ranker returned an id outside the corpus, skipping");
            return None;
        };
        self.positions.insert(id, self.results.len());
        self.results.push(ScoredResult::new(document));
        self.results.last_mut()
    }

    fn add_lexical(&mut self, hits: &[SearchHit]) -> Vec<(usize, SearchHit)> {
        let ranked = ranked(hits);
        for (rank, hit) in &ranked {
            if let Some(r) = self.entry(hit.id) {
                r.keyword_score = Some(hit.score);
                r.bm25_rank = Some(*rank);
            }
        }
        ranked
    }

    fn add_semantic(&mut self, hits: &[SearchHit]) -> Vec<(usize, SearchHit)> {
        let ranked = ranked(hits);
        for (rank, hit) in &ranked {
            if let Some(r) = self.entry(hit.id) {
                r.semantic_score = Some(hit.score);
                r.semantic_rank = Some(*rank);
            }
        }
        ranked
    }

    fn finish<K>(self, key: K, limit: usize) -> Vec<ScoredResult<'a>>
    where
        K: Fn(&ScoredResult<'a>) -> f64,
    {
        let mut results = self.results;
        results.sort_by(|a, b| key(b).total_cmp(&key(a)));
        results.truncate(limit);
        results
    }
}

/// Min-max normalize each list independently, then combine with `alpha`.
/// A document missing from one list contributes `0.0` for that side.
pub fn weighted_fusion<'a, F>(lexical: &[SearchHit], semantic: &[SearchHit], alpha: f64, limit: usize, lookup: F) -> Vec<ScoredResult<'a>>
where
    F: Fn(DocId) -> Option<&'a Document>,
{
    let mut merger = Merger::new(lookup);
    let lexical = merger.add_lexical(lexical);
    let semantic = merger.add_semantic(semantic);

    let lex_norm = min_max_normalize(&lexical.iter().map(|(_, h)| h.score).collect::<Vec<_>>());
    for ((_, hit), norm) in lexical.iter().zip(lex_norm) {
        if let Some(r) = merger.entry(hit.id) {
            r.normalized_keyword = Some(norm);
        }
    }
    let sem_norm = min_max_normalize(&semantic.iter().map(|(_, h)| h.score).collect::<Vec<_>>());
    for ((_, hit), norm) in semantic.iter().zip(sem_norm) {
        if let Some(r) = merger.entry(hit.id) {
            r.normalized_semantic = Some(norm);
        }
    }

    for r in &mut merger.results {
        let score = hybrid_score(r.normalized_keyword.unwrap_or(0.0), r.normalized_semantic.unwrap_or(0.0), alpha);
        r.hybrid_score = Some(score);
    }
    merger.finish(|r| r.hybrid_score.unwrap_or(0.0), limit)
}

/// Reciprocal Rank Fusion: sum of `1 / (k + rank)` over the lists a document
/// appears in.
pub fn rrf_fusion<'a, F>(lexical: &[SearchHit], semantic: &[SearchHit], k: f64, limit: usize, lookup: F) -> Vec<ScoredResult<'a>>
where
    F: Fn(DocId) -> Option<&'a Document>,
{
    let mut merger = Merger::new(lookup);
    merger.add_lexical(lexical);
    merger.add_semantic(semantic);

    for r in &mut merger.results {
        let lex = r.bm25_rank.map_or(0.0, |rank| rrf_contribution(k, rank));
        let sem = r.semantic_rank.map_or(0.0, |rank| rrf_contribution(k, rank));
        r.rrf_score = Some(lex + sem);
    }
    merger.finish(|r| r.rrf_score.unwrap_or(0.0), limit)
}
