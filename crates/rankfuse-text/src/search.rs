use std::collections::HashMap;

use rankfuse_core::traits::TextSearcher;
use rankfuse_core::{DocId, Result, SearchHit};

use crate::index::InvertedIndex;

impl InvertedIndex {
    /// Sum of per-token BM25 scores over every document sharing at least one
    /// query token, best first. Repeated query tokens contribute once each.
    pub fn bm25_search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let tokens = self.normalizer().tokens(query);
        let mut order: Vec<DocId> = Vec::new();
        let mut totals: HashMap<DocId, f64> = HashMap::new();
        for token in &tokens {
            let Some(ids) = self.postings(token) else { continue };
            for &id in ids {
                let score = self.token_bm25(id, token);
                totals
                    .entry(id)
                    .and_modify(|s| *s += score)
                    .or_insert_with(|| {
                        order.push(id);
                        score
                    });
            }
        }

        let mut hits: Vec<SearchHit> = order.into_iter().map(|id| SearchHit::text(id, totals[&id])).collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        tracing::debug!(query, tokens = tokens.len(), hits = hits.len(), "bm25 search");
        hits
    }
}

impl TextSearcher for InvertedIndex {
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        Ok(self.bm25_search(query, k))
    }
}
