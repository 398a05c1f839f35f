use rankfuse_core::config::FusionSettings;
use rankfuse_core::traits::{Embedder, TextSearcher, VectorSearcher};
use rankfuse_core::{Corpus, Error, Result, ScoredResult, SearchHit};
use rankfuse_vector::embed_query;

use crate::fusion::{rrf_fusion, weighted_fusion};

/// Runs one lexical and one semantic ranker over the same corpus and fuses
/// their output. Both rankers over-fetch `limit * fusion.overfetch`
/// candidates so a document one of them buries can still surface.
pub struct HybridSearchEngine<TI, VI>
where
    TI: TextSearcher,
    VI: VectorSearcher,
{
    corpus: Corpus,
    text: TI,
    vector: VI,
    embedder: Box<dyn Embedder>,
    fusion: FusionSettings,
}

impl<TI, VI> HybridSearchEngine<TI, VI>
where
    TI: TextSearcher,
    VI: VectorSearcher,
{
    pub fn new(corpus: Corpus, text: TI, vector: VI, embedder: Box<dyn Embedder>, fusion: FusionSettings) -> Self {
        Self { corpus, text, vector, embedder, fusion }
    }

    pub fn corpus(&self) -> &Corpus { &self.corpus }

    pub fn text(&self) -> &TI { &self.text }

    pub fn vector(&self) -> &VI { &self.vector }

    pub fn fusion(&self) -> FusionSettings { self.fusion }

    pub fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let q_vec = embed_query(self.embedder.as_ref(), query)?;
        self.vector.search_vec(&q_vec, limit)
    }

    fn candidates(&self, query: &str, limit: usize) -> Result<(Vec<SearchHit>, Vec<SearchHit>)> {
        let fetch = limit.saturating_mul(self.fusion.overfetch);
        let lexical = self.text.search(query, fetch)?;
        let semantic = self.semantic_search(query, fetch)?;
        tracing::debug!(query, fetch, lexical = lexical.len(), semantic = semantic.len(), "fusion candidates");
        Ok((lexical, semantic))
    }

    /// `alpha * lexical + (1 - alpha) * semantic` over min-max normalized
    /// scores; `alpha = 1` is pure lexical.
    pub fn weighted_search(&self, query: &str, alpha: f64, limit: usize) -> Result<Vec<ScoredResult<'_>>> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(Error::InvalidInput(format!("alpha must be in [0, 1], got {alpha}")));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let (lexical, semantic) = self.candidates(query, limit)?;
        Ok(weighted_fusion(&lexical, &semantic, alpha, limit, |id| self.corpus.get(id)))
    }

    /// Reciprocal Rank Fusion with smoothing constant `k`.
    pub fn rrf_search(&self, query: &str, k: f64, limit: usize) -> Result<Vec<ScoredResult<'_>>> {
        if !(k >= 0.0 && k.is_finite()) {
            return Err(Error::InvalidInput(format!("rrf k must be a non-negative number, got {k}")));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let (lexical, semantic) = self.candidates(query, limit)?;
        Ok(rrf_fusion(&lexical, &semantic, k, limit, |id| self.corpus.get(id)))
    }
}
