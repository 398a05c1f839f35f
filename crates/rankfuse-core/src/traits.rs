use crate::error::Result;
use crate::types::SearchHit;

/// External embedding provider. Treated as a pure function of its input.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Ranks documents for a free-text query.
pub trait TextSearcher {
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// Ranks documents for an already embedded query.
pub trait VectorSearcher {
    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}
