use indicatif::{ProgressBar, ProgressStyle};

use rankfuse_core::traits::{Embedder, VectorSearcher};
use rankfuse_core::{Corpus, Document, Error, Result, SearchHit};

use crate::cache::{load_document_embeddings, save_document_embeddings, EmbeddingPaths};
use crate::similarity::cosine_similarity;

fn progress_bar(len: usize, what: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(what.to_string());
    pb
}

/// Embed `texts` in batches of `batch_size`, checking every vector has the
/// provider's dimension. Provider failures become `Error::Embedding`.
pub fn embed_in_batches(embedder: &dyn Embedder, texts: &[String], batch_size: usize, what: &str) -> Result<Vec<Vec<f32>>> {
    let pb = progress_bar(texts.len(), what);
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = embedder.embed_batch(batch).map_err(|e| Error::Embedding(format!("{e:#}")))?;
        if vectors.len() != batch.len() {
            return Err(Error::Embedding(format!("asked for {} vectors, got {}", batch.len(), vectors.len())));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dim()) {
            return Err(Error::Embedding(format!("expected dimension {}, got {}", embedder.dim(), bad.len())));
        }
        out.extend(vectors);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    Ok(out)
}

/// Embed a search query. Blank queries are rejected before reaching the provider.
pub fn embed_query(embedder: &dyn Embedder, query: &str) -> Result<Vec<f32>> {
    if query.trim().is_empty() {
        return Err(Error::InvalidInput("query must not be empty".to_string()));
    }
    embedder.embed_text(query).map_err(|e| Error::Embedding(format!("{e:#}")))
}

pub(crate) fn check_query_dim(query_vec: &[f32], stored: Option<&Vec<f32>>) -> Result<()> {
    match stored {
        Some(v) if v.len() != query_vec.len() => Err(Error::InvalidInput(format!(
            "query has dimension {}, index has {}",
            query_vec.len(),
            v.len()
        ))),
        _ => Ok(()),
    }
}

/// Sort best first, keeping insertion order among equal scores, and cut to `limit`.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

/// One embedding per document, of `"{title}: {description}"`.
pub struct SemanticIndex {
    corpus: Corpus,
    embeddings: Vec<Vec<f32>>,
}

impl SemanticIndex {
    pub fn new(corpus: Corpus) -> Self { Self { corpus, embeddings: Vec::new() } }

    pub fn corpus(&self) -> &Corpus { &self.corpus }

    pub fn documents(&self) -> &[Document] { self.corpus.documents() }

    pub fn embeddings(&self) -> &[Vec<f32>] { &self.embeddings }

    /// Install precomputed vectors; one per document, in corpus order.
    pub fn set_embeddings(&mut self, embeddings: Vec<Vec<f32>>) -> Result<()> {
        if embeddings.len() != self.corpus.len() {
            return Err(Error::InvalidInput(format!(
                "{} embeddings for {} documents",
                embeddings.len(),
                self.corpus.len()
            )));
        }
        self.embeddings = embeddings;
        Ok(())
    }

    pub fn build_embeddings(&mut self, embedder: &dyn Embedder, batch_size: usize) -> Result<()> {
        let texts: Vec<String> = self.corpus.documents().iter().map(Document::embedding_text).collect();
        self.embeddings = embed_in_batches(embedder, &texts, batch_size, "documents")?;
        tracing::info!(documents = self.embeddings.len(), dim = embedder.dim(), "built document embeddings");
        Ok(())
    }

    /// Reuse cached vectors when their count matches the corpus and their
    /// dimension matches `embedder`, otherwise rebuild and overwrite the cache.
    pub fn load_or_create_embeddings(&mut self, embedder: &dyn Embedder, batch_size: usize, paths: &EmbeddingPaths) -> Result<()> {
        match load_document_embeddings(paths) {
            Ok(cached) if cached.len() != self.corpus.len() => {
                tracing::warn!(cached = cached.len(), documents = self.corpus.len(), "stale document embeddings, rebuilding");
            }
            Ok(cached) if cached.first().is_some_and(|v| v.len() != embedder.dim()) => {
                tracing::warn!(dim = embedder.dim(), "cached document embeddings have another dimension, rebuilding");
            }
            Ok(cached) => {
                tracing::info!(count = cached.len(), "loaded cached document embeddings");
                self.embeddings = cached;
                return Ok(());
            }
            Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.build_embeddings(embedder, batch_size)?;
        save_document_embeddings(paths, &self.embeddings)
    }

    /// Rank documents by cosine similarity to `query_vec`.
    pub fn search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if self.embeddings.is_empty() && !self.corpus.is_empty() {
            return Err(Error::InvalidInput("no document embeddings loaded".to_string()));
        }
        check_query_dim(query_vec, self.embeddings.first())?;
        let hits = self
            .corpus
            .documents()
            .iter()
            .zip(&self.embeddings)
            .map(|(doc, emb)| SearchHit::vector(doc.id, cosine_similarity(query_vec, emb)))
            .collect();
        Ok(rank_hits(hits, limit))
    }
}

impl VectorSearcher for SemanticIndex {
    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> { self.search(query_vec, k) }
}
