use std::collections::HashMap;

use rankfuse_core::config::ChunkingSettings;
use rankfuse_core::traits::{Embedder, VectorSearcher};
use rankfuse_core::{ChunkMetadata, Corpus, Document, Error, Result, SearchHit};

use crate::cache::{check_aligned, load_chunk_cache, save_chunk_cache, EmbeddingPaths};
use crate::chunking::chunk_text;
use crate::semantic::{check_query_dim, embed_in_batches, rank_hits, SemanticIndex};
use crate::similarity::cosine_similarity;

/// Chunk texts and their metadata, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkTable {
    pub texts: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
}

impl ChunkTable {
    pub fn len(&self) -> usize { self.metadata.len() }

    pub fn is_empty(&self) -> bool { self.metadata.is_empty() }
}

/// Chunk every document description. Documents with a blank description
/// contribute no chunks.
pub fn build_chunk_table(documents: &[Document], settings: ChunkingSettings) -> ChunkTable {
    let mut table = ChunkTable::default();
    for (document_index, doc) in documents.iter().enumerate() {
        if doc.description.trim().is_empty() {
            continue;
        }
        let chunks = chunk_text(&doc.description, settings.max_sentences, settings.overlap);
        let total_chunks = chunks.len();
        for (chunk_index, text) in chunks.into_iter().enumerate() {
            table.texts.push(text);
            table.metadata.push(ChunkMetadata { document_index, chunk_index, total_chunks });
        }
    }
    table
}

/// Sentence-chunk embeddings over a [`SemanticIndex`]; a document scores as
/// its best chunk.
pub struct ChunkedSemanticIndex {
    base: SemanticIndex,
    chunking: ChunkingSettings,
    chunk_embeddings: Vec<Vec<f32>>,
    chunk_metadata: Vec<ChunkMetadata>,
}

impl ChunkedSemanticIndex {
    pub fn new(base: SemanticIndex, chunking: ChunkingSettings) -> Self {
        Self { base, chunking, chunk_embeddings: Vec::new(), chunk_metadata: Vec::new() }
    }

    pub fn base(&self) -> &SemanticIndex { &self.base }

    pub fn base_mut(&mut self) -> &mut SemanticIndex { &mut self.base }

    pub fn corpus(&self) -> &Corpus { self.base.corpus() }

    pub fn chunk_metadata(&self) -> &[ChunkMetadata] { &self.chunk_metadata }

    pub fn chunk_embeddings(&self) -> &[Vec<f32>] { &self.chunk_embeddings }

    pub fn chunk_table(&self) -> ChunkTable { build_chunk_table(self.corpus().documents(), self.chunking) }

    /// Install precomputed chunk vectors. Counts must agree and every chunk
    /// must point at a live document.
    pub fn set_chunks(&mut self, embeddings: Vec<Vec<f32>>, metadata: Vec<ChunkMetadata>) -> Result<()> {
        check_aligned(embeddings.len(), metadata.len())?;
        if let Some(m) = metadata.iter().find(|m| m.document_index >= self.corpus().len()) {
            return Err(Error::Corruption(format!(
                "chunk points at document index {} but the corpus has {} documents",
                m.document_index,
                self.corpus().len()
            )));
        }
        self.chunk_embeddings = embeddings;
        self.chunk_metadata = metadata;
        Ok(())
    }

    pub fn build_chunk_embeddings(&mut self, embedder: &dyn Embedder, batch_size: usize) -> Result<()> {
        let table = self.chunk_table();
        let embeddings = embed_in_batches(embedder, &table.texts, batch_size, "chunks")?;
        tracing::info!(chunks = table.len(), documents = self.corpus().len(), "built chunk embeddings");
        self.set_chunks(embeddings, table.metadata)
    }

    /// Reuse the chunk cache when it was built from a corpus of the same size
    /// with the same embedding dimension, otherwise rebuild and overwrite it.
    /// A cache whose two halves disagree is corrupt and is reported, not rebuilt.
    pub fn load_or_create_chunk_embeddings(&mut self, embedder: &dyn Embedder, batch_size: usize, paths: &EmbeddingPaths) -> Result<()> {
        match load_chunk_cache(paths) {
            Ok(cache) => {
                let live = self.corpus().len();
                let cached_dim = cache.embeddings.first().map(Vec::len);
                if cache.documents != Some(live) {
                    tracing::warn!(cached = ?cache.documents, documents = live, "chunk cache built for another corpus, rebuilding");
                } else if cached_dim.is_some_and(|dim| dim != embedder.dim()) {
                    tracing::warn!(cached = ?cached_dim, dim = embedder.dim(), "chunk cache has another dimension, rebuilding");
                } else if cache.metadata.iter().any(|m| m.document_index >= live) {
                    tracing::warn!(documents = live, "chunk cache refers to missing documents, rebuilding");
                } else {
                    tracing::info!(chunks = cache.metadata.len(), "loaded cached chunk embeddings");
                    return self.set_chunks(cache.embeddings, cache.metadata);
                }
            }
            Err(Error::NotFound(path)) => {
                tracing::debug!(missing = %path.display(), "no chunk cache");
            }
            Err(e) => return Err(e),
        }
        self.build_chunk_embeddings(embedder, batch_size)?;
        save_chunk_cache(paths, &self.chunk_embeddings, &self.chunk_metadata, self.corpus().len())
    }

    /// Cosine similarity against every chunk, max-pooled per document.
    pub fn search_chunks(&self, query_vec: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        check_aligned(self.chunk_embeddings.len(), self.chunk_metadata.len())?;
        check_query_dim(query_vec, self.chunk_embeddings.first())?;

        let documents = self.corpus().documents();
        let mut order: Vec<usize> = Vec::new();
        let mut best: HashMap<usize, f64> = HashMap::new();
        for (emb, meta) in self.chunk_embeddings.iter().zip(&self.chunk_metadata) {
            let score = cosine_similarity(query_vec, emb);
            best.entry(meta.document_index)
                .and_modify(|s| *s = s.max(score))
                .or_insert_with(|| {
                    order.push(meta.document_index);
                    score
                });
        }

        let mut hits = Vec::with_capacity(order.len());
        for pos in order {
            let doc = documents.get(pos).ok_or_else(|| {
                Error::Corruption(format!("chunk points at document index {pos} outside the corpus"))
            })?;
            hits.push(SearchHit::vector(doc.id, best[&pos]));
        }
        Ok(rank_hits(hits, limit))
    }
}

impl VectorSearcher for ChunkedSemanticIndex {
    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> { self.search_chunks(query_vec, k) }
}
