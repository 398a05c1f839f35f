//! Domain types shared by the lexical, semantic and fusion engines.

use serde::{Deserialize, Serialize};

pub type DocId = u32;

/// One corpus entry. Index structures refer to it by `id` and never copy it.
///
/// An `id` of `0` is treated as absent: the corpus format has no other way to
/// spell a missing identifier once it has been deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: DocId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id, title: title.into(), description: description.into() }
    }

    /// Text fed to the lexical index.
    pub fn indexed_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    /// Text fed to the document-level embedder.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.title, self.description)
    }
}

/// Position of one chunk inside the chunk table.
///
/// `document_index` is the owning document's position in the corpus, not its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_index: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// The minimal surface returned by both rankers.
///
/// `score` is engine-specific (BM25 sum or cosine similarity) but higher is
/// always better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocId,
    pub score: f64,
    pub source: SourceKind,
}

impl SearchHit {
    pub fn text(id: DocId, score: f64) -> Self {
        Self { id, score, source: SourceKind::Text }
    }

    pub fn vector(id: DocId, score: f64) -> Self {
        Self { id, score, source: SourceKind::Vector }
    }
}

/// Accumulator for one document across fusion and reranking.
///
/// Each stage fills in its own fields; `None` means the stage did not rank
/// the document. `keyword_score`/`semantic_score` are the raw ranker scores,
/// the `normalized_*` fields are their min-max rescaled values.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult<'a> {
    pub document_id: DocId,
    pub document: &'a Document,
    pub keyword_score: Option<f64>,
    pub semantic_score: Option<f64>,
    pub normalized_keyword: Option<f64>,
    pub normalized_semantic: Option<f64>,
    pub hybrid_score: Option<f64>,
    pub bm25_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
    pub rrf_score: Option<f64>,
    pub rerank_score: Option<f64>,
    pub rerank_rank: Option<usize>,
}

impl<'a> ScoredResult<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document_id: document.id,
            document,
            keyword_score: None,
            semantic_score: None,
            normalized_keyword: None,
            normalized_semantic: None,
            hybrid_score: None,
            bm25_rank: None,
            semantic_rank: None,
            rrf_score: None,
            rerank_score: None,
            rerank_rank: None,
        }
    }
}
