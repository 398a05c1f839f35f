//! rankfuse-vector
//!
//! Semantic side of the engine: sentence chunking, cosine similarity, a
//! document-level embedding index and the chunked index composed over it,
//! plus the on-disk embedding cache.

pub mod cache;
pub mod chunked;
pub mod chunking;
pub mod semantic;
pub mod similarity;

pub use cache::EmbeddingPaths;
pub use chunked::{build_chunk_table, ChunkTable, ChunkedSemanticIndex};
pub use chunking::{chunk_text, chunk_words};
pub use semantic::{embed_in_batches, embed_query, SemanticIndex};
pub use similarity::cosine_similarity;
