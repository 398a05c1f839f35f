//! rankfuse-hybrid
//!
//! Fuses lexical and semantic rankings, optionally reranks the fused list
//! through an external oracle, and measures retrieval quality.

pub mod engine;
pub mod enhance;
pub mod evaluation;
pub mod fusion;
pub mod rerank;

pub use engine::HybridSearchEngine;
pub use enhance::{enhance_query, EnhanceMethod, Enhancement};
pub use fusion::{min_max_normalize, rrf_fusion, weighted_fusion};
pub use rerank::{CrossEncoder, LlmClient, RerankMethod, Reranker};
