//! rankfuse-text
//!
//! Lexical side of the engine: the shared text normalizer, an in-memory
//! inverted index with exact BM25 statistics, and its on-disk cache.

pub mod index;
pub mod normalize;
pub mod persist;
pub mod search;

pub use index::{IndexTables, InvertedIndex};
pub use normalize::TextNormalizer;
pub use persist::IndexPaths;
