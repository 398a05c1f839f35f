#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod blob;
pub mod config;
pub mod corpus;
pub mod error;
pub mod traits;
pub mod types;

pub use corpus::Corpus;
pub use error::{Error, Result};
pub use types::{ChunkMetadata, DocId, Document, ScoredResult, SearchHit, SourceKind};
