use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use rankfuse_core::blob::{read_blob, read_json, write_blob, write_json};
use rankfuse_core::{ChunkMetadata, Error, Result};

/// Embedding cache artifacts under one cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingPaths {
    pub root: PathBuf,
}

impl EmbeddingPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn document_embeddings(&self) -> PathBuf { self.root.join("movie_embeddings.bin") }
    pub fn chunk_embeddings(&self) -> PathBuf { self.root.join("chunk_embeddings.bin") }
    pub fn chunk_metadata(&self) -> PathBuf { self.root.join("chunk_metadata.json") }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChunkMetadataFile {
    chunks: Vec<ChunkMetadata>,
    total_chunks: usize,
    /// Corpus size the chunks were built from; absent in older caches.
    #[serde(default)]
    documents: Option<usize>,
}

/// Chunk vectors and metadata as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCache {
    pub embeddings: Vec<Vec<f32>>,
    pub metadata: Vec<ChunkMetadata>,
    pub documents: Option<usize>,
}

pub fn save_document_embeddings(paths: &EmbeddingPaths, embeddings: &[Vec<f32>]) -> Result<()> {
    write_blob(&paths.document_embeddings(), embeddings)?;
    tracing::info!(path = %paths.document_embeddings().display(), count = embeddings.len(), "saved document embeddings");
    Ok(())
}

pub fn load_document_embeddings(paths: &EmbeddingPaths) -> Result<Vec<Vec<f32>>> {
    read_blob(&paths.document_embeddings())
}

/// `documents` is the size of the corpus the chunks were cut from.
pub fn save_chunk_cache(paths: &EmbeddingPaths, embeddings: &[Vec<f32>], metadata: &[ChunkMetadata], documents: usize) -> Result<()> {
    check_aligned(embeddings.len(), metadata.len())?;
    write_blob(&paths.chunk_embeddings(), embeddings)?;
    let file = ChunkMetadataFile { chunks: metadata.to_vec(), total_chunks: metadata.len(), documents: Some(documents) };
    write_json(&paths.chunk_metadata(), &file)?;
    tracing::info!(dir = %paths.root.display(), chunks = metadata.len(), "saved chunk embeddings");
    Ok(())
}

/// Both chunk artifacts, checked to describe the same number of chunks.
pub fn load_chunk_cache(paths: &EmbeddingPaths) -> Result<ChunkCache> {
    let embeddings: Vec<Vec<f32>> = read_blob(&paths.chunk_embeddings())?;
    let file: ChunkMetadataFile = read_json(&paths.chunk_metadata())?;
    if file.total_chunks != file.chunks.len() {
        return Err(Error::Corruption(format!(
            "chunk metadata declares {} chunks but lists {}",
            file.total_chunks,
            file.chunks.len()
        )));
    }
    check_aligned(embeddings.len(), file.chunks.len())?;
    Ok(ChunkCache { embeddings, metadata: file.chunks, documents: file.documents })
}

pub(crate) fn check_aligned(embeddings: usize, metadata: usize) -> Result<()> {
    if embeddings != metadata {
        return Err(Error::Corruption(format!(
            "{embeddings} chunk embeddings but {metadata} chunk metadata entries"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(document_index: usize, chunk_index: usize, total_chunks: usize) -> ChunkMetadata {
        ChunkMetadata { document_index, chunk_index, total_chunks }
    }

    #[test]
    fn chunk_cache_round_trip() {
        let tmp = TempDir::new().unwrap();
        let paths = EmbeddingPaths::new(tmp.path().join("cache"));
        let embeddings = vec![vec![1.0, 0.0], vec![0.5, 0.5]];
        let metadata = vec![meta(0, 0, 2), meta(0, 1, 2)];
        save_chunk_cache(&paths, &embeddings, &metadata, 3).unwrap();

        let cache = load_chunk_cache(&paths).unwrap();
        assert_eq!(cache.embeddings, embeddings);
        assert_eq!(cache.metadata, metadata);
        assert_eq!(cache.documents, Some(3));

        let json = std::fs::read_to_string(paths.chunk_metadata()).unwrap();
        assert!(json.contains("\"total_chunks\": 2"));
        assert!(json.contains("\"documents\": 3"));
        assert!(json.contains("\"document_index\""));
    }

    #[test]
    fn mismatched_counts_are_corruption() {
        let tmp = TempDir::new().unwrap();
        let paths = EmbeddingPaths::new(tmp.path());
        write_blob(&paths.chunk_embeddings(), &vec![vec![1.0f32]]).unwrap();
        let file = ChunkMetadataFile { chunks: vec![meta(0, 0, 2), meta(0, 1, 2)], total_chunks: 2, documents: Some(1) };
        write_json(&paths.chunk_metadata(), &file).unwrap();
        assert!(matches!(load_chunk_cache(&paths), Err(Error::Corruption(_))));

        assert!(matches!(save_chunk_cache(&paths, &[vec![1.0]], &[], 1), Err(Error::Corruption(_))));
    }

    #[test]
    fn metadata_without_document_count_still_loads() {
        let tmp = TempDir::new().unwrap();
        let paths = EmbeddingPaths::new(tmp.path());
        write_blob(&paths.chunk_embeddings(), &vec![vec![1.0f32]]).unwrap();
        std::fs::write(
            paths.chunk_metadata(),
            r#"{"chunks": [{"document_index": 0, "chunk_index": 0, "total_chunks": 1}], "total_chunks": 1}"#,
        )
        .unwrap();
        assert_eq!(load_chunk_cache(&paths).unwrap().documents, None);
    }

    #[test]
    fn missing_document_embeddings_are_not_found() {
        let tmp = TempDir::new().unwrap();
        let paths = EmbeddingPaths::new(tmp.path());
        assert!(matches!(load_document_embeddings(&paths), Err(Error::NotFound(_))));
    }
}
