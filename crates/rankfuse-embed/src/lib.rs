//! Embedding providers behind [`rankfuse_core::traits::Embedder`].
//!
//! Model inference lives outside this workspace; what ships here is a
//! deterministic feature-hashing embedder that needs no weights and gives
//! texts sharing words a positive cosine similarity.

use anyhow::{bail, Result};
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use rankfuse_core::config::EmbeddingSettings;
use rankfuse_core::traits::Embedder;

/// Hashes lowercased words into `dim` buckets and L2-normalizes the result.
/// Text with no words maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    seed: u64,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, seed: 0 } }

    pub fn with_seed(dim: usize, seed: u64) -> Self { Self { dim, seed } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|w| !w.is_empty());
        for word in words {
            let mut hasher = XxHash64::with_seed(self.seed);
            word.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            // top bits pick a weight in [0.5, 1.0)
            let weight = 0.5 + ((h >> 40) as f32) / ((1u64 << 24) as f32) * 0.5;
            v[idx] += weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.dim == 0 {
            bail!("embedding dimension must be positive");
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.dimension == 0 {
        bail!("embedding.dimension must be positive");
    }
    tracing::info!(dim = settings.dimension, "using hashing embedder");
    Ok(Box::new(HashingEmbedder::new(settings.dimension)))
}
