use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Process-wide settings, assembled once at startup and passed explicitly
/// to every component that needs a path or a tuning knob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub bm25: Bm25Settings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub fusion: FusionSettings,
    pub search: SearchSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub corpus: String,
    pub stopwords: String,
    pub golden_dataset: String,
    pub cache_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            corpus: "data/movies.json".to_string(),
            stopwords: "data/stopwords.txt".to_string(),
            golden_dataset: "data/golden_dataset.json".to_string(),
            cache_dir: "cache".to_string(),
        }
    }
}

/// `PathSettings` after `~`/`$VAR` expansion and resolution against a base dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub corpus: PathBuf,
    pub stopwords: PathBuf,
    pub golden_dataset: PathBuf,
    pub cache_dir: PathBuf,
}

impl PathSettings {
    pub fn resolve(&self, base: &Path) -> ResolvedPaths {
        ResolvedPaths {
            corpus: resolve_with_base(base, &self.corpus),
            stopwords: resolve_with_base(base, &self.stopwords),
            golden_dataset: resolve_with_base(base, &self.golden_dataset),
            cache_dir: resolve_with_base(base, &self.cache_dir),
        }
    }
}

/// BM25 saturation (`k1`) and length normalization (`b`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Settings {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Settings {
    fn default() -> Self { Self { k1: 1.5, b: 0.75 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_sentences: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { max_sentences: 4, overlap: 1 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { dimension: 384, batch_size: 64 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    /// Each ranker fetches `limit * overfetch` candidates before fusing.
    pub overfetch: usize,
    pub alpha: f64,
    pub rrf_k: f64,
}

impl Default for FusionSettings {
    fn default() -> Self { Self { overfetch: 500, alpha: 0.5, rrf_k: 60.0 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self { Self { default_limit: 5 } }
}

/// External programs backing the LLM and cross-encoder adapters.
/// Each is `[program, args...]`; unset means the feature is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub command: Option<Vec<String>>,
    pub cross_encoder_command: Option<Vec<String>>,
}

impl Settings {
    /// Merge defaults, `config.toml`, `config.<RUST_ENV>.toml` and `APP_*` env vars.
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        tracing::debug!(env = env_name, ?settings, "configuration loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        if !(0.0..=1.0).contains(&self.fusion.alpha) {
            return invalid(format!("fusion.alpha must be in [0, 1], got {}", self.fusion.alpha));
        }
        if self.fusion.overfetch == 0 {
            return invalid("fusion.overfetch must be positive".to_string());
        }
        if self.fusion.rrf_k < 0.0 {
            return invalid(format!("fusion.rrf_k must be non-negative, got {}", self.fusion.rrf_k));
        }
        if self.bm25.k1 <= 0.0 {
            return invalid(format!("bm25.k1 must be positive, got {}", self.bm25.k1));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return invalid(format!("bm25.b must be in [0, 1], got {}", self.bm25.b));
        }
        if self.chunking.max_sentences == 0 || self.chunking.overlap >= self.chunking.max_sentences {
            return invalid(format!(
                "chunking requires 0 <= overlap < max_sentences, got overlap={} max_sentences={}",
                self.chunking.overlap, self.chunking.max_sentences
            ));
        }
        if self.embedding.dimension == 0 || self.embedding.batch_size == 0 {
            return invalid("embedding.dimension and embedding.batch_size must be positive".to_string());
        }
        if self.search.default_limit == 0 {
            return invalid("search.default_limit must be positive".to_string());
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
