use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use tracing_subscriber::EnvFilter;

use rankfuse_core::config::{ResolvedPaths, Settings};
use rankfuse_core::corpus::{load_corpus, load_golden_dataset, load_stopwords};
use rankfuse_core::{DocId, ScoredResult};
use rankfuse_embed::get_default_embedder;
use rankfuse_hybrid::evaluation::{evaluate, mean_metrics};
use rankfuse_hybrid::{enhance_query, min_max_normalize, EnhanceMethod, HybridSearchEngine, RerankMethod, Reranker};
use rankfuse_text::{IndexPaths, InvertedIndex, TextNormalizer};
use rankfuse_vector::cache::{save_chunk_cache, save_document_embeddings};
use rankfuse_vector::{chunk_text, chunk_words, ChunkedSemanticIndex, EmbeddingPaths, SemanticIndex};

mod external;

use external::ExternalCommand;

/// Candidates fetched per requested result when a reranker reorders the fused list.
const RERANK_OVERFETCH: usize = 5;

type Engine = HybridSearchEngine<InvertedIndex, ChunkedSemanticIndex>;

#[derive(Parser)]
#[command(name = "rankfuse", about = "Hybrid BM25 + semantic retrieval over a movie corpus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index and embedding caches from the corpus
    Build,
    /// BM25 keyword search
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Raw term frequency of a term in a document
    Tf { doc_id: DocId, term: String },
    /// Inverse document frequency of a term
    Idf { term: String },
    /// TF-IDF of a term in a document
    Tfidf { doc_id: DocId, term: String },
    /// BM25 inverse document frequency of a term
    Bm25idf { term: String },
    /// Saturated BM25 term frequency of a term in a document
    Bm25tf {
        doc_id: DocId,
        term: String,
        #[arg(long)]
        k1: Option<f64>,
        #[arg(long)]
        b: Option<f64>,
    },
    /// Split text into fixed-size word windows
    Chunk {
        text: String,
        #[arg(long, default_value_t = 200)]
        chunk_size: usize,
        #[arg(long, default_value_t = 0)]
        overlap: usize,
    },
    /// Split text into overlapping sentence windows
    SemanticChunk {
        text: String,
        #[arg(long)]
        max_chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Min-max normalize a list of scores
    Normalize {
        #[arg(allow_negative_numbers = true)]
        scores: Vec<f64>,
    },
    /// Chunk-level semantic search
    SemanticSearch {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Weighted min-max fusion of BM25 and semantic scores, optionally enhanced and reranked
    WeightedSearch {
        query: String,
        #[arg(long)]
        alpha: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        enhance: Option<EnhanceMethod>,
        #[arg(long)]
        rerank_method: Option<RerankMethod>,
    },
    /// Reciprocal Rank Fusion, optionally enhanced and reranked
    RrfSearch {
        query: String,
        #[arg(long)]
        k: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        enhance: Option<EnhanceMethod>,
        #[arg(long)]
        rerank_method: Option<RerankMethod>,
    },
    /// Precision, recall and F1 over the golden dataset
    Evaluate {
        #[arg(long)]
        limit: Option<usize>,
    },
}

struct Workspace {
    settings: Settings,
    paths: ResolvedPaths,
}

impl Workspace {
    fn load() -> Result<Self> {
        let settings = Settings::load().context("loading configuration")?;
        let paths = settings.paths.resolve(&env::current_dir()?);
        Ok(Self { settings, paths })
    }

    fn limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.settings.search.default_limit)
    }

    fn normalizer(&self) -> Result<TextNormalizer> {
        let stopwords = load_stopwords(&self.paths.stopwords)
            .with_context(|| format!("loading stopwords from {}", self.paths.stopwords.display()))?;
        Ok(TextNormalizer::new(stopwords))
    }

    fn empty_index(&self) -> Result<InvertedIndex> {
        Ok(InvertedIndex::new(self.normalizer()?, self.settings.bm25, IndexPaths::new(&self.paths.cache_dir)))
    }

    /// The persisted lexical index. A missing cache aborts; run `build` first.
    fn cached_index(&self) -> Result<InvertedIndex> {
        let mut index = self.empty_index()?;
        index.load().context("inverted index is not built, run `rankfuse build`")?;
        Ok(index)
    }

    fn engine(&self) -> Result<Engine> {
        let corpus = load_corpus(&self.paths.corpus)?;
        let text = self.cached_index()?;
        let embedder = get_default_embedder(&self.settings.embedding)?;
        let batch_size = self.settings.embedding.batch_size;
        let cache = EmbeddingPaths::new(&self.paths.cache_dir);

        let mut vector = ChunkedSemanticIndex::new(SemanticIndex::new(corpus.clone()), self.settings.chunking);
        vector.base_mut().load_or_create_embeddings(embedder.as_ref(), batch_size, &cache)?;
        vector.load_or_create_chunk_embeddings(embedder.as_ref(), batch_size, &cache)?;
        Ok(HybridSearchEngine::new(corpus, text, vector, embedder, self.settings.fusion))
    }

    fn llm(&self) -> Result<ExternalCommand> {
        let argv = self.settings.llm.command.as_deref().context("llm.command is not configured")?;
        ExternalCommand::from_argv(argv)
    }

    fn cross_encoder(&self) -> Result<ExternalCommand> {
        let argv = self
            .settings
            .llm
            .cross_encoder_command
            .as_deref()
            .context("llm.cross_encoder_command is not configured")?;
        ExternalCommand::from_argv(argv)
    }
}

fn build(ws: &Workspace) -> Result<()> {
    let corpus = load_corpus(&ws.paths.corpus)?;
    let mut index = ws.empty_index()?;
    index.build(corpus.documents())?;
    index.save()?;
    println!("Indexed {} documents into {}", index.doc_count(), ws.paths.cache_dir.display());

    let embedder = get_default_embedder(&ws.settings.embedding)?;
    let batch_size = ws.settings.embedding.batch_size;
    let cache = EmbeddingPaths::new(&ws.paths.cache_dir);
    let mut vector = ChunkedSemanticIndex::new(SemanticIndex::new(corpus), ws.settings.chunking);
    vector.base_mut().build_embeddings(embedder.as_ref(), batch_size)?;
    save_document_embeddings(&cache, vector.base().embeddings())?;
    vector.build_chunk_embeddings(embedder.as_ref(), batch_size)?;
    save_chunk_cache(&cache, vector.chunk_embeddings(), vector.chunk_metadata(), vector.corpus().len())?;
    println!(
        "Embedded {} documents and {} chunks",
        vector.base().embeddings().len(),
        vector.chunk_metadata().len()
    );
    Ok(())
}

fn print_fused(results: &[ScoredResult<'_>]) {
    for (i, r) in results.iter().enumerate() {
        println!("{}. {} (id {})", i + 1, r.document.title, r.document_id);
        if let Some(score) = r.rerank_score {
            println!("   Rerank score: {score:.3}");
        }
        if let Some(rank) = r.rerank_rank {
            println!("   Rerank rank: {rank}");
        }
        if let Some(score) = r.rrf_score {
            println!("   RRF score: {score:.3}");
        }
        if let Some(score) = r.hybrid_score {
            println!("   Hybrid score: {score:.3}");
        }
        if r.normalized_keyword.is_some() || r.normalized_semantic.is_some() {
            println!(
                "   BM25: {:.3}, Semantic: {:.3}",
                r.normalized_keyword.unwrap_or_default(),
                r.normalized_semantic.unwrap_or_default()
            );
        }
        if r.rrf_score.is_some() {
            let fmt_rank = |rank: Option<usize>| rank.map_or_else(|| "-".to_string(), |n| n.to_string());
            println!("   BM25 rank: {}, Semantic rank: {}", fmt_rank(r.bm25_rank), fmt_rank(r.semantic_rank));
        }
        let preview: String = r.document.description.chars().take(100).collect();
        println!("   {preview}...");
    }
}

/// How the two rankings are combined.
#[derive(Debug, Clone, Copy)]
enum Fusion {
    Weighted { alpha: f64 },
    Rrf { k: f64 },
}

/// Fused candidates to fetch for `limit` results, over-fetching when a
/// reranker will reorder them.
fn candidate_limit(limit: usize, reranking: bool) -> usize {
    if reranking { limit.saturating_mul(RERANK_OVERFETCH) } else { limit }
}

fn hybrid_search(
    ws: &Workspace,
    query: &str,
    fusion: Fusion,
    limit: Option<usize>,
    enhance: Option<EnhanceMethod>,
    rerank_method: Option<RerankMethod>,
) -> Result<()> {
    let engine = ws.engine()?;
    let limit = ws.limit(limit);

    let query = match enhance {
        Some(method) => {
            let llm = ws.llm()?;
            let enhanced = enhance_query(&llm, method, query).query_or(query);
            println!("Enhanced query ({method}): '{query}' -> '{enhanced}'\n");
            enhanced
        }
        None => query.to_string(),
    };

    let fetch = candidate_limit(limit, rerank_method.is_some());
    let candidates = match fusion {
        Fusion::Weighted { alpha } => engine.weighted_search(&query, alpha, fetch)?,
        Fusion::Rrf { k } => engine.rrf_search(&query, k, fetch)?,
    };

    let results = match rerank_method {
        None => candidates,
        Some(method) => {
            let oracle = match method {
                RerankMethod::CrossEncoder => ws.cross_encoder()?,
                RerankMethod::Individual | RerankMethod::Batch => ws.llm()?,
            };
            let reranker = match method {
                RerankMethod::Individual => Reranker::Individual(&oracle),
                RerankMethod::Batch => Reranker::Batch(&oracle),
                RerankMethod::CrossEncoder => Reranker::CrossEncoder(&oracle),
            };
            println!("Reranking top {} results using {method} method...\n", candidates.len());
            reranker.rerank(&query, candidates, limit)
        }
    };
    print_fused(&results);
    Ok(())
}

fn run(ws: &Workspace, command: Commands) -> Result<()> {
    match command {
        Commands::Build => build(ws)?,
        Commands::Search { query, limit } => {
            let index = ws.cached_index()?;
            for hit in index.bm25_search(&query, ws.limit(limit)) {
                if let Some(doc) = index.document(hit.id) {
                    println!("{} - {} ({:.2})", doc.id, doc.title, hit.score);
                }
            }
        }
        Commands::Tf { doc_id, term } => {
            println!("{}", ws.cached_index()?.get_tf(doc_id, &term)?);
        }
        Commands::Idf { term } => {
            let idf = ws.cached_index()?.get_idf(&term)?;
            println!("Inverse document frequency of '{term}': {idf:.2}");
        }
        Commands::Tfidf { doc_id, term } => {
            let score = ws.cached_index()?.get_tf_idf(doc_id, &term)?;
            println!("TF-IDF score of '{term}' in document '{doc_id}': {score:.2}");
        }
        Commands::Bm25idf { term } => {
            let idf = ws.cached_index()?.get_bm25_idf(&term)?;
            println!("BM25 IDF score of '{term}': {idf:.2}");
        }
        Commands::Bm25tf { doc_id, term, k1, b } => {
            let k1 = k1.unwrap_or(ws.settings.bm25.k1);
            let b = b.unwrap_or(ws.settings.bm25.b);
            let score = ws.cached_index()?.get_bm25_term_score(doc_id, &term, k1, b)?;
            println!("BM25 TF score of '{term}' in document '{doc_id}': {score:.2}");
        }
        Commands::Chunk { text, chunk_size, overlap } => {
            let chunks = chunk_words(&text, chunk_size, overlap);
            println!("Chunking {} characters", text.chars().count());
            for (i, chunk) in chunks.iter().enumerate() {
                println!("{}. {chunk}", i + 1);
            }
        }
        Commands::SemanticChunk { text, max_chunk_size, overlap } => {
            let max = max_chunk_size.unwrap_or(ws.settings.chunking.max_sentences);
            let overlap = overlap.unwrap_or(ws.settings.chunking.overlap);
            println!("Semantically chunking {} characters", text.chars().count());
            for (i, chunk) in chunk_text(&text, max, overlap).iter().enumerate() {
                println!("{}. {chunk}", i + 1);
            }
        }
        Commands::Normalize { scores } => {
            for score in min_max_normalize(&scores) {
                println!("* {score:.4}");
            }
        }
        Commands::SemanticSearch { query, limit } => {
            let engine = ws.engine()?;
            for (i, hit) in engine.semantic_search(&query, ws.limit(limit))?.iter().enumerate() {
                if let Some(doc) = engine.corpus().get(hit.id) {
                    println!("{}. {} (score: {:.4})", i + 1, doc.title, hit.score);
                }
            }
        }
        Commands::WeightedSearch { query, alpha, limit, enhance, rerank_method } => {
            let fusion = Fusion::Weighted { alpha: alpha.unwrap_or(ws.settings.fusion.alpha) };
            hybrid_search(ws, &query, fusion, limit, enhance, rerank_method)?;
        }
        Commands::RrfSearch { query, k, limit, enhance, rerank_method } => {
            let fusion = Fusion::Rrf { k: k.unwrap_or(ws.settings.fusion.rrf_k) };
            hybrid_search(ws, &query, fusion, limit, enhance, rerank_method)?;
        }
        Commands::Evaluate { limit } => {
            let engine = ws.engine()?;
            let dataset = load_golden_dataset(&ws.paths.golden_dataset)?;
            let limit = ws.limit(limit);
            let reports = evaluate(&engine, &dataset, ws.settings.fusion.rrf_k, limit)?;
            println!("k={limit}\n");
            for report in &reports {
                println!("- Query: {}", report.query);
                println!("  - Precision@{limit}: {:.4}", report.metrics.precision);
                println!("  - Recall@{limit}: {:.4}", report.metrics.recall);
                println!("  - F1 Score: {:.4}", report.metrics.f1);
                println!("  - Retrieved: {}", report.retrieved.join(", "));
                println!("  - Relevant: {}", report.relevant.join(", "));
            }
            let mean = mean_metrics(&reports);
            println!(
                "\nMean over {} queries: precision {:.4}, recall {:.4}, F1 {:.4}",
                reports.len(),
                mean.precision,
                mean.recall,
                mean.f1
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ws = Workspace::load()?;
    run(&ws, cli.command)
}
