use rankfuse_core::config::ChunkingSettings;
use rankfuse_core::traits::Embedder;
use rankfuse_core::{ChunkMetadata, Corpus, Document, Error};
use rankfuse_embed::HashingEmbedder;
use rankfuse_vector::cache::{load_chunk_cache, save_chunk_cache};
use rankfuse_vector::{ChunkedSemanticIndex, EmbeddingPaths, SemanticIndex};
use tempfile::TempDir;

fn corpus() -> Corpus {
    Corpus::new(vec![
        Document::new(1, "Paddington", "A polite bear travels to London. He loves marmalade."),
        Document::new(2, "Gravity", "Two astronauts are stranded in orbit. Debris destroys their shuttle."),
        Document::new(3, "Untitled", ""),
        Document::new(4, "Jaws", "A great white shark terrorizes a beach town. The police chief hunts it."),
    ])
    .unwrap()
}

fn chunked(corpus: Corpus) -> ChunkedSemanticIndex {
    ChunkedSemanticIndex::new(SemanticIndex::new(corpus), ChunkingSettings { max_sentences: 1, overlap: 0 })
}

#[test]
fn chunk_identical_query_ranks_owner_first() {
    let embedder = HashingEmbedder::new(256);
    let mut idx = chunked(corpus());
    idx.build_chunk_embeddings(&embedder, 2).expect("build");
    assert_eq!(idx.chunk_metadata().len(), 6, "two sentences each for three described documents");

    let target = idx.chunk_embeddings()[3].clone();
    let owner = idx.chunk_metadata()[3].document_index;
    let hits = idx.search_chunks(&target, 3).unwrap();
    assert_eq!(hits[0].id, idx.corpus().documents()[owner].id);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!(hits.iter().all(|h| h.id != 3), "documents without chunks never appear");
}

#[test]
fn document_embeddings_cache_is_reused_or_rebuilt() {
    let tmp = TempDir::new().unwrap();
    let paths = EmbeddingPaths::new(tmp.path().join("cache"));
    let embedder = HashingEmbedder::new(64);

    let mut first = SemanticIndex::new(corpus());
    first.load_or_create_embeddings(&embedder, 8, &paths).unwrap();
    assert!(paths.document_embeddings().exists());

    // A different provider would give different vectors; a reused cache keeps the old ones.
    let other = HashingEmbedder::with_seed(64, 99);
    let mut second = SemanticIndex::new(corpus());
    second.load_or_create_embeddings(&other, 8, &paths).unwrap();
    assert_eq!(second.embeddings(), first.embeddings());

    // Corpus size changed: stale cache gets rebuilt.
    let smaller = Corpus::new(corpus().documents()[..2].to_vec()).unwrap();
    let mut third = SemanticIndex::new(smaller);
    third.load_or_create_embeddings(&other, 8, &paths).unwrap();
    assert_eq!(third.embeddings().len(), 2);
    assert_eq!(third.embeddings()[0], other.embed_text(&corpus().documents()[0].embedding_text()).unwrap());
}

#[test]
fn chunk_cache_round_trip_and_staleness() {
    let tmp = TempDir::new().unwrap();
    let paths = EmbeddingPaths::new(tmp.path());
    let embedder = HashingEmbedder::new(64);

    let mut idx = chunked(corpus());
    idx.load_or_create_chunk_embeddings(&embedder, 4, &paths).unwrap();
    let cache = load_chunk_cache(&paths).unwrap();
    assert_eq!(cache.embeddings.len(), cache.metadata.len());
    assert_eq!(cache.metadata, idx.chunk_metadata());
    assert_eq!(cache.documents, Some(4));

    let mut reloaded = chunked(corpus());
    reloaded.load_or_create_chunk_embeddings(&HashingEmbedder::with_seed(64, 7), 4, &paths).unwrap();
    assert_eq!(reloaded.chunk_embeddings(), idx.chunk_embeddings());

    // Cache mentions document index 3, which a two-document corpus lacks.
    let small = Corpus::new(corpus().documents()[..2].to_vec()).unwrap();
    let mut rebuilt = chunked(small);
    rebuilt.load_or_create_chunk_embeddings(&embedder, 4, &paths).unwrap();
    assert!(rebuilt.chunk_metadata().iter().all(|m| m.document_index < 2));
    assert_eq!(load_chunk_cache(&paths).unwrap().metadata, rebuilt.chunk_metadata());
}

#[test]
fn corrupt_chunk_cache_propagates() {
    let tmp = TempDir::new().unwrap();
    let paths = EmbeddingPaths::new(tmp.path());
    let meta = ChunkMetadata { document_index: 0, chunk_index: 0, total_chunks: 1 };
    save_chunk_cache(&paths, &[vec![1.0; 64]], &[meta], 4).unwrap();
    // Replace the vectors with a longer list so the two halves disagree.
    rankfuse_core::blob::write_blob(&paths.chunk_embeddings(), &vec![vec![1.0f32; 64]; 2]).unwrap();

    let mut idx = chunked(corpus());
    let err = idx.load_or_create_chunk_embeddings(&HashingEmbedder::new(64), 4, &paths).unwrap_err();
    assert!(matches!(err, Error::Corruption(_)), "got {err:?}");
}

#[test]
fn chunk_cache_rebuilt_when_corpus_grows() {
    let tmp = TempDir::new().unwrap();
    let paths = EmbeddingPaths::new(tmp.path());
    let embedder = HashingEmbedder::new(64);

    let two = Corpus::new(corpus().documents()[..2].to_vec()).unwrap();
    chunked(two).load_or_create_chunk_embeddings(&embedder, 4, &paths).unwrap();

    let mut docs = corpus().documents()[..2].to_vec();
    docs.push(Document::new(4, "Jaws", "A great white shark terrorizes a beach town."));
    let mut grown = chunked(Corpus::new(docs).unwrap());
    grown.load_or_create_chunk_embeddings(&embedder, 4, &paths).unwrap();
    assert!(grown.chunk_metadata().iter().any(|m| m.document_index == 2));

    let query = embedder.embed_text("A great white shark terrorizes a beach town.").unwrap();
    let hits = grown.search_chunks(&query, 1).unwrap();
    assert_eq!(hits[0].id, 4);
    assert_eq!(load_chunk_cache(&paths).unwrap().documents, Some(3));
}

#[test]
fn caches_rebuilt_when_dimension_changes() {
    let tmp = TempDir::new().unwrap();
    let paths = EmbeddingPaths::new(tmp.path());

    let mut idx = chunked(corpus());
    idx.base_mut().load_or_create_embeddings(&HashingEmbedder::new(384), 8, &paths).unwrap();
    idx.load_or_create_chunk_embeddings(&HashingEmbedder::new(384), 8, &paths).unwrap();

    let smaller = HashingEmbedder::new(256);
    let mut reopened = chunked(corpus());
    reopened.base_mut().load_or_create_embeddings(&smaller, 8, &paths).unwrap();
    reopened.load_or_create_chunk_embeddings(&smaller, 8, &paths).unwrap();
    assert!(reopened.base().embeddings().iter().all(|v| v.len() == 256));
    assert!(reopened.chunk_embeddings().iter().all(|v| v.len() == 256));

    let query = smaller.embed_text("polite bear").unwrap();
    assert!(reopened.base().search(&query, 2).is_ok());
    assert!(reopened.search_chunks(&query, 2).is_ok());
}
