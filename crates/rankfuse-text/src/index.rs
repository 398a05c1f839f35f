use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use rankfuse_core::config::Bm25Settings;
use rankfuse_core::corpus::validate_ids;
use rankfuse_core::{DocId, Document, Error, Result};

use crate::normalize::TextNormalizer;
use crate::persist::{load_tables, save_tables, IndexPaths};

/// The persisted state of the index. Built once per corpus version and
/// read-only afterwards.
///
/// - `postings`: token -> ids of documents containing it (set semantics)
/// - `docmap`: id -> document
/// - `doc_lengths`: id -> normalized token count of `title + " " + description`
/// - `term_frequencies`: id -> token -> occurrences in that document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexTables {
    pub postings: HashMap<String, BTreeSet<DocId>>,
    pub docmap: HashMap<DocId, Document>,
    pub doc_lengths: HashMap<DocId, usize>,
    pub term_frequencies: HashMap<DocId, HashMap<String, u32>>,
}

pub struct InvertedIndex {
    normalizer: TextNormalizer,
    params: Bm25Settings,
    paths: IndexPaths,
    tables: IndexTables,
}

impl InvertedIndex {
    pub fn new(normalizer: TextNormalizer, params: Bm25Settings, paths: IndexPaths) -> Self {
        Self { normalizer, params, paths, tables: IndexTables::default() }
    }

    /// Rebuild every table from `documents`. Fails before touching the
    /// current state if any id is missing or duplicated.
    pub fn build(&mut self, documents: &[Document]) -> Result<()> {
        validate_ids(documents)?;
        let mut tables = IndexTables::default();
        for doc in documents {
            let tokens = self.normalizer.tokens(&doc.indexed_text());
            tables.doc_lengths.insert(doc.id, tokens.len());
            tables.docmap.insert(doc.id, doc.clone());
            if tokens.is_empty() {
                continue;
            }
            let counts = tables.term_frequencies.entry(doc.id).or_default();
            for token in tokens {
                tables.postings.entry(token.clone()).or_default().insert(doc.id);
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        tracing::info!(documents = tables.docmap.len(), terms = tables.postings.len(), "built inverted index");
        self.tables = tables;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        save_tables(&self.paths, &self.tables)?;
        tracing::info!(dir = %self.paths.root.display(), "saved inverted index");
        Ok(())
    }

    /// Replace the in-memory tables with the cached ones.
    pub fn load(&mut self) -> Result<()> {
        self.tables = load_tables(&self.paths)?;
        tracing::info!(dir = %self.paths.root.display(), documents = self.tables.docmap.len(), "loaded inverted index");
        Ok(())
    }

    /// Whether every cache artifact exists.
    pub fn is_cached(&self) -> bool { self.paths.first_missing().is_none() }

    pub fn paths(&self) -> &IndexPaths { &self.paths }

    pub fn params(&self) -> Bm25Settings { self.params }

    pub fn normalizer(&self) -> &TextNormalizer { &self.normalizer }

    pub fn tables(&self) -> &IndexTables { &self.tables }

    pub fn document(&self, id: DocId) -> Option<&Document> { self.tables.docmap.get(&id) }

    pub fn doc_count(&self) -> usize { self.tables.docmap.len() }

    pub fn avg_doc_length(&self) -> f64 {
        if self.tables.doc_lengths.is_empty() {
            return 0.0;
        }
        let total: usize = self.tables.doc_lengths.values().sum();
        total as f64 / self.tables.doc_lengths.len() as f64
    }

    /// Ids of documents containing `token` (already normalized), ascending.
    pub fn postings(&self, token: &str) -> Option<&BTreeSet<DocId>> { self.tables.postings.get(token) }

    /// Normalize `term` and require exactly one resulting token.
    pub fn single_token(&self, term: &str) -> Result<String> {
        let mut tokens = self.normalizer.tokens(term);
        if tokens.len() != 1 {
            return Err(Error::InvalidTerm { term: term.to_string(), tokens: tokens.len() });
        }
        Ok(tokens.remove(0))
    }

    pub fn get_tf(&self, doc_id: DocId, term: &str) -> Result<u32> {
        let token = self.single_token(term)?;
        Ok(self.token_tf(doc_id, &token))
    }

    /// `ln((N + 1) / (df + 1))`
    pub fn get_idf(&self, term: &str) -> Result<f64> {
        let token = self.single_token(term)?;
        let n = self.doc_count() as f64;
        let df = self.token_df(&token) as f64;
        Ok(((n + 1.0) / (df + 1.0)).ln())
    }

    pub fn get_tf_idf(&self, doc_id: DocId, term: &str) -> Result<f64> {
        Ok(f64::from(self.get_tf(doc_id, term)?) * self.get_idf(term)?)
    }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`
    pub fn get_bm25_idf(&self, term: &str) -> Result<f64> {
        let token = self.single_token(term)?;
        Ok(self.token_bm25_idf(&token))
    }

    pub fn get_bm25_term_score(&self, doc_id: DocId, term: &str, k1: f64, b: f64) -> Result<f64> {
        let token = self.single_token(term)?;
        Ok(self.token_bm25_tf(doc_id, &token, k1, b))
    }

    /// Saturated term frequency times BM25 IDF, with the index's own `k1`/`b`.
    pub fn bm25(&self, doc_id: DocId, term: &str) -> Result<f64> {
        let token = self.single_token(term)?;
        Ok(self.token_bm25(doc_id, &token))
    }

    pub(crate) fn token_tf(&self, doc_id: DocId, token: &str) -> u32 {
        self.tables
            .term_frequencies
            .get(&doc_id)
            .and_then(|counts| counts.get(token))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn token_df(&self, token: &str) -> usize {
        self.tables.postings.get(token).map_or(0, BTreeSet::len)
    }

    pub(crate) fn token_bm25_idf(&self, token: &str) -> f64 {
        let n = self.doc_count() as f64;
        let df = self.token_df(token) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// `tf * (k1 + 1) / (tf + k1 * (1 - b + b * docLen / avgDocLen))`
    pub(crate) fn token_bm25_tf(&self, doc_id: DocId, token: &str, k1: f64, b: f64) -> f64 {
        let tf = f64::from(self.token_tf(doc_id, token));
        let avg = self.avg_doc_length();
        if tf == 0.0 || avg == 0.0 {
            return 0.0;
        }
        let doc_len = self.tables.doc_lengths.get(&doc_id).copied().unwrap_or(0) as f64;
        let length_norm = 1.0 - b + b * (doc_len / avg);
        tf * (k1 + 1.0) / (tf + k1 * length_norm)
    }

    pub(crate) fn token_bm25(&self, doc_id: DocId, token: &str) -> f64 {
        self.token_bm25_tf(doc_id, token, self.params.k1, self.params.b) * self.token_bm25_idf(token)
    }
}
