//! Corpus and stopword loading plus id validation.
//!
//! The raw corpus file is a JSON object holding a `movies` (or `documents`)
//! array of `{id, title, description, ...}` entries; unknown fields are ignored.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{DocId, Document};

#[derive(Debug, Deserialize)]
struct CorpusFile {
    #[serde(alias = "documents")]
    movies: Vec<CorpusEntry>,
}

/// A corpus record as written on disk, where `id` may be absent or `null`.
#[derive(Debug, Deserialize)]
struct CorpusEntry {
    #[serde(default)]
    id: Option<DocId>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

impl From<CorpusEntry> for Document {
    fn from(entry: CorpusEntry) -> Self {
        Document::new(entry.id.unwrap_or(0), entry.title, entry.description)
    }
}

/// Validated, immutable document collection.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    positions: HashMap<DocId, usize>,
}

impl Corpus {
    /// Fails on the first missing (zero) or duplicated id.
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        let positions = validate_ids(&documents)?;
        Ok(Self { documents, positions })
    }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.positions.get(&id).map(|&pos| &self.documents[pos])
    }

    /// Corpus position of `id`, the key used by the chunk table.
    pub fn position(&self, id: DocId) -> Option<usize> { self.positions.get(&id).copied() }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

/// Map every id to its position, rejecting missing and duplicate ids.
pub fn validate_ids(documents: &[Document]) -> Result<HashMap<DocId, usize>> {
    let mut positions = HashMap::with_capacity(documents.len());
    for (position, doc) in documents.iter().enumerate() {
        if doc.id == 0 {
            return Err(Error::MissingIdentifier { position });
        }
        if positions.insert(doc.id, position).is_some() {
            return Err(Error::DuplicateIdentifier(doc.id));
        }
    }
    Ok(positions)
}

pub fn load_corpus(path: &Path) -> Result<Corpus> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    let file: CorpusFile = serde_json::from_str(&raw)?;
    tracing::info!(path = %path.display(), documents = file.movies.len(), "loaded corpus");
    Corpus::new(file.movies.into_iter().map(Document::from).collect())
}

/// One labelled query: the titles a good search should return.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    pub query: String,
    #[serde(default)]
    pub relevant_docs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoldenDataset {
    pub test_cases: Vec<TestCase>,
}

pub fn load_golden_dataset(path: &Path) -> Result<GoldenDataset> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    let dataset: GoldenDataset = serde_json::from_str(&raw)?;
    tracing::info!(path = %path.display(), cases = dataset.test_cases.len(), "loaded golden dataset");
    Ok(dataset)
}

/// Newline-delimited stopword list; blank lines are skipped, words lowercased.
pub fn load_stopwords(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect())
}
