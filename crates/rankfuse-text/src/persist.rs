use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use rankfuse_core::blob::{read_blob, write_blob};
use rankfuse_core::{Error, Result};

use crate::index::IndexTables;

/// Locations of the four lexical index artifacts under one cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn postings(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn docmap(&self) -> PathBuf { self.root.join("docmap.bin") }
    pub fn doc_lengths(&self) -> PathBuf { self.root.join("doc_lengths.bin") }
    pub fn term_frequencies(&self) -> PathBuf { self.root.join("term_frequencies.bin") }

    pub fn all(&self) -> [PathBuf; 4] {
        [self.postings(), self.docmap(), self.doc_lengths(), self.term_frequencies()]
    }

    /// First artifact that is not on disk, if any.
    pub fn first_missing(&self) -> Option<PathBuf> {
        self.all().into_iter().find(|p| !p.exists())
    }
}

pub fn save_tables(paths: &IndexPaths, tables: &IndexTables) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_blob(&paths.postings(), &tables.postings)?;
    write_blob(&paths.docmap(), &tables.docmap)?;
    write_blob(&paths.doc_lengths(), &tables.doc_lengths)?;
    write_blob(&paths.term_frequencies(), &tables.term_frequencies)?;
    Ok(())
}

/// Load all four tables. Every artifact is checked before any is read, so a
/// partially written cache never yields a half-populated index.
pub fn load_tables(paths: &IndexPaths) -> Result<IndexTables> {
    if let Some(missing) = paths.first_missing() {
        return Err(Error::NotFound(missing));
    }
    Ok(IndexTables {
        postings: read_blob(&paths.postings())?,
        docmap: read_blob(&paths.docmap())?,
        doc_lengths: read_blob(&paths.doc_lengths())?,
        term_frequencies: read_blob(&paths.term_frequencies())?,
    })
}
