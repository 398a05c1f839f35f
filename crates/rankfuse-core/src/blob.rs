//! Whole-file cache artifacts. Writes go to a temp file in the destination
//! directory and are renamed into place, so readers never see a torn file.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn open_existing(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// Serialize `value` with bincode.
pub fn write_blob<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |w| Ok(bincode::serialize_into(w, value)?))
}

pub fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<T> {
    Ok(bincode::deserialize_from(open_existing(path)?)?)
}

/// Pretty-printed JSON, for artifacts meant to be inspected by hand.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |w| Ok(serde_json::to_writer_pretty(w, value)?))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    Ok(serde_json::from_reader(open_existing(path)?)?)
}
