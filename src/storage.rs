use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::domain::{Ledger, default_categories};

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse JSON store: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode JSON store: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Reads the category store (a JSON array of names). A missing file yields
/// the built-in default list; any other failure is returned so the caller
/// can decide how to degrade. The file is never modified here.
pub fn load_categories(path: &Path) -> Result<Vec<String>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(default_categories()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    serde_json::from_str(&raw).map_err(StorageError::JsonDecode)
}

pub fn save_categories(path: &Path, categories: &[String]) -> Result<(), StorageError> {
    let blob = serde_json::to_string_pretty(categories).map_err(StorageError::JsonEncode)?;
    write_store(path, &blob)
}

/// Reads the ledger (a JSON object keyed by `YYYY-MM-DD`). A missing file
/// yields an empty ledger.
pub fn load_ledger(path: &Path) -> Result<Ledger, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Ledger::new()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    serde_json::from_str(&raw).map_err(StorageError::JsonDecode)
}

/// Writes the whole ledger as one JSON document. Always a complete snapshot
/// of completed intervals, never an append.
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<(), StorageError> {
    let blob = serde_json::to_string_pretty(ledger).map_err(StorageError::JsonEncode)?;
    write_store(path, &blob)
}

/// Removes the ledger file; an already absent file counts as success.
pub fn delete_ledger(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StorageError::Io(err)),
    }
}

fn write_store(path: &Path, blob: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    fs::write(path, blob).map_err(StorageError::Io)
}
