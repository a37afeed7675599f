//! The handle store: persists `fingerprint -> resource URI` so an upload can be resumed after
//! the process restarts.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::UploadError;

/// Persist, look up, and delete `fingerprint -> resource URI` mappings.
///
/// Implementations must be safe to call concurrently from multiple sessions; `get` returning
/// `Ok(None)` means "no entry", which is distinct from an error.
pub trait HandleStore: Send + Sync {
    fn put(&self, fingerprint: &str, uri: &str) -> Result<(), UploadError>;
    fn get(&self, fingerprint: &str) -> Result<Option<String>, UploadError>;
    fn delete(&self, fingerprint: &str) -> Result<(), UploadError>;
}

/// Volatile store: a mapping held in process memory. Lost on process exit.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandleStore for MemoryStore {
    fn put(&self, fingerprint: &str, uri: &str) -> Result<(), UploadError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fingerprint.to_owned(), uri.to_owned());
        Ok(())
    }

    fn get(&self, fingerprint: &str) -> Result<Option<String>, UploadError> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(fingerprint).cloned())
    }

    fn delete(&self, fingerprint: &str) -> Result<(), UploadError> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(fingerprint);
        Ok(())
    }
}

/// Durable store: one regular file per fingerprint at `<directory>/<fingerprint>`, whose
/// content is the resource URI as UTF-8 text.
///
/// `delete` removes only the entry file, never the containing directory — a prior
/// implementation this crate's design was reviewed against removed the whole directory
/// recursively, which is almost certainly wrong whenever multiple fingerprints share a
/// directory, so that behavior is not carried over here.
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Use `directory` to hold entry files. The directory is created (including parents) if it
    /// doesn't already exist.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(UploadError::from)?;
        Ok(Self { directory })
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.directory.join(fingerprint)
    }
}

impl HandleStore for FileStore {
    fn put(&self, fingerprint: &str, uri: &str) -> Result<(), UploadError> {
        fs::write(self.entry_path(fingerprint), uri).map_err(UploadError::from)
    }

    fn get(&self, fingerprint: &str) -> Result<Option<String>, UploadError> {
        match fs::read_to_string(self.entry_path(fingerprint)) {
            Ok(uri) => Ok(Some(uri)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UploadError::from(e)),
        }
    }

    fn delete(&self, fingerprint: &str) -> Result<(), UploadError> {
        match fs::remove_file(self.entry_path(fingerprint)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UploadError::from(e)),
        }
    }
}

/// Exposed for tests and callers who want to inspect the on-disk layout directly.
pub fn entry_path(directory: &Path, fingerprint: &str) -> PathBuf {
    directory.join(fingerprint)
}
