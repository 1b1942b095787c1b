use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use sesh_core::Environment;

use crate::error::StoreError;
use crate::snapshot;
use crate::traits::Store;

/// File-backed store. Every save rewrites the snapshot wholesale through a
/// temp file in the same directory followed by an atomic rename, so a crash
/// mid-save can never leave a truncated snapshot behind.
#[derive(Debug)]
pub struct FileStore {
    pub path: PathBuf,
    /// Skip per-record defects instead of failing the whole load/save.
    pub lenient: bool,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lenient: false,
        }
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Store for FileStore {
    fn load(&self) -> Result<Environment, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Environment::new());
            }
            Err(e) => return Err(self.io(e)),
        };
        snapshot::decode(&bytes, self.lenient).map_err(|e| StoreError::CorruptSnapshot {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn save(&self, env: &Environment) -> Result<(), StoreError> {
        // Encode fully before touching the file system; an unserializable
        // binding must leave the existing snapshot untouched.
        let bytes = snapshot::encode(env, self.lenient)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io(e))?;
        tmp.write_all(&bytes).map_err(|e| self.io(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io(e))?;
        tmp.persist(&self.path).map_err(|e| self.io(e.error))?;
        Ok(())
    }
}
