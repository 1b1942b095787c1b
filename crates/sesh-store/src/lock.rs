use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Exclusive marker for one invocation's load..save window.
///
/// Created with `create_new` beside the snapshot, so two invocations against
/// the same session cannot both proceed; the file records the owner pid and
/// is removed when the guard drops. A lock left behind by a killed process
/// must be removed by hand (the error message names it).
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    pub fn acquire(snapshot_path: &Path) -> Result<Self, StoreError> {
        let path = lock_path(snapshot_path);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", std::process::id()) {
                    let _ = std::fs::remove_file(&path);
                    return Err(StoreError::Io { path, source: e });
                }
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let pid = std::fs::read_to_string(&path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                let pid = if pid.is_empty() {
                    "unknown".to_string()
                } else {
                    pid
                };
                Err(StoreError::SessionLocked { pid, path })
            }
            Err(e) => Err(StoreError::Io { path, source: e }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// `.sesh_state.json` locks as `.sesh_state.json.lock`.
pub fn lock_path(snapshot_path: &Path) -> PathBuf {
    let mut name = snapshot_path
        .file_name()
        .unwrap_or_default()
        .to_os_string();
    name.push(".lock");
    snapshot_path.with_file_name(name)
}
