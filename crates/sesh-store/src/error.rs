use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A snapshot exists but cannot be decoded into an environment. Fatal;
    /// there is no record-by-record salvage outside lenient mode.
    #[error("corrupt snapshot at {path}: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// A binding holds a value the snapshot format cannot represent.
    /// Raised before any bytes are written.
    #[error("binding `{name}` holds a {kind} value, which cannot be snapshotted")]
    UnserializableValue { name: String, kind: &'static str },

    /// Another invocation holds the session.
    #[error("session locked by pid {pid} (lock file {path}); remove it if stale")]
    SessionLocked { pid: String, path: PathBuf },

    #[error("snapshot io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
