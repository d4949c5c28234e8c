//! Persistent document metadata and raw upload storage.

mod records;
mod uploads;

pub use records::{JsonRecordStore, RecordStore};
pub use uploads::{UploadStore, stored_filename};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the metadata file or the upload directory.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The metadata file exists but is not a JSON object of strings.
    #[error("Corrupt metadata file {path}: {source}")]
    Corrupt {
        /// Metadata file path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Metadata could not be encoded.
    #[error("Failed to encode metadata: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `bytes` to `path` through a sibling temporary file and an atomic rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    let temp = PathBuf::from(temp);
    tokio::fs::write(&temp, bytes).await?;
    if let Err(error) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(error);
    }
    Ok(())
}
