use super::{StorageError, write_atomic};
use std::path::{Path, PathBuf};

/// Derive the stored filename for an upload: the identifier plus the original extension.
///
/// Only ASCII alphanumerics of the extension survive; names without one get none.
pub fn stored_filename(id: &str, original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
        })
        .filter(|ext| !ext.is_empty());

    match extension {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Directory holding raw uploaded files.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Use `root` as the upload directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload directory if needed.
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|error| StorageError::io(&self.root, error))
    }

    /// Path of a stored file.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Write `bytes` under `filename`.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.path_for(filename);
        write_atomic(&path, bytes)
            .await
            .map_err(|error| StorageError::io(&path, error))?;
        Ok(path)
    }

    /// Remove `filename` if present. Returns whether a file was removed.
    pub async fn remove(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.path_for(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(StorageError::io(&path, error)),
        }
    }
}
