use super::{IndexError, VectorIndex};
use crate::storage::write_atomic;
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "index.json";

/// Directory of per-document index subdirectories, one per identifier.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    /// Use `root` as the vector directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the vector directory if needed.
    pub async fn ensure_root(&self) -> Result<(), IndexError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| io_error(&self.root, source))
    }

    /// Directory holding the index for `id`.
    pub fn dir_for(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Whether an index directory exists for `id`.
    pub async fn exists(&self, id: &str) -> bool {
        tokio::fs::metadata(self.dir_for(id))
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
    }

    /// Persist `index` for `id`, replacing any previous one.
    pub async fn save(&self, id: &str, index: &VectorIndex) -> Result<(), IndexError> {
        let dir = self.dir_for(id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;
        let path = dir.join(INDEX_FILE);
        let bytes = serde_json::to_vec(index).map_err(|source| IndexError::Serde {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &bytes)
            .await
            .map_err(|source| io_error(&path, source))
    }

    /// Load the index for `id`.
    pub async fn load(&self, id: &str) -> Result<VectorIndex, IndexError> {
        let path = self.dir_for(id).join(INDEX_FILE);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| io_error(&path, source))?;
        serde_json::from_slice(&bytes).map_err(|source| IndexError::Serde { path, source })
    }

    /// Recursively remove the index directory for `id`. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, IndexError> {
        let dir = self.dir_for(id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(io_error(&dir, error)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> IndexError {
    IndexError::Io {
        path: path.to_path_buf(),
        source,
    }
}
