use super::{StorageError, write_atomic};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Repository of identifier -> stored filename records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All identifiers in insertion order.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Stored filename for `id`, if recorded.
    async fn get(&self, id: &str) -> Result<Option<String>, StorageError>;

    /// Record `id` -> `filename`, replacing any previous entry.
    async fn insert(&self, id: &str, filename: &str) -> Result<(), StorageError>;

    /// Remove `id`, returning the filename it mapped to.
    async fn remove(&self, id: &str) -> Result<Option<String>, StorageError>;
}

/// Records persisted as a single pretty-printed JSON object.
///
/// Every call re-reads the file so external edits are observed. Read-modify-write cycles hold
/// an async mutex and finish with an atomic rename; another process writing the same file can
/// still overwrite concurrent changes.
pub struct JsonRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonRecordStore {
    /// Open the store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(error) => return Err(StorageError::io(&self.path, error)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        let map: Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        if let Some((key, _)) = map.iter().find(|(_, value)| !value.is_string()) {
            tracing::warn!(path = %self.path.display(), id = %key, "Ignoring non-string record");
        }
        Ok(map)
    }

    async fn save(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        map.serialize(&mut serializer).map_err(StorageError::Encode)?;
        write_atomic(&self.path, &buffer)
            .await
            .map_err(|error| StorageError::io(&self.path, error))
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|(_, value)| value.is_string())
            .map(|(key, _)| key)
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .load()
            .await?
            .get(id)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn insert(&self, id: &str, filename: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.insert(id.to_string(), Value::String(filename.to_string()));
        self.save(&map).await
    }

    async fn remove(&self, id: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        let Some(previous) = map.shift_remove(id) else {
            return Ok(None);
        };
        self.save(&map).await?;
        Ok(previous.as_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().join("file_store.json"));
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_get_remove_round_trip_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().join("file_store.json"));
        store.insert("b-id", "b-id.pdf").await.unwrap();
        store.insert("a-id", "a-id.pdf").await.unwrap();
        store.insert("c-id", "c-id.pdf").await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["b-id", "a-id", "c-id"]);
        assert_eq!(store.get("a-id").await.unwrap().as_deref(), Some("a-id.pdf"));

        assert_eq!(store.remove("a-id").await.unwrap().as_deref(), Some("a-id.pdf"));
        assert_eq!(store.remove("a-id").await.unwrap(), None);
        assert_eq!(store.list().await.unwrap(), vec!["b-id", "c-id"]);
    }

    #[tokio::test]
    async fn file_is_reread_on_every_access() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file_store.json");
        let store = JsonRecordStore::new(&path);
        store.insert("first", "first.pdf").await.unwrap();

        std::fs::write(&path, r#"{ "edited": "edited.pdf" }"#).unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["edited"]);
    }

    #[tokio::test]
    async fn writes_four_space_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file_store.json");
        let store = JsonRecordStore::new(&path);
        store.insert("id", "id.pdf").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\n    \"id\": \"id.pdf\"\n}");
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file_store.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonRecordStore::new(&path);
        assert!(matches!(
            store.list().await.unwrap_err(),
            StorageError::Corrupt { .. }
        ));
    }

    #[tokio::test]
    async fn concurrent_inserts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonRecordStore::new(dir.path().join("file_store.json")));

        let mut handles = Vec::new();
        for index in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("id-{index}");
                store.insert(&id, &format!("{id}.pdf")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 16);
    }
}
