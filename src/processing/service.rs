//! Document service coordinating storage, extraction, chunking, embedding, and retrieval.

use crate::{
    completion::{CompletionClient, build_completion_client},
    config::Config,
    embedding::{Embedder, build_embedder},
    extract::{PdfTextExtractor, TextExtractor, extract_blocking},
    metrics::{MetricsSnapshot, ServiceMetrics},
    processing::{
        chunking::TextSplitter,
        prompt::render_prompt,
        types::{ProcessingError, ServiceError, UploadOutcome},
    },
    storage::{JsonRecordStore, RecordStore, UploadStore, stored_filename},
    vector::{IndexStore, VectorIndex},
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Abstraction over the document pipeline used by the HTTP surface.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// All known document identifiers, in insertion order.
    async fn list_documents(&self) -> Result<Vec<String>, ServiceError>;

    /// Store, extract, chunk, embed, and index an uploaded file.
    async fn upload(
        &self,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ServiceError>;

    /// Answer `question` from the document identified by `file_id`.
    async fn query(&self, file_id: &str, question: &str) -> Result<String, ServiceError>;

    /// Remove a document's raw file, index directory, and record.
    async fn delete(&self, file_id: &str) -> Result<(), ServiceError>;

    /// Current service counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Filesystem locations owned by the service.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Raw upload directory.
    pub upload_dir: PathBuf,
    /// Vector index directory.
    pub vector_dir: PathBuf,
    /// Metadata JSON file.
    pub file_store_path: PathBuf,
}

impl StorageLayout {
    /// Place all three artifacts under `root` using their default names.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            upload_dir: root.join("uploads"),
            vector_dir: root.join("vector_db"),
            file_store_path: root.join("file_store.json"),
        }
    }
}

/// Provider capabilities plugged into the service.
pub struct Components {
    /// Turns raw bytes into text.
    pub extractor: Arc<dyn TextExtractor>,
    /// Embeds chunks and questions.
    pub embedder: Arc<dyn Embedder>,
    /// Answers rendered prompts.
    pub completion: Box<dyn CompletionClient>,
}

/// Coordinates uploads, queries, and deletions over on-disk state.
///
/// Construct once near process start and share it through an `Arc`.
pub struct DocumentService {
    records: Box<dyn RecordStore>,
    uploads: UploadStore,
    indexes: IndexStore,
    components: Components,
    splitter: TextSplitter,
    top_k: usize,
    metrics: Arc<ServiceMetrics>,
}

impl DocumentService {
    /// Build the service from configuration, creating storage directories as needed.
    pub async fn from_config(config: &Config) -> Result<Self, ServiceError> {
        tracing::info!(provider = ?config.model_provider, "Initializing model clients");
        let components = Components {
            extractor: Arc::new(PdfTextExtractor),
            embedder: build_embedder(config),
            completion: build_completion_client(config),
        };
        let layout = StorageLayout {
            upload_dir: config.upload_dir.clone(),
            vector_dir: config.vector_dir.clone(),
            file_store_path: config.file_store_path.clone(),
        };
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap, config.chunk_unit);
        Self::new(layout, components, splitter, config.retrieval_top_k).await
    }

    /// Build the service over explicit storage and components.
    pub async fn new(
        layout: StorageLayout,
        components: Components,
        splitter: TextSplitter,
        top_k: usize,
    ) -> Result<Self, ServiceError> {
        let uploads = UploadStore::new(layout.upload_dir);
        uploads.ensure_root().await?;
        let indexes = IndexStore::new(layout.vector_dir);
        indexes.ensure_root().await?;
        tracing::debug!(file_store = %layout.file_store_path.display(), "Storage ready");

        Ok(Self {
            records: Box::new(JsonRecordStore::new(layout.file_store_path)),
            uploads,
            indexes,
            components,
            splitter,
            top_k: top_k.max(1),
            metrics: Arc::new(ServiceMetrics::new()),
        })
    }

    /// All known document identifiers.
    pub async fn list_documents(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.records.list().await?)
    }

    /// Upload a document.
    ///
    /// The record is written last, so a listed identifier always has its raw file and index.
    /// On failure both are removed again and the error is logged.
    pub async fn upload(
        &self,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ServiceError> {
        let file_id = uuid::Uuid::new_v4().to_string();
        let filename = stored_filename(&file_id, original_name);

        match self.process_upload(&file_id, &filename, bytes).await {
            Ok(chunk_count) => {
                self.metrics.record_upload(chunk_count as u64);
                tracing::info!(
                    file_id = %file_id,
                    filename = %filename,
                    original = original_name,
                    chunks = chunk_count,
                    "File uploaded: {filename} (ID: {file_id})"
                );
                Ok(UploadOutcome {
                    file_id,
                    stored_filename: filename,
                    chunk_count,
                })
            }
            Err(error) => {
                tracing::error!(
                    file_id = %file_id,
                    original = original_name,
                    error = %error,
                    "Upload failed: {error}"
                );
                self.discard_artifacts(&file_id, &filename).await;
                Err(ServiceError::Upload(error))
            }
        }
    }

    async fn process_upload(
        &self,
        file_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<usize, ProcessingError> {
        self.uploads.write(filename, &bytes).await?;

        let text = extract_blocking(self.components.extractor.clone(), bytes).await?;
        let chunks = self.splitter.split(&text)?;
        if chunks.is_empty() {
            return Err(ProcessingError::EmptyDocument);
        }
        tracing::debug!(file_id, chunks = chunks.len(), "Document chunked");

        let embeddings = self
            .components
            .embedder
            .embed_documents(chunks.clone())
            .await?;
        let index = VectorIndex::build(chunks, embeddings)?;
        self.indexes.save(file_id, &index).await?;

        self.records.insert(file_id, filename).await?;
        Ok(index.len())
    }

    async fn discard_artifacts(&self, file_id: &str, filename: &str) {
        if let Err(error) = self.uploads.remove(filename).await {
            tracing::warn!(file_id, error = %error, "Failed to remove raw file after upload failure");
        }
        if let Err(error) = self.indexes.remove(file_id).await {
            tracing::warn!(file_id, error = %error, "Failed to remove index after upload failure");
        }
    }

    /// Answer a question from one document using a single-turn retrieval chain.
    pub async fn query(&self, file_id: &str, question: &str) -> Result<String, ServiceError> {
        if self.records.get(file_id).await?.is_none() {
            tracing::warn!(file_id, "Query failed: File ID not found ({file_id})");
            return Err(ServiceError::NotFound(file_id.to_string()));
        }
        if !self.indexes.exists(file_id).await {
            tracing::warn!(file_id, "Query failed: No vector data found for {file_id}");
            return Err(ServiceError::IndexMissing(file_id.to_string()));
        }

        let index = self.indexes.load(file_id).await?;
        let query_vector = self.components.embedder.embed_query(question).await?;
        let hits = index.similarity_search(&query_vector, self.top_k)?;
        tracing::debug!(
            file_id,
            retrieved = hits.len(),
            top_score = ?hits.first().map(|hit| hit.score),
            "Retrieved context"
        );

        let context: Vec<&str> = hits.iter().map(|hit| hit.text.as_str()).collect();
        let prompt = render_prompt(&context, question);
        let answer = self.components.completion.complete(&prompt).await?;

        self.metrics.record_query();
        tracing::info!(file_id, "{question} | Response: {answer}");
        Ok(answer)
    }

    /// Delete a document. Each artifact is removed only if present.
    pub async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        let Some(filename) = self.records.get(file_id).await? else {
            tracing::warn!(file_id, "Delete failed: File not found ({file_id})");
            return Err(ServiceError::NotFound(file_id.to_string()));
        };

        if self.uploads.remove(&filename).await? {
            let path = self.uploads.path_for(&filename);
            tracing::info!(file_id, "Deleted file: {}", path.display());
        }
        if self.indexes.remove(file_id).await? {
            tracing::info!(file_id, "Deleted vector index for: {file_id}");
        }
        self.records.remove(file_id).await?;

        self.metrics.record_delete();
        Ok(())
    }

    /// Return the current counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn list_documents(&self) -> Result<Vec<String>, ServiceError> {
        DocumentService::list_documents(self).await
    }

    async fn upload(
        &self,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ServiceError> {
        DocumentService::upload(self, original_name, bytes).await
    }

    async fn query(&self, file_id: &str, question: &str) -> Result<String, ServiceError> {
        DocumentService::query(self, file_id, question).await
    }

    async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        DocumentService::delete(self, file_id).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}
