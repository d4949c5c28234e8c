//! HTTP surface for the document question-answering service.
//!
//! The Axum router exposes:
//!
//! - `GET /documents/` – List known document identifiers.
//! - `POST /upload/` – Multipart upload (field `file`); stores, indexes, and records the document.
//! - `GET /query?file_id=..&question=..` – Answer a question from one document.
//! - `DELETE /delete/:file_id` – Remove a document and all of its artifacts.
//! - `GET /metrics` – Service counters.
//!
//! Errors are returned as `{"detail": "..."}` bodies.

use crate::processing::{DocumentApi, ServiceError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const UPLOAD_FIELD: &str = "file";
const FALLBACK_FILENAME: &str = "upload.pdf";

/// Build the HTTP router. Upload bodies larger than `max_upload_bytes` are rejected.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/documents/", get(list_documents::<S>))
        .route("/documents", get(list_documents::<S>))
        .route(
            "/upload/",
            post(upload_document::<S>).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/query", get(query_document::<S>))
        .route("/query/", get(query_document::<S>))
        .route("/delete/:file_id", delete(delete_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<String>,
}

async fn list_documents<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: DocumentApi,
{
    let documents = service.list_documents().await?;
    Ok(Json(DocumentsResponse { documents }))
}

#[derive(Serialize)]
struct UploadResponse {
    file_id: String,
    message: &'static str,
}

/// Accept the first multipart field named `file` and run the upload pipeline on it.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: DocumentApi,
{
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let bytes = field.bytes().await?;
        tracing::debug!(original = %original_name, bytes = bytes.len(), "Upload received");

        let outcome = service.upload(&original_name, bytes.to_vec()).await?;
        return Ok(Json(UploadResponse {
            file_id: outcome.file_id,
            message: "File uploaded successfully",
        }));
    }
    Err(AppError::BadRequest(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}

#[derive(Deserialize)]
struct QueryParams {
    file_id: String,
    question: String,
}

#[derive(Serialize)]
struct QueryResponse {
    question: String,
    answer: String,
}

async fn query_document<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: DocumentApi,
{
    let answer = service.query(&params.file_id, &params.question).await?;
    Ok(Json(QueryResponse {
        question: params.question,
        answer,
    }))
}

#[derive(Serialize)]
struct DeleteResponse {
    file_id: String,
    message: &'static str,
}

async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError>
where
    S: DocumentApi,
{
    service.delete(&file_id).await?;
    Ok(Json(DeleteResponse {
        file_id,
        message: "File and its data deleted successfully",
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> impl IntoResponse
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    NotFound,
    NotProcessed,
    UploadFailed,
    BadRequest(String),
    Multipart(MultipartError),
    Internal(ServiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "File not found".to_string()),
            AppError::NotProcessed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Document not processed".to_string(),
            ),
            AppError::UploadFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "File upload failed".to_string(),
            ),
            AppError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            AppError::Multipart(error) => {
                tracing::warn!(error = %error, "Rejected multipart body");
                (error.status(), error.body_text())
            }
            AppError::Internal(error) => {
                tracing::error!(error = %error, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(_) => AppError::NotFound,
            ServiceError::IndexMissing(_) => AppError::NotProcessed,
            ServiceError::Upload(_) => AppError::UploadFailed,
            other => AppError::Internal(other),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> Self {
        AppError::Multipart(error)
    }
}
