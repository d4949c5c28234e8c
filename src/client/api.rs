use reqwest::blocking::{Client, Response, multipart};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by [`ApiClient`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with a non-success status.
    #[error("{operation} failed (HTTP {status})")]
    Failed {
        /// Operation that was attempted.
        operation: &'static str,
        /// Status code returned.
        status: u16,
    },
    /// The request could not be sent or the body could not be decoded.
    #[error("{operation} failed: {source}")]
    Transport {
        /// Operation that was attempted.
        operation: &'static str,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// A local file could not be read for upload.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File the client tried to read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

#[derive(Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    documents: Vec<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file_id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    answer: Option<String>,
}

/// Blocking HTTP client for the document service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client targeting `base_url` (for example `http://127.0.0.1:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch all document identifiers.
    pub fn list_documents(&self) -> Result<Vec<String>, ClientError> {
        const OPERATION: &str = "list documents";
        let response = self
            .http
            .get(format!("{}/documents/", self.base_url))
            .send()
            .map_err(|source| transport(OPERATION, source))?;
        let body: DocumentsResponse = decode(OPERATION, response)?;
        Ok(body.documents)
    }

    /// Upload the file at `path` as the multipart field `file`. Returns the new identifier.
    pub fn upload(&self, path: &Path) -> Result<String, ClientError> {
        const OPERATION: &str = "upload";
        let bytes = std::fs::read(path).map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|source| transport(OPERATION, source))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/upload/", self.base_url))
            .multipart(form)
            .send()
            .map_err(|source| transport(OPERATION, source))?;
        let body: UploadResponse = decode(OPERATION, response)?;
        Ok(body.file_id)
    }

    /// Ask `question` about document `file_id`.
    pub fn query(&self, file_id: &str, question: &str) -> Result<String, ClientError> {
        const OPERATION: &str = "query";
        let response = self
            .http
            .get(format!("{}/query/", self.base_url))
            .query(&[("file_id", file_id), ("question", question)])
            .send()
            .map_err(|source| transport(OPERATION, source))?;
        let body: QueryResponse = decode(OPERATION, response)?;
        Ok(body.answer.unwrap_or_else(|| "No answer found.".to_string()))
    }

    /// Delete document `file_id`.
    pub fn delete(&self, file_id: &str) -> Result<(), ClientError> {
        const OPERATION: &str = "delete";
        let response = self
            .http
            .delete(format!("{}/delete/{file_id}", self.base_url))
            .send()
            .map_err(|source| transport(OPERATION, source))?;
        ensure_success(OPERATION, &response)
    }
}

fn transport(operation: &'static str, source: reqwest::Error) -> ClientError {
    ClientError::Transport { operation, source }
}

fn ensure_success(operation: &'static str, response: &Response) -> Result<(), ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        tracing::debug!(operation, status = status.as_u16(), "Request rejected");
        Err(ClientError::Failed {
            operation,
            status: status.as_u16(),
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T, ClientError> {
    ensure_success(operation, &response)?;
    response
        .json()
        .map_err(|source| transport(operation, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;

    #[test]
    fn list_documents_reads_identifiers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/documents/");
            then.status(200)
                .json_body(serde_json::json!({ "documents": ["a", "b"] }));
        });

        let client = ApiClient::new(server.base_url());
        assert_eq!(client.list_documents().unwrap(), vec!["a", "b"]);
        mock.assert();
    }

    #[test]
    fn upload_sends_file_field() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/upload/")
                .header_exists("content-type")
                .body_contains("name=\"file\"")
                .body_contains("filename=\"notes.pdf\"")
                .body_contains("%PDF-1.4 hello");
            then.status(200).json_body(serde_json::json!({
                "file_id": "new-id",
                "message": "File uploaded successfully"
            }));
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.4 hello")
            .unwrap();

        let client = ApiClient::new(format!("{}/", server.base_url()));
        assert_eq!(client.upload(&path).unwrap(), "new-id");
        mock.assert();
    }

    #[test]
    fn upload_of_missing_file_is_io_error() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let error = client.upload(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(error, ClientError::Io { .. }));
    }

    #[test]
    fn query_passes_parameters() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/query/")
                .query_param("file_id", "doc")
                .query_param("question", "Who wrote it?");
            then.status(200).json_body(serde_json::json!({
                "question": "Who wrote it?",
                "answer": "Ada"
            }));
        });

        let client = ApiClient::new(server.base_url());
        assert_eq!(client.query("doc", "Who wrote it?").unwrap(), "Ada");
        mock.assert();
    }

    #[test]
    fn non_success_status_maps_to_failed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/delete/missing");
            then.status(404)
                .json_body(serde_json::json!({ "detail": "File not found" }));
        });

        let client = ApiClient::new(server.base_url());
        let error = client.delete("missing").unwrap_err();
        assert!(matches!(
            error,
            ClientError::Failed {
                operation: "delete",
                status: 404
            }
        ));
    }
}
