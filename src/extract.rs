//! Text extraction from uploaded documents.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while pulling text out of an uploaded file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The parser rejected the file.
    #[error("Failed to parse document: {0}")]
    Parse(String),
    /// The parser panicked or its worker was cancelled.
    #[error("Document parser aborted: {0}")]
    Aborted(String),
}

/// Capability interface for turning raw file bytes into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of every page, concatenated in page order.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// PDF extractor backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|error| ExtractError::Parse(error.to_string()))
    }
}

/// Run `extractor` on the blocking pool so parsing never stalls the async runtime.
///
/// A panic inside the parser surfaces as [`ExtractError::Aborted`].
pub async fn extract_blocking(
    extractor: Arc<dyn TextExtractor>,
    bytes: Vec<u8>,
) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
        .await
        .map_err(|error| ExtractError::Aborted(error.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingExtractor;

    impl TextExtractor for PanickingExtractor {
        fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
            panic!("malformed xref table");
        }
    }

    #[tokio::test]
    async fn pdf_extractor_rejects_non_pdf_bytes() {
        let bytes = b"definitely not a pdf".to_vec();
        let result = extract_blocking(Arc::new(PdfTextExtractor), bytes).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn parser_panic_becomes_abort_error() {
        let error = extract_blocking(Arc::new(PanickingExtractor), b"%PDF-1.4".to_vec())
            .await
            .expect_err("panic surfaces as error");
        assert!(matches!(error, ExtractError::Aborted(_)));
    }
}
