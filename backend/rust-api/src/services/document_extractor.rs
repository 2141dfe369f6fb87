use async_trait::async_trait;
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported document: {0}")]
    Unsupported(String),

    #[error("failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("text extraction aborted: {0}")]
    Aborted(String),
}

/// Turns raw uploaded bytes into plain text.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError>;
}

pub struct PdfTextExtractor;

#[async_trait]
impl DocumentExtractor for PdfTextExtractor {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError> {
        let size = bytes.len();
        // pdf-extract is CPU bound and may panic on malformed input
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ExtractionError::Aborted(e.to_string()))?
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

        tracing::debug!(bytes = size, chars = text.chars().count(), "pdf text extracted");
        Ok(text)
    }
}

/// Accepts only PDF uploads: the bytes must carry the `%PDF-` magic and any declared
/// content type or file name must agree.
pub fn ensure_pdf(
    bytes: &[u8],
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<(), ExtractionError> {
    if let Some(ct) = content_type {
        let ct = ct.trim().to_ascii_lowercase();
        if ct != "application/pdf" && ct != "application/octet-stream" {
            return Err(ExtractionError::Unsupported(format!(
                "content type {} is not a PDF",
                ct
            )));
        }
    }

    if let Some(name) = file_name {
        let is_pdf_name = std::path::Path::new(name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf_name {
            return Err(ExtractionError::Unsupported(format!(
                "file {} is not a .pdf",
                name
            )));
        }
    }

    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ExtractionError::Unsupported(
            "file content is not a PDF".to_string(),
        ));
    }
    Ok(())
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
