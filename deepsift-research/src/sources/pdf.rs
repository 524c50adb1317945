//! PDF documents to plain text
//!
//! A target is either an http(s) URL or a local file path. Parsing runs on the
//! blocking pool since `pdf-extract` is synchronous and CPU bound.

use super::extract::HttpPageExtractor;
use async_trait::async_trait;
use deepsift_core::{retrieval_error, validation_error, ContentExtractor, DeepsiftResult};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Default cap on document size, in bytes
pub const DEFAULT_MAX_PDF_BYTES: u64 = 32 * 1024 * 1024;

/// Extracts the text layer of a PDF
pub struct PdfExtractor {
    http: HttpPageExtractor,
    max_bytes: u64,
}

impl PdfExtractor {
    pub fn new(user_agent: &str, timeout: Duration) -> DeepsiftResult<Self> {
        Ok(Self {
            http: HttpPageExtractor::new(user_agent, timeout)?,
            max_bytes: DEFAULT_MAX_PDF_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    async fn load(&self, target: &str) -> DeepsiftResult<Vec<u8>> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return self.http.fetch_bytes(target, self.name()).await;
        }

        let path = Path::new(target);
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            retrieval_error!(format!("Cannot open {}: {}", target, e), self.name(), e)
        })?;
        if metadata.len() > self.max_bytes {
            return Err(self.too_large(target, metadata.len()));
        }

        tokio::fs::read(path).await.map_err(|e| {
            retrieval_error!(format!("Failed to read {}: {}", target, e), self.name(), e)
        })
    }

    fn too_large(&self, target: &str, size: u64) -> deepsift_core::DeepsiftError {
        validation_error!(
            format!(
                "{} is {} bytes, maximum document size is {}",
                target, size, self.max_bytes
            ),
            "document",
            "pdf"
        )
    }
}

/// Text layer of an in-memory PDF, one paragraph per line
pub fn pdf_bytes_to_text(bytes: &[u8]) -> DeepsiftResult<String> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(validation_error!(
            "Document is not a PDF (missing %PDF- header)",
            "document",
            "pdf"
        ));
    }

    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| retrieval_error!(format!("Failed to parse PDF: {}", e), "pdf"))?;

    Ok(raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    async fn extract(&self, target: &str) -> DeepsiftResult<String> {
        let bytes = self.load(target).await?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(self.too_large(target, bytes.len() as u64));
        }

        let text = tokio::task::spawn_blocking(move || pdf_bytes_to_text(&bytes))
            .await
            .map_err(|e| retrieval_error!(format!("PDF parser aborted: {}", e), "pdf"))??;

        if text.is_empty() {
            return Err(retrieval_error!(
                format!("No extractable text in {}", target),
                self.name()
            ));
        }

        debug!("Extracted {} chars from PDF {}", text.len(), target);
        Ok(text)
    }
}
