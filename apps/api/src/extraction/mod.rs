//! Text extraction for uploaded job-description documents.
//!
//! Both parsers are CPU-bound and run on `tokio::task::spawn_blocking`. A parser
//! panic surfaces as a join error rather than taking the request task down.

pub mod docx;
pub mod pdf;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a readable DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("document part '{0}' is missing")]
    MissingPart(&'static str),

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Upload formats the service knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Case-sensitive suffix match: `JD.PDF` is not accepted.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".pdf") {
            Some(DocumentFormat::Pdf)
        } else if filename.ends_with(".docx") {
            Some(DocumentFormat::Docx)
        } else {
            None
        }
    }
}

/// Returns the plain text of an uploaded document.
pub async fn extract_text(format: DocumentFormat, bytes: Bytes) -> Result<String, ExtractError> {
    debug!("Extracting {:?} text from {} bytes", format, bytes.len());

    tokio::task::spawn_blocking(move || match format {
        DocumentFormat::Pdf => pdf::extract_pdf_text(&bytes),
        DocumentFormat::Docx => docx::extract_docx_text(&bytes),
    })
    .await?
}
