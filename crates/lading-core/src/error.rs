//! Error types for the lading-core library.

use std::any::Any;

use thiserror::Error;

/// Main error type for the lading library.
#[derive(Error, Debug)]
pub enum LadingError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Text acquisition error.
    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Batch item error.
    #[error("batch error: {0}")]
    Batch(#[from] BatchItemError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract a page image from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// No OCR engine is available.
    #[error("OCR backend not configured: {0}")]
    NotConfigured(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised while turning a document into text.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Neither direct extraction nor OCR could open the document.
    #[error("document unreadable: {0}")]
    Unreadable(#[from] PdfError),
}

/// Errors related to BOL field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The pattern catalog has no entry with this name.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A pattern could not be compiled.
    #[error("invalid pattern for {field}: {reason}")]
    InvalidPattern { field: String, reason: String },

    /// A pattern matched but does not define capture group 1.
    #[error("pattern for {field} has no capture group 1: {pattern}")]
    MissingCaptureGroup { field: String, pattern: String },

    /// A field configured as critical was not extracted.
    #[error("critical field missing: {0}")]
    MissingCriticalField(String),
}

/// Errors isolated at the batch boundary for a single document.
#[derive(Error, Debug)]
pub enum BatchItemError {
    /// The pipeline panicked while processing the document.
    #[error("processing of {filename} panicked: {message}")]
    Panicked { filename: String, message: String },

    /// The worker task running the document could not be joined.
    #[error("worker for {filename} failed: {reason}")]
    TaskFailed { filename: String, reason: String },
}

/// Text carried by a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Result type for the lading library.
pub type Result<T> = std::result::Result<T, LadingError>;
