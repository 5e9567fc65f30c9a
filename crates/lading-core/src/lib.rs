//! Core library for Bill of Lading PDF ingestion.
//!
//! This crate provides:
//! - PDF processing (per-page text and page rasters)
//! - Hybrid text acquisition with quality scoring and OCR escalation
//! - A data-driven pattern catalog and field extraction engine
//! - Batch orchestration with per-document failure isolation

pub mod acquisition;
pub mod batch;
pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;

#[cfg(test)]
pub(crate) mod test_support;

pub use acquisition::{AcquiredText, QualityAssessor, TextAcquisition};
pub use batch::{BatchOrchestrator, CancelFlag, SourceDocument};
pub use error::{LadingError, Result};
pub use extraction::{FieldExtractionEngine, PatternCatalog};
pub use models::config::LadingConfig;
pub use models::record::{BatchSummary, BolField, BolRecord, Confidence, ExtractionMethod, RecordStatus};
pub use models::table::{NoTableExtractor, Table, TableExtractor};
pub use ocr::{DisabledOcr, OcrBackend};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PdfExtractor, PdfProcessor};
