//! Batch orchestration: one record per document, in input order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::acquisition::TextAcquisition;
use crate::error::{BatchItemError, panic_message};
use crate::extraction::FieldExtractionEngine;
use crate::models::record::{BatchSummary, BolRecord};
use crate::models::table::{NoTableExtractor, TableExtractor};
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Callback invoked with every finished record.
pub type RecordObserver = Arc<dyn Fn(&BolRecord) + Send + Sync>;

/// A document to process.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub data: Vec<u8>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    /// Read a document from disk, named after its file name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, data })
    }
}

/// Shared cancellation signal, checked before each document starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs acquisition, table lookup and field extraction per document.
///
/// A failure inside one document, including a panic, becomes a failed
/// record for that document and never stops the batch.
pub struct BatchOrchestrator<P = PdfExtractor> {
    acquisition: TextAcquisition<P>,
    engine: FieldExtractionEngine,
    tables: Arc<dyn TableExtractor>,
    observer: Option<RecordObserver>,
}

impl<P: PdfProcessor + Default> BatchOrchestrator<P> {
    pub fn new(acquisition: TextAcquisition<P>, engine: FieldExtractionEngine) -> Self {
        Self {
            acquisition,
            engine,
            tables: Arc::new(NoTableExtractor),
            observer: None,
        }
    }

    /// Use an external table extractor.
    pub fn with_table_extractor(mut self, tables: Arc<dyn TableExtractor>) -> Self {
        self.tables = tables;
        self
    }

    /// Call `observer` after each document completes.
    pub fn with_observer(mut self, observer: RecordObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn engine(&self) -> &FieldExtractionEngine {
        &self.engine
    }

    /// Process a single document. Always returns a record.
    pub fn process_one(&self, data: &[u8], filename: &str) -> BolRecord {
        let start = Instant::now();

        let record = match catch_unwind(AssertUnwindSafe(|| self.run_pipeline(data, filename))) {
            Ok(record) => record,
            Err(payload) => {
                let err = BatchItemError::Panicked {
                    filename: filename.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                error!("{}", err);
                BolRecord::failed(filename, format!("Processing error: {}", err))
            }
        };

        debug!(
            "{}: {} in {}ms",
            filename,
            record.status(),
            start.elapsed().as_millis()
        );

        if let Some(observer) = &self.observer {
            observer(&record);
        }
        record
    }

    /// Process documents one after another.
    ///
    /// Cancellation is checked before each document; documents not started
    /// produce no record.
    pub fn process_many(&self, documents: &[SourceDocument], cancel: &CancelFlag) -> Vec<BolRecord> {
        let start = Instant::now();
        let mut records = Vec::with_capacity(documents.len());

        for doc in documents {
            if cancel.is_cancelled() {
                info!("Batch cancelled after {} of {} documents", records.len(), documents.len());
                break;
            }
            records.push(self.process_one(&doc.data, &doc.filename));
        }

        log_summary(&records, start);
        records
    }

    fn run_pipeline(&self, data: &[u8], filename: &str) -> BolRecord {
        let acquired = self.acquisition.process(data, filename);
        let mut notes = acquired.notes;

        let tables = if acquired.error.is_some() {
            Vec::new()
        } else {
            match self.tables.extract_tables(data) {
                Ok(tables) => tables,
                Err(e) => {
                    debug!("{}: table extraction failed: {}", filename, e);
                    notes.push(format!("Table extraction failed: {}", e));
                    Vec::new()
                }
            }
        };

        let mut record = self.engine.extract_all(&acquired.text, &tables, filename);
        record.extraction_method = acquired.method;
        record.extraction_confidence = acquired.confidence;

        notes.append(&mut record.processing_notes);
        record.processing_notes = notes;

        if acquired.error.is_some() {
            record.extraction_failed = true;
        }

        record
    }
}

impl<P: PdfProcessor + Default + 'static> BatchOrchestrator<P> {
    /// Process documents on a bounded pool of blocking workers.
    ///
    /// At most `workers` documents run at once. Records come back in input
    /// order regardless of completion order. Cancellation is checked before
    /// each document starts.
    pub async fn process_many_concurrent(
        self: Arc<Self>,
        documents: Vec<SourceDocument>,
        workers: usize,
        cancel: CancelFlag,
    ) -> Vec<BolRecord> {
        let start = Instant::now();
        let total = documents.len();
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut handles = Vec::with_capacity(total);

        info!("Processing {} documents with {} workers", total, workers.max(1));

        for doc in documents {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            if cancel.is_cancelled() {
                info!("Batch cancelled after starting {} of {} documents", handles.len(), total);
                break;
            }

            let orchestrator = Arc::clone(&self);
            let filename = doc.filename.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                orchestrator.process_one(&doc.data, &doc.filename)
            });
            handles.push((filename, handle));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (filename, handle) in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    let err = BatchItemError::TaskFailed {
                        filename: filename.clone(),
                        reason: e.to_string(),
                    };
                    error!("{}", err);
                    records.push(BolRecord::failed(filename, format!("Processing error: {}", err)));
                }
            }
        }

        log_summary(&records, start);
        records
    }
}

fn log_summary(records: &[BolRecord], start: Instant) {
    let summary = BatchSummary::from_records(records);
    info!(
        "Batch complete: {} records ({} successful, {} failed) in {}ms",
        summary.total,
        summary.successful,
        summary.failed,
        start.elapsed().as_millis()
    );
}
