//! Hybrid text acquisition: direct PDF text first, OCR when it is not good enough.

mod quality;

pub use quality::QualityAssessor;

use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{AcquisitionError, PdfError, panic_message};
use crate::models::config::AcquisitionConfig;
use crate::models::record::{Confidence, ExtractionMethod};
use crate::ocr::OcrBackend;
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Separator placed between page texts.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Text recovered from one document and how it was obtained.
#[derive(Debug, Default)]
pub struct AcquiredText {
    pub text: String,
    pub method: ExtractionMethod,
    pub confidence: Confidence,
    /// Notes to be carried onto the record.
    pub notes: Vec<String>,
    /// Set when the document could not be read at all.
    pub error: Option<AcquisitionError>,
}

impl AcquiredText {
    fn unreadable(error: PdfError, mut notes: Vec<String>) -> Self {
        notes.push(format!("Document unreadable: {}", error));
        Self {
            text: String::new(),
            method: ExtractionMethod::Text,
            confidence: Confidence::Low,
            notes,
            error: Some(AcquisitionError::Unreadable(error)),
        }
    }
}

/// Direct-extraction outcome before any escalation.
struct DirectText {
    text: String,
    /// Last page error when no page could be read.
    failure: Option<PdfError>,
}

/// Turns PDF bytes into text, escalating to OCR on low-quality input.
///
/// A fresh `P` is created for every document, so one `TextAcquisition`
/// can be shared across worker threads.
pub struct TextAcquisition<P = PdfExtractor> {
    ocr: Arc<dyn OcrBackend>,
    assessor: QualityAssessor,
    config: AcquisitionConfig,
    _pdf: PhantomData<fn() -> P>,
}

impl<P: PdfProcessor + Default> TextAcquisition<P> {
    /// Create an acquisition stage with the given OCR backend.
    pub fn new(ocr: Arc<dyn OcrBackend>, config: AcquisitionConfig) -> Self {
        Self {
            ocr,
            assessor: QualityAssessor::from_config(&config),
            config,
            _pdf: PhantomData,
        }
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn assessor(&self) -> &QualityAssessor {
        &self.assessor
    }

    /// Acquire text from a document. Never fails; problems end up in
    /// `notes` and `error`.
    pub fn process(&self, data: &[u8], filename: &str) -> AcquiredText {
        let start = Instant::now();
        let mut notes = Vec::new();

        let mut pdf = P::default();
        if let Err(e) = pdf.load(data) {
            warn!("Cannot open {}: {}", filename, e);
            return AcquiredText::unreadable(e, notes);
        }

        let total = pdf.page_count();
        let pages = total.min(u32::try_from(self.config.max_page_limit).unwrap_or(u32::MAX));
        if pages < total {
            notes.push(format!(
                "Page limit reached: processed {} of {} pages",
                pages, total
            ));
        }

        let direct = self.direct_text(&pdf, pages, &mut notes);
        let direct_confidence = self.assessor.assess(&direct.text);
        debug!(
            "{}: direct text {} chars, quality {}",
            filename,
            direct.text.trim().chars().count(),
            direct_confidence
        );

        if direct.failure.is_none() && direct_confidence > Confidence::Low {
            info!("{}: using direct text ({})", filename, direct_confidence);
            return AcquiredText {
                text: direct.text,
                method: ExtractionMethod::Text,
                confidence: direct_confidence,
                notes,
                error: None,
            };
        }

        if !self.config.enable_ocr {
            notes.push("Low quality text; OCR disabled".to_string());
            return match direct.failure {
                Some(e) => AcquiredText::unreadable(e, notes),
                None => AcquiredText {
                    text: direct.text,
                    method: ExtractionMethod::Text,
                    confidence: direct_confidence,
                    notes,
                    error: None,
                },
            };
        }

        info!("{}: escalating to OCR ({})", filename, self.ocr.name());
        let ocr_text = self.ocr_text(&pdf, pages, &mut notes);
        let has_direct = !direct.text.trim().is_empty();

        let acquired = if !ocr_text.trim().is_empty() {
            let confidence = self.assessor.assess(&ocr_text);

            if confidence == Confidence::Low && self.config.merge_low_confidence && has_direct {
                notes.push("Merged direct and OCR text (both low quality)".to_string());
                AcquiredText {
                    text: format!("{}{}{}", direct.text, PAGE_SEPARATOR, ocr_text),
                    method: ExtractionMethod::TextFallback,
                    confidence: Confidence::Low,
                    notes,
                    error: None,
                }
            } else {
                if confidence == Confidence::Low {
                    notes.push("OCR text is low quality".to_string());
                }
                AcquiredText {
                    text: ocr_text,
                    method: ExtractionMethod::Ocr,
                    confidence,
                    notes,
                    error: None,
                }
            }
        } else if has_direct {
            notes.push("OCR produced no text; kept direct text".to_string());
            AcquiredText {
                text: direct.text,
                method: ExtractionMethod::TextFallback,
                confidence: direct_confidence,
                notes,
                error: None,
            }
        } else if let Some(e) = direct.failure {
            AcquiredText::unreadable(e, notes)
        } else {
            notes.push("No text recovered from document".to_string());
            AcquiredText {
                text: String::new(),
                method: ExtractionMethod::Ocr,
                confidence: Confidence::Low,
                notes,
                error: None,
            }
        };

        info!(
            "{}: acquired via {} ({}) in {}ms",
            filename,
            acquired.method,
            acquired.confidence,
            start.elapsed().as_millis()
        );
        acquired
    }

    fn direct_text(&self, pdf: &P, pages: u32, notes: &mut Vec<String>) -> DirectText {
        let mut texts = Vec::with_capacity(pages as usize);
        let mut last_error = None;

        for page in 1..=pages {
            match extract_page_guarded(pdf, page) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    debug!("Text extraction failed on page {}: {}", page, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if texts.is_empty() => {
                notes.push(format!("Direct text extraction failed: {}", e));
                DirectText {
                    text: String::new(),
                    failure: Some(e),
                }
            }
            Some(e) => {
                notes.push(format!(
                    "Direct text extraction failed on {} of {} pages: {}",
                    pages as usize - texts.len(),
                    pages,
                    e
                ));
                DirectText {
                    text: texts.join(PAGE_SEPARATOR),
                    failure: None,
                }
            }
            None => DirectText {
                text: texts.join(PAGE_SEPARATOR),
                failure: None,
            },
        }
    }

    fn ocr_text(&self, pdf: &P, pages: u32, notes: &mut Vec<String>) -> String {
        let mut texts = Vec::new();
        let mut failures = 0;
        let mut first_error = None;

        for page in 1..=pages {
            let result = pdf
                .render_page(page, self.config.render_dpi)
                .map_err(|e| e.to_string())
                .and_then(|image| self.ocr.ocr_text(&image).map_err(|e| e.to_string()));

            match result {
                Ok(text) if !text.trim().is_empty() => texts.push(text),
                Ok(_) => debug!("OCR found no text on page {}", page),
                Err(e) => {
                    debug!("OCR failed on page {}: {}", page, e);
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            notes.push(format!("OCR failed on {} of {} pages: {}", failures, pages, e));
        }

        texts.join(PAGE_SEPARATOR)
    }
}

/// Page text, with a panic in the text layer reported as a page failure.
fn extract_page_guarded<P: PdfProcessor>(pdf: &P, page: u32) -> Result<String, PdfError> {
    catch_unwind(AssertUnwindSafe(|| pdf.extract_page_text(page))).unwrap_or_else(|payload| {
        Err(PdfError::TextExtraction(format!(
            "text layer panicked on page {}: {}",
            page,
            panic_message(payload.as_ref())
        )))
    })
}
