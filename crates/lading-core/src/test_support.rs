//! In-memory PDF and OCR doubles for pipeline tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;

use crate::error::{OcrError, PdfError};
use crate::ocr::OcrBackend;
use crate::pdf::{self, PdfProcessor};

/// Page separator understood by [`FakePdf`].
pub const PAGE_BREAK: char = '\x0c';

/// A "PDF" whose bytes are UTF-8 text with pages separated by form feeds.
///
/// - `%ENCRYPTED` as the first bytes fails `load` with [`PdfError::Encrypted`].
/// - `%PANIC` as the first bytes panics inside `load`.
/// - A page consisting of `%PAGE_ERROR` fails text extraction.
/// - A page consisting of `%TEXT_PANIC` panics inside text extraction.
#[derive(Debug, Default)]
pub struct FakePdf {
    pages: Vec<String>,
}

impl PdfProcessor for FakePdf {
    fn load(&mut self, data: &[u8]) -> pdf::Result<()> {
        let text = std::str::from_utf8(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if text.starts_with("%ENCRYPTED") {
            return Err(PdfError::Encrypted);
        }
        if text.starts_with("%PANIC") {
            panic!("malformed object stream");
        }

        self.pages = text.split(PAGE_BREAK).map(str::to_string).collect();
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn extract_page_text(&self, page: u32) -> pdf::Result<String> {
        let text = page
            .checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or(PdfError::InvalidPage(page))?;

        if text == "%TEXT_PANIC" {
            panic!("pdf_extract: unsupported font encoding");
        }
        if text == "%PAGE_ERROR" {
            return Err(PdfError::TextExtraction(format!("bad content stream on page {}", page)));
        }
        Ok(text.clone())
    }

    fn render_page(&self, page: u32, _dpi: u32) -> pdf::Result<DynamicImage> {
        if page == 0 || page > self.page_count() {
            return Err(PdfError::InvalidPage(page));
        }
        Ok(DynamicImage::new_rgb8(1, 1))
    }
}

/// OCR backend returning a fixed text for every page.
#[derive(Debug, Default)]
pub struct FakeOcr {
    text: Option<String>,
    calls: AtomicUsize,
}

impl FakeOcr {
    /// Backend recognising `text` on every page.
    pub fn returning(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Backend failing on every page.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of pages sent to the backend so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrBackend for FakeOcr {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn ocr_text(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| OcrError::Recognition("no text found".to_string()))
    }
}

/// Join pages into a [`FakePdf`] document.
pub fn fake_document(pages: &[&str]) -> Vec<u8> {
    pages.join(&PAGE_BREAK.to_string()).into_bytes()
}

/// Sample Bill of Lading text with every field present.
pub const SAMPLE_BOL: &str = "\
B/L NUMBER: BOL123456789

SHIPPER:
ABC Shipping Company
123 Export Lane
Los Angeles, CA 90001

CONSIGNEE:
XYZ Import Corp
456 Harbor Blvd
New York, NY 10001

NOTIFY PARTY:
Maritime Logistics Inc
789 Dock Street
Boston, MA 02101

VESSEL: MV Ocean Carrier
VOYAGE: VOY2024001

PORT OF LOADING: Los Angeles, CA
PORT OF DISCHARGE: New York, NY

FREIGHT: PREPAID

GROSS WEIGHT: 2,500 KG
NET WEIGHT: 2,200 KG
PACKAGES: 100 CTNS

DATE: 15/03/2024

DESCRIPTION OF GOODS: Electronic Equipment and Components
";
