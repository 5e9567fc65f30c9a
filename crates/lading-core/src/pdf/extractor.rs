//! PDF text and page-image extraction using lopdf and pdf-extract.

use std::cell::OnceCell;
use std::panic::{AssertUnwindSafe, catch_unwind};

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::{PdfError, panic_message};

/// PDF content extractor using lopdf.
///
/// Page text comes from pdf-extract and is computed once per document.
/// Page rasters are the embedded images of a page, which is what a
/// scanned Bill of Lading consists of.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
    page_text: OnceCell<std::result::Result<Vec<String>, String>>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            page_text: OnceCell::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))
    }

    fn pages_text(&self) -> Result<&[String]> {
        let pages = self.page_text.get_or_init(|| {
            // pdf-extract panics on some malformed fonts and content streams
            catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)))
                .map_err(|payload| format!("text layer panicked: {}", panic_message(payload.as_ref())))?
                .map_err(|e| e.to_string())
        });

        match pages {
            Ok(pages) => Ok(pages.as_slice()),
            Err(e) => Err(PdfError::TextExtraction(e.clone())),
        }
    }

    /// Images referenced from a page's XObject resources.
    fn page_images(&self, doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        let Some(resources) = self.page_resources(doc, page_id) else {
            return images;
        };

        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                for (_name, obj_ref) in xobj_dict.iter() {
                    if let Ok((_, obj)) = doc.dereference(obj_ref) {
                        if let Some(img) = self.decode_image_object(doc, obj) {
                            images.push(img);
                        }
                    }
                }
            }
        }

        images
    }

    /// Every image object in the document, regardless of page.
    fn all_images(&self, doc: &Document) -> Vec<DynamicImage> {
        let images: Vec<DynamicImage> = doc
            .objects
            .values()
            .filter_map(|object| self.decode_image_object(doc, object))
            .collect();

        debug!("Found {} images in document", images.len());
        images
    }

    fn decode_image_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    // JPEG bytes are usable as-is
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        if bits != 8 {
            trace!("Unsupported bits per component: {}", bits);
            return None;
        }

        raw_to_image(&data, width, height, color_space)
    }

    /// Resources dictionary for a page, following `Parent` inheritance.
    fn page_resources(&self, doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
        let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.page_resources(doc, *parent_id),
            _ => None,
        }
    }
}

/// Build an RGBA image from uncompressed 8-bit RGB or grayscale samples.
fn raw_to_image(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = (width as usize) * (height as usize);

    let channels = match color_space {
        b"DeviceRGB" | b"RGB" => 3,
        b"DeviceGray" | b"G" => 1,
        _ => {
            trace!("Unsupported color space {}", String::from_utf8_lossy(color_space));
            return None;
        }
    };

    if data.len() < pixels * channels {
        trace!(
            "Image data too short: {} bytes for {}x{}x{}",
            data.len(),
            width,
            height,
            channels
        );
        return None;
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for px in data[..pixels * channels].chunks_exact(channels) {
        match px {
            [r, g, b] => rgba.extend_from_slice(&[*r, *g, *b, 255]),
            [gray] => rgba.extend_from_slice(&[*gray, *gray, *gray, 255]),
            _ => unreachable!("chunks_exact yields {} samples", channels),
        }
    }

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Documents "encrypted" with an empty user password are common
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        self.page_text = OnceCell::new();
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        if page == 0 || page > self.page_count() {
            return Err(PdfError::InvalidPage(page));
        }

        let pages = self.pages_text()?;
        Ok(pages.get((page - 1) as usize).cloned().unwrap_or_default())
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let doc = self.document()?;
        let page_id = *doc.get_pages().get(&page).ok_or(PdfError::InvalidPage(page))?;

        trace!("Rendering page {} (embedded raster, requested {} dpi)", page, dpi);

        let mut images = self.page_images(doc, page_id);

        // Single-page scans sometimes reference their image indirectly
        if images.is_empty() && self.page_count() == 1 {
            debug!("No XObject images found on page {}, scanning all objects", page);
            images = self.all_images(doc);
        }

        images
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or_else(|| PdfError::ImageExtraction(format!("no raster image on page {}", page)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut extractor = PdfExtractor::new();
        let result = extractor.load(b"this is not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_page_text_requires_valid_page() {
        let extractor = PdfExtractor::new();
        assert!(matches!(
            extractor.extract_page_text(1),
            Err(PdfError::InvalidPage(1))
        ));
    }

    #[test]
    fn test_raw_gray_to_image() {
        let img = raw_to_image(&[0, 128, 255, 64], 2, 2, b"DeviceGray").unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.to_rgba8().get_pixel(1, 0).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_raw_rgb_too_short() {
        assert!(raw_to_image(&[1, 2, 3], 2, 1, b"DeviceRGB").is_none());
    }

    #[test]
    fn test_raw_unknown_color_space() {
        assert!(raw_to_image(&[1, 2, 3, 4], 2, 2, b"DeviceCMYK").is_none());
    }
}
