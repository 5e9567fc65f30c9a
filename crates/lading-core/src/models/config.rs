//! Configuration structures for the ingestion pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LadingError, Result};
use crate::models::record::BolField;

/// Main configuration for the lading pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LadingConfig {
    /// Text acquisition configuration.
    pub acquisition: AcquisitionConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// Hybrid text/OCR acquisition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Minimum trimmed characters for text to be more than `low` quality.
    pub min_text_threshold: usize,

    /// Maximum pages processed per document.
    pub max_page_limit: usize,

    /// Escalate to OCR when direct text is insufficient.
    pub enable_ocr: bool,

    /// DPI requested when rendering pages for OCR.
    pub render_dpi: u32,

    /// Merge direct and OCR text when OCR output is also low quality.
    pub merge_low_confidence: bool,

    /// Field-label keywords that signal structured BOL text.
    pub quality_keywords: Vec<String>,

    /// Non-blank lines needed to count as address-like structure.
    pub min_structured_lines: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            min_text_threshold: 100,
            max_page_limit: 50,
            enable_ocr: true,
            render_dpi: 300,
            merge_low_confidence: false,
            quality_keywords: ["SHIPPER", "CONSIGNEE", "VESSEL", "B/L", "BOL"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_structured_lines: 5,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Keep `[UNK]` markers for unrecognised glyphs instead of blanking them.
    pub keep_unk: bool,
}

/// How `date_of_issue` is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// Keep the matched text as it appears on the document.
    #[default]
    Raw,
    /// Rewrite recognised dates as `YYYY-MM-DD`.
    Iso8601,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fields whose absence marks the whole record as failed.
    pub critical_fields: Vec<BolField>,

    /// Header keywords identifying a cargo description column in tables.
    pub description_headers: Vec<String>,

    /// Date normalisation applied to `date_of_issue`.
    pub date_format: DateFormat,

    /// Patterns appended to the built-in catalog, keyed by catalog field.
    pub extra_patterns: BTreeMap<String, Vec<String>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            critical_fields: vec![BolField::BolNumber],
            description_headers: ["DESCRIPTION", "GOODS", "CARGO", "COMMODITY"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            date_format: DateFormat::Raw,
            extra_patterns: BTreeMap::new(),
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker count for concurrent batches (0 = available CPU cores).
    pub workers: usize,
}

impl BatchConfig {
    /// Resolve the effective worker count.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// OCR model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// Whether all model files exist in `dir`.
    pub fn models_present(&self, dir: &Path) -> bool {
        [&self.detection_model, &self.recognition_model, &self.dictionary]
            .iter()
            .all(|name| dir.join(name).exists())
    }
}

impl LadingConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| LadingError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| LadingError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LadingConfig::default();
        assert_eq!(config.acquisition.min_text_threshold, 100);
        assert_eq!(config.acquisition.max_page_limit, 50);
        assert_eq!(config.extraction.critical_fields, vec![BolField::BolNumber]);
        assert_eq!(config.extraction.date_format, DateFormat::Raw);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let json = r#"{
            "acquisition": { "min_text_threshold": 250 },
            "extraction": {
                "critical_fields": ["bol_number", "shipper_name"],
                "date_format": "iso8601"
            }
        }"#;

        let config: LadingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.acquisition.min_text_threshold, 250);
        assert_eq!(config.acquisition.max_page_limit, 50);
        assert_eq!(
            config.extraction.critical_fields,
            vec![BolField::BolNumber, BolField::ShipperName]
        );
        assert_eq!(config.extraction.date_format, DateFormat::Iso8601);
        assert_eq!(config.extraction.description_headers.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = LadingConfig::default();
        config.batch.workers = 3;
        config
            .extraction
            .extra_patterns
            .insert("bol_number".to_string(), vec![r"REF\s*:\s*([A-Z0-9]+)".to_string()]);
        config.save(&path).unwrap();

        let loaded = LadingConfig::from_file(&path).unwrap();
        assert_eq!(loaded.batch.workers, 3);
        assert_eq!(loaded.extraction.extra_patterns, config.extraction.extra_patterns);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            LadingConfig::from_file(&path),
            Err(LadingError::Config(_))
        ));
    }

    #[test]
    fn test_effective_workers() {
        let config = BatchConfig { workers: 2 };
        assert_eq!(config.effective_workers(), 2);
        assert!(BatchConfig::default().effective_workers() >= 1);
    }
}
