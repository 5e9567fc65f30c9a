//! Subcommands and the pipeline wiring they share.

pub mod batch;
pub mod config;
pub mod export;
pub mod patterns;
pub mod process;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use lading_core::models::config::LadingConfig;
use lading_core::ocr::{DisabledOcr, OcrBackend, PureOcrEngine};
use lading_core::{BatchOrchestrator, FieldExtractionEngine, TextAcquisition};

/// Load the configuration from `-c`, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<LadingConfig> {
    if let Some(path) = config_path {
        return Ok(LadingConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config at {}", default_path.display());
        Ok(LadingConfig::from_file(&default_path)?)
    } else {
        Ok(LadingConfig::default())
    }
}

/// Assemble the acquisition, extraction and orchestration stages.
pub fn build_orchestrator(
    config: &LadingConfig,
    model_dir: Option<&Path>,
    text_only: bool,
) -> anyhow::Result<BatchOrchestrator> {
    let mut acquisition_config = config.acquisition.clone();
    if text_only {
        acquisition_config.enable_ocr = false;
    }

    let ocr = ocr_backend(config, model_dir, acquisition_config.enable_ocr);
    let acquisition = TextAcquisition::new(ocr, acquisition_config);
    let engine = FieldExtractionEngine::from_config(&config.extraction)?;

    Ok(BatchOrchestrator::new(acquisition, engine))
}

fn ocr_backend(config: &LadingConfig, model_dir: Option<&Path>, enabled: bool) -> Arc<dyn OcrBackend> {
    if !enabled {
        return Arc::new(DisabledOcr::new("OCR disabled"));
    }

    let dir = model_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.models.model_dir.clone());

    if !config.models.models_present(&dir) {
        warn!("OCR models not found in {}, scanned pages will yield no text", dir.display());
        return Arc::new(DisabledOcr::new(format!("OCR models not found in {}", dir.display())));
    }

    match PureOcrEngine::from_dir(&dir, &config.models, config.ocr.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            warn!("Failed to load OCR models: {}", e);
            Arc::new(DisabledOcr::new(e.to_string()))
        }
    }
}
