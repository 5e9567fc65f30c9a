//! Bill of Lading field extraction from acquired text.

pub mod catalog;
pub mod clean;
mod engine;

pub use catalog::{FieldPattern, PatternCatalog};
pub use clean::{clean_value, normalize_date};
pub use engine::FieldExtractionEngine;
