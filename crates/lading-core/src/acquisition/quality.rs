//! Heuristic quality scoring of acquired text.

use crate::models::config::AcquisitionConfig;
use crate::models::record::Confidence;

/// Scores raw text on the three-level [`Confidence`] scale.
///
/// - `Low` when the trimmed text is shorter than `min_text_threshold` characters.
/// - `High` when the text is long enough, contains a field-label keyword, and
///   has at least `min_structured_lines` non-blank lines.
/// - `Medium` otherwise.
#[derive(Debug, Clone)]
pub struct QualityAssessor {
    min_text_threshold: usize,
    min_structured_lines: usize,
    keywords: Vec<String>,
}

impl QualityAssessor {
    /// Create an assessor with default thresholds and keywords.
    pub fn new() -> Self {
        Self::from_config(&AcquisitionConfig::default())
    }

    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self {
            min_text_threshold: config.min_text_threshold,
            min_structured_lines: config.min_structured_lines,
            keywords: config.quality_keywords.iter().map(|k| k.to_uppercase()).collect(),
        }
    }

    /// Set the minimum text length.
    pub fn with_min_text_threshold(mut self, threshold: usize) -> Self {
        self.min_text_threshold = threshold;
        self
    }

    pub fn min_text_threshold(&self) -> usize {
        self.min_text_threshold
    }

    /// Assess a piece of text.
    pub fn assess(&self, text: &str) -> Confidence {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_text_threshold {
            return Confidence::Low;
        }

        let upper = trimmed.to_uppercase();
        let has_label = self.keywords.iter().any(|k| upper.contains(k.as_str()));

        let structured = trimmed.lines().filter(|l| !l.trim().is_empty()).count()
            >= self.min_structured_lines;

        if has_label && structured {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }
}

impl Default for QualityAssessor {
    fn default() -> Self {
        Self::new()
    }
}
