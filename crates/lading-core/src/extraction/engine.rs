//! Pattern-driven Bill of Lading field extraction.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::catalog::{PatternCatalog, SECTION_LABELS};
use super::clean::{clean_value, normalize_date};
use crate::error::ExtractionError;
use crate::models::config::{DateFormat, ExtractionConfig};
use crate::models::record::{BolField, BolRecord};
use crate::models::table::Table;

/// Single-value catalog keys and the record field each fills.
const VALUE_FIELDS: [(&str, BolField); 10] = [
    ("bol_number", BolField::BolNumber),
    ("vessel_name", BolField::VesselName),
    ("voyage_number", BolField::VoyageNumber),
    ("port_of_load", BolField::PortOfLoad),
    ("port_of_discharge", BolField::PortOfDischarge),
    ("quantity_packages", BolField::QuantityPackages),
    ("gross_weight", BolField::GrossWeight),
    ("net_weight", BolField::NetWeight),
    ("freight_terms", BolField::FreightTerms),
    ("date_of_issue", BolField::DateOfIssue),
];

/// Party block keys and their name/address fields.
const PARTY_FIELDS: [(&str, BolField, BolField); 3] = [
    ("shipper", BolField::ShipperName, BolField::ShipperAddress),
    ("consignee", BolField::ConsigneeName, BolField::ConsigneeAddress),
    ("notify_party", BolField::NotifyName, BolField::NotifyAddress),
];

const GOODS_KEY: &str = "description_of_goods";

/// Separator between description fragments.
const DESCRIPTION_SEPARATOR: &str = "; ";

/// Applies a [`PatternCatalog`] to document text.
///
/// The catalog is shared read-only; the engine holds no per-document state
/// and can be used from several threads at once.
#[derive(Debug, Clone)]
pub struct FieldExtractionEngine {
    catalog: Arc<PatternCatalog>,
    config: ExtractionConfig,
}

impl FieldExtractionEngine {
    /// Create an engine with the default extraction settings.
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self::with_config(catalog, ExtractionConfig::default())
    }

    pub fn with_config(catalog: Arc<PatternCatalog>, config: ExtractionConfig) -> Self {
        Self { catalog, config }
    }

    /// Build the catalog from configuration, including extra patterns.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let catalog = PatternCatalog::from_config(config)?;
        Ok(Self::with_config(Arc::new(catalog), config.clone()))
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Extract one catalog key from text.
    ///
    /// Patterns are tried in priority order; each one contributes its first
    /// match in document order. An empty string means nothing matched. For
    /// block keys the cleaned block is returned.
    pub fn extract_field(&self, text: &str, key: &str) -> Result<String, ExtractionError> {
        if key.eq_ignore_ascii_case(GOODS_KEY) {
            return self.extract_goods_description(text);
        }
        if PatternCatalog::is_block_key(key) {
            return Ok(self.block(text, key)?.map(clean_value).unwrap_or_default());
        }
        if key.eq_ignore_ascii_case(SECTION_LABELS) {
            return Err(ExtractionError::UnknownField(key.to_string()));
        }

        for pattern in self.catalog.patterns(key)? {
            let Some(caps) = pattern.regex().captures(text) else {
                continue;
            };

            if pattern.regex().captures_len() < 2 {
                return Err(ExtractionError::MissingCaptureGroup {
                    field: key.to_string(),
                    pattern: pattern.source().to_string(),
                });
            }

            let value = caps.get(1).map(|m| clean_value(m.as_str())).unwrap_or_default();
            if !value.is_empty() {
                debug!("{} matched by {}", key, pattern.source());
                return Ok(value);
            }
        }

        Ok(String::new())
    }

    /// Extract a party block as `(name, address)`.
    ///
    /// The first line of the block is the name; the remaining lines form
    /// the address.
    pub fn extract_party(&self, text: &str, key: &str) -> Result<(String, String), ExtractionError> {
        let Some(block) = self.block(text, key)? else {
            return Ok((String::new(), String::new()));
        };

        let cleaned = clean_value(block);
        let (name, address) = cleaned.split_once('\n').unwrap_or((cleaned.as_str(), ""));
        Ok((clean_value(name), clean_value(address)))
    }

    /// Cargo description written in the text, on a single line.
    pub fn extract_goods_description(&self, text: &str) -> Result<String, ExtractionError> {
        Ok(self
            .block(text, GOODS_KEY)?
            .map(|block| clean_value(&block.replace('\n', " ")))
            .unwrap_or_default())
    }

    /// Append description cells from matching table columns to `description`.
    pub fn merge_table_descriptions(&self, description: &str, tables: &[Table]) -> String {
        let synonyms: Vec<String> = self
            .config
            .description_headers
            .iter()
            .map(|s| s.to_uppercase())
            .collect();

        let mut parts: Vec<String> = Vec::new();
        if !description.is_empty() {
            parts.push(description.to_string());
        }

        for table in tables {
            let columns = table.find_columns(|header| {
                let header = header.to_uppercase();
                synonyms.iter().any(|s| header.contains(s.as_str()))
            });

            for column in columns {
                parts.extend(
                    table
                        .column(column)
                        .map(clean_value)
                        .filter(|cell| !cell.is_empty()),
                );
            }
        }

        parts.join(DESCRIPTION_SEPARATOR)
    }

    /// Extract every field into a record. Never fails: problems become
    /// processing notes, and a missing critical field marks the record failed.
    pub fn extract_all(&self, text: &str, tables: &[Table], filename: &str) -> BolRecord {
        let start = Instant::now();
        let mut record = BolRecord::new(filename);

        for (key, field) in VALUE_FIELDS {
            match self.extract_field(text, key) {
                Ok(value) => *record.field_mut(field) = value,
                Err(e) => {
                    warn!("{}: {}", filename, e);
                    record.add_note(format!("Error extracting {}: {}", field, e));
                }
            }
        }

        for (key, name_field, address_field) in PARTY_FIELDS {
            match self.extract_party(text, key) {
                Ok((name, address)) => {
                    *record.field_mut(name_field) = name;
                    *record.field_mut(address_field) = address;
                }
                Err(e) => {
                    warn!("{}: {}", filename, e);
                    record.add_note(format!("Error extracting {}: {}", key, e));
                }
            }
        }

        let description = match self.extract_goods_description(text) {
            Ok(description) => description,
            Err(e) => {
                warn!("{}: {}", filename, e);
                record.add_note(format!("Error extracting {}: {}", GOODS_KEY, e));
                String::new()
            }
        };
        record.description_of_goods = self.merge_table_descriptions(&description, tables);

        self.apply_date_format(&mut record);

        let missing = record.missing_fields();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(BolField::as_str).collect();
            record.add_note(format!("Missing fields: {}", names.join(", ")));
        }

        for field in &self.config.critical_fields {
            if record.get(*field).is_empty() {
                record.extraction_failed = true;
                record.add_note(ExtractionError::MissingCriticalField(field.to_string()).to_string());
            }
        }

        info!(
            "{}: extracted {}/{} fields in {}ms",
            filename,
            record.populated_fields().len(),
            BolField::ALL.len(),
            start.elapsed().as_millis()
        );

        record
    }

    fn apply_date_format(&self, record: &mut BolRecord) {
        if self.config.date_format == DateFormat::Raw || record.date_of_issue.is_empty() {
            return;
        }

        match normalize_date(&record.date_of_issue, self.config.date_format) {
            Some(date) => record.date_of_issue = date,
            None => {
                let note = format!("Could not normalize date '{}'; kept as written", record.date_of_issue);
                record.add_note(note);
            }
        }
    }

    /// Raw text of the block introduced by `key`'s label.
    ///
    /// Label patterns are tried in order; the first one whose block holds
    /// any text wins. The block ends at the earliest section label after
    /// the label, or at the end of the text.
    fn block<'t>(&self, text: &'t str, key: &str) -> Result<Option<&'t str>, ExtractionError> {
        let boundaries = self.catalog.patterns(SECTION_LABELS)?;

        for label in self.catalog.patterns(key)? {
            let Some(found) = label.regex().find(text) else {
                continue;
            };

            let rest = &text[found.end()..];
            let content_start = found.end() + (rest.len() - rest.trim_start().len());

            let content_end = boundaries
                .iter()
                .filter_map(|b| b.regex().find_at(text, content_start))
                .map(|m| m.start())
                .min()
                .unwrap_or(text.len());

            let block = &text[content_start..content_end];
            if !block.trim().is_empty() {
                debug!("{} block matched by {}", key, label.source());
                return Ok(Some(block));
            }
        }

        Ok(None)
    }
}
