//! Bill of Lading record model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the text behind a record was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Direct text extraction, no escalation.
    #[default]
    Text,
    /// OCR over rendered page images.
    Ocr,
    /// Direct text kept (or merged with OCR text) after OCR could not do better.
    TextFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ocr => "ocr",
            Self::TextFallback => "text_fallback",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse three-level quality signal.
///
/// Variants are ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The extracted fields of a Bill of Lading, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BolField {
    BolNumber,
    ShipperName,
    ShipperAddress,
    ConsigneeName,
    ConsigneeAddress,
    NotifyName,
    NotifyAddress,
    VesselName,
    VoyageNumber,
    PortOfLoad,
    PortOfDischarge,
    DescriptionOfGoods,
    QuantityPackages,
    GrossWeight,
    NetWeight,
    FreightTerms,
    DateOfIssue,
}

impl BolField {
    /// All fields in schema order.
    pub const ALL: [BolField; 17] = [
        BolField::BolNumber,
        BolField::ShipperName,
        BolField::ShipperAddress,
        BolField::ConsigneeName,
        BolField::ConsigneeAddress,
        BolField::NotifyName,
        BolField::NotifyAddress,
        BolField::VesselName,
        BolField::VoyageNumber,
        BolField::PortOfLoad,
        BolField::PortOfDischarge,
        BolField::DescriptionOfGoods,
        BolField::QuantityPackages,
        BolField::GrossWeight,
        BolField::NetWeight,
        BolField::FreightTerms,
        BolField::DateOfIssue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BolNumber => "bol_number",
            Self::ShipperName => "shipper_name",
            Self::ShipperAddress => "shipper_address",
            Self::ConsigneeName => "consignee_name",
            Self::ConsigneeAddress => "consignee_address",
            Self::NotifyName => "notify_name",
            Self::NotifyAddress => "notify_address",
            Self::VesselName => "vessel_name",
            Self::VoyageNumber => "voyage_number",
            Self::PortOfLoad => "port_of_load",
            Self::PortOfDischarge => "port_of_discharge",
            Self::DescriptionOfGoods => "description_of_goods",
            Self::QuantityPackages => "quantity_packages",
            Self::GrossWeight => "gross_weight",
            Self::NetWeight => "net_weight",
            Self::FreightTerms => "freight_terms",
            Self::DateOfIssue => "date_of_issue",
        }
    }
}

impl fmt::Display for BolField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BolField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BolField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown field: {}", s))
    }
}

/// One processed Bill of Lading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BolRecord {
    /// Source file name (provenance only).
    pub filename: String,

    pub bol_number: String,
    pub shipper_name: String,
    pub shipper_address: String,
    pub consignee_name: String,
    pub consignee_address: String,
    pub notify_name: String,
    pub notify_address: String,
    pub vessel_name: String,
    pub voyage_number: String,
    pub port_of_load: String,
    pub port_of_discharge: String,
    pub description_of_goods: String,
    pub quantity_packages: String,
    pub gross_weight: String,
    pub net_weight: String,
    pub freight_terms: String,
    pub date_of_issue: String,

    /// How the document text was acquired.
    pub extraction_method: ExtractionMethod,

    /// Quality of the acquired text.
    pub extraction_confidence: Confidence,

    /// Append-only processing notes, oldest first.
    pub processing_notes: Vec<String>,

    /// Whether the record should be treated as failed.
    pub extraction_failed: bool,
}

/// User-facing outcome of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Every field populated, nothing noted.
    Complete,
    /// Usable record with gaps or warnings.
    Partial,
    /// Flagged as failed.
    Failed,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl BolRecord {
    /// Export column order: provenance, fields, then processing metadata.
    pub const COLUMNS: [&'static str; 22] = [
        "filename",
        "bol_number",
        "shipper_name",
        "shipper_address",
        "consignee_name",
        "consignee_address",
        "notify_name",
        "notify_address",
        "vessel_name",
        "voyage_number",
        "port_of_load",
        "port_of_discharge",
        "description_of_goods",
        "quantity_packages",
        "gross_weight",
        "net_weight",
        "freight_terms",
        "date_of_issue",
        "extraction_method",
        "extraction_confidence",
        "processing_notes",
        "extraction_failed",
    ];

    /// Create an empty record for a document.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Create a record for a document whose processing failed outright.
    pub fn failed(filename: impl Into<String>, note: impl Into<String>) -> Self {
        let mut record = Self::new(filename);
        record.extraction_failed = true;
        record.add_note(note);
        record
    }

    /// Get the value of a field.
    pub fn get(&self, field: BolField) -> &str {
        match field {
            BolField::BolNumber => &self.bol_number,
            BolField::ShipperName => &self.shipper_name,
            BolField::ShipperAddress => &self.shipper_address,
            BolField::ConsigneeName => &self.consignee_name,
            BolField::ConsigneeAddress => &self.consignee_address,
            BolField::NotifyName => &self.notify_name,
            BolField::NotifyAddress => &self.notify_address,
            BolField::VesselName => &self.vessel_name,
            BolField::VoyageNumber => &self.voyage_number,
            BolField::PortOfLoad => &self.port_of_load,
            BolField::PortOfDischarge => &self.port_of_discharge,
            BolField::DescriptionOfGoods => &self.description_of_goods,
            BolField::QuantityPackages => &self.quantity_packages,
            BolField::GrossWeight => &self.gross_weight,
            BolField::NetWeight => &self.net_weight,
            BolField::FreightTerms => &self.freight_terms,
            BolField::DateOfIssue => &self.date_of_issue,
        }
    }

    pub(crate) fn field_mut(&mut self, field: BolField) -> &mut String {
        match field {
            BolField::BolNumber => &mut self.bol_number,
            BolField::ShipperName => &mut self.shipper_name,
            BolField::ShipperAddress => &mut self.shipper_address,
            BolField::ConsigneeName => &mut self.consignee_name,
            BolField::ConsigneeAddress => &mut self.consignee_address,
            BolField::NotifyName => &mut self.notify_name,
            BolField::NotifyAddress => &mut self.notify_address,
            BolField::VesselName => &mut self.vessel_name,
            BolField::VoyageNumber => &mut self.voyage_number,
            BolField::PortOfLoad => &mut self.port_of_load,
            BolField::PortOfDischarge => &mut self.port_of_discharge,
            BolField::DescriptionOfGoods => &mut self.description_of_goods,
            BolField::QuantityPackages => &mut self.quantity_packages,
            BolField::GrossWeight => &mut self.gross_weight,
            BolField::NetWeight => &mut self.net_weight,
            BolField::FreightTerms => &mut self.freight_terms,
            BolField::DateOfIssue => &mut self.date_of_issue,
        }
    }

    /// Append a processing note.
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.processing_notes.push(note.into());
    }

    /// Fields that carry a value.
    pub fn populated_fields(&self) -> Vec<BolField> {
        BolField::ALL
            .into_iter()
            .filter(|f| !self.get(*f).is_empty())
            .collect()
    }

    /// Fields left empty.
    pub fn missing_fields(&self) -> Vec<BolField> {
        BolField::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_empty())
            .collect()
    }

    /// Classify the record as complete, partial, or failed.
    pub fn status(&self) -> RecordStatus {
        if self.extraction_failed {
            RecordStatus::Failed
        } else if self.processing_notes.is_empty() && self.missing_fields().is_empty() {
            RecordStatus::Complete
        } else {
            RecordStatus::Partial
        }
    }

    /// Column values in [`BolRecord::COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(Self::COLUMNS.len());
        row.push(self.filename.clone());
        row.extend(BolField::ALL.iter().map(|f| self.get(*f).to_string()));
        row.push(self.extraction_method.to_string());
        row.push(self.extraction_confidence.to_string());
        row.push(self.processing_notes.join("; "));
        row.push(self.extraction_failed.to_string());
        row
    }
}

/// Aggregate statistics over a batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub text: usize,
    pub ocr: usize,
    pub text_fallback: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

impl BatchSummary {
    /// Compute summary counts from a list of records.
    pub fn from_records(records: &[BolRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            if record.extraction_failed {
                summary.failed += 1;
            } else {
                summary.successful += 1;
            }

            match record.extraction_method {
                ExtractionMethod::Text => summary.text += 1,
                ExtractionMethod::Ocr => summary.ocr += 1,
                ExtractionMethod::TextFallback => summary.text_fallback += 1,
            }

            match record.extraction_confidence {
                Confidence::High => summary.high_confidence += 1,
                Confidence::Medium => summary.medium_confidence += 1,
                Confidence::Low => summary.low_confidence += 1,
            }
        }

        summary
    }

    /// Metric name and count pairs, in display order.
    pub fn metrics(&self) -> [(&'static str, usize); 9] {
        [
            ("Total PDFs Processed", self.total),
            ("Successful Extractions", self.successful),
            ("Failed Extractions", self.failed),
            ("Text-based Extractions", self.text),
            ("OCR-based Extractions", self.ocr),
            ("Text Fallback Extractions", self.text_fallback),
            ("High Confidence", self.high_confidence),
            ("Medium Confidence", self.medium_confidence),
            ("Low Confidence", self.low_confidence),
        ]
    }
}
