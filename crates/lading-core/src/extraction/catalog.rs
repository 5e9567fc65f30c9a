//! Ordered, data-driven regex patterns per Bill of Lading field.
//!
//! Each key maps to a priority list: the first pattern that yields a value
//! wins. Single-value keys capture their value in group 1. Block keys
//! (`shipper`, `consignee`, `notify_party`, `description_of_goods`) only
//! match the block label; the block runs from the end of the label to the
//! earliest `section_labels` match after it, or to the end of the text.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;

/// Catalog keys holding single-value patterns.
pub const VALUE_KEYS: [&str; 10] = [
    "bol_number",
    "vessel_name",
    "voyage_number",
    "port_of_load",
    "port_of_discharge",
    "quantity_packages",
    "gross_weight",
    "net_weight",
    "freight_terms",
    "date_of_issue",
];

/// Catalog keys holding block-label patterns.
pub const BLOCK_KEYS: [&str; 4] = ["shipper", "consignee", "notify_party", "description_of_goods"];

/// Catalog key holding the labels that end a block.
pub const SECTION_LABELS: &str = "section_labels";

const MONTHS: &str = "JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC";
const WEIGHT: &str = r"[0-9][0-9,. \t]*(?:KGS?|LBS?|MT|TONS?)\b";
const CODE: &str = r"[A-Z0-9][A-Z0-9\-]*";
const LABEL_NOTE: &str = r"(?:[ \t]*\([^)\n]*\))?";

/// One compiled pattern together with its source text.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    regex: Regex,
}

impl FieldPattern {
    /// Compile a pattern case-insensitively, with `^`/`$` at line
    /// boundaries and `.` matching newlines.
    pub fn compile(key: &str, source: &str) -> Result<Self, ExtractionError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .multi_line(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| ExtractionError::InvalidPattern {
                field: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Immutable-during-a-run mapping from catalog key to ordered patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    entries: BTreeMap<&'static str, Vec<FieldPattern>>,
}

impl PatternCatalog {
    /// The built-in Bill of Lading patterns.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();

        for (key, sources) in builtin_sources() {
            for source in sources {
                // See test_builtin_compiles_every_key
                if let Err(e) = catalog.extend(key, &source) {
                    warn!("Skipping built-in pattern: {}", e);
                }
            }
        }

        catalog
    }

    /// Built-in patterns plus the configured extras, appended per key.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let mut catalog = Self::builtin();
        for (key, sources) in &config.extra_patterns {
            for source in sources {
                catalog.extend(key, source)?;
            }
        }
        Ok(catalog)
    }

    /// Append a pattern to a key's priority list.
    pub fn extend(&mut self, key: &str, source: &str) -> Result<(), ExtractionError> {
        let key = canonical_key(key).ok_or_else(|| ExtractionError::UnknownField(key.to_string()))?;
        let pattern = FieldPattern::compile(key, source)?;
        self.entries.entry(key).or_default().push(pattern);
        Ok(())
    }

    /// Ordered patterns for a key.
    pub fn patterns(&self, key: &str) -> Result<&[FieldPattern], ExtractionError> {
        let key = canonical_key(key).ok_or_else(|| ExtractionError::UnknownField(key.to_string()))?;
        Ok(self.entries.get(key).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// All catalog keys: value keys, block keys, then `section_labels`.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        VALUE_KEYS
            .iter()
            .chain(BLOCK_KEYS.iter())
            .chain(std::iter::once(&SECTION_LABELS))
            .copied()
    }

    pub fn is_block_key(key: &str) -> bool {
        BLOCK_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
    }

    /// Total number of patterns across all keys.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn canonical_key(key: &str) -> Option<&'static str> {
    PatternCatalog::keys().find(|k| k.eq_ignore_ascii_case(key.trim()))
}

/// `LABEL: value up to end of line`.
fn line_value(label: &str) -> String {
    format!(r"{}\.?\s*:?\s*([^\n]+)", label)
}

/// A label that starts a line and is followed by `:` or the end of the line.
///
/// Compound box labels (`CONSIGNEE/IMPORTER`) and a trailing parenthetical
/// (`SHIPPER (NAME AND ADDRESS)`) count as the same label.
fn section_label(labels: &str) -> String {
    format!(
        r"^[ \t]*(?:{})(?:[ \t]*/[ \t]*[A-Z]+)*{}\.?[ \t]*(?::|$)",
        labels, LABEL_NOTE
    )
}

/// Party block label, absorbing compound and parenthetical forms.
fn party_label(label: &str) -> String {
    format!(r"\b{}\b{}\.?\s*:?", label, LABEL_NOTE)
}

fn builtin_sources() -> Vec<(&'static str, Vec<String>)> {
    let numeric_date = r"\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}";
    let iso_date = r"\d{4}-\d{1,2}-\d{1,2}";
    let day_month = format!(r"\d{{1,2}}\s+(?:{})[A-Z]*\.?,?\s+\d{{2,4}}", MONTHS);
    let month_day = format!(r"(?:{})[A-Z]*\.?\s+\d{{1,2}},?\s+\d{{2,4}}", MONTHS);
    let any_date = format!("{}|{}|{}|{}", iso_date, numeric_date, day_month, month_day);

    vec![
        (
            "bol_number",
            vec![
                format!(r"\bB/L\s*(?:Number|No|#)\.?\s*:?\s*({})", CODE),
                format!(r"\bBOL\s*(?:Number|No|#)\.?\s*:?\s*({})", CODE),
                format!(r"\bBill\s*of\s*Lading\s*(?:Number|No|#)\.?\s*:?\s*({})", CODE),
                format!(r"\bDocument\s*(?:Number|No)\.?\s*:?\s*({})", CODE),
            ],
        ),
        (
            "vessel_name",
            vec![
                line_value(r"\bVESSEL(?:\s*NAME)?"),
                line_value(r"\bSHIP\s*NAME"),
            ],
        ),
        (
            "voyage_number",
            vec![
                format!(r"\bVOYAGE(?:\s*(?:NUMBER|NO))?\.?\s*:?\s*({})", CODE),
                format!(r"\bVOY\b\.?\s*(?:NO\b\.?)?\s*:?\s*({})", CODE),
            ],
        ),
        (
            "port_of_load",
            vec![
                line_value(r"\bPORT\s*OF\s*LOAD(?:ING)?"),
                line_value(r"\bLOAD(?:ING)?\s*PORT"),
                line_value(r"\bPOL\b"),
            ],
        ),
        (
            "port_of_discharge",
            vec![
                line_value(r"\bPORT\s*OF\s*(?:DISCHARGE|DESTINATION|DEST)"),
                line_value(r"\bDISCHARGE\s*PORT"),
                line_value(r"\bPOD\b"),
            ],
        ),
        (
            "quantity_packages",
            vec![
                r"\b(?:NO\.?\s*OF\s*)?(?:PACKAGES|PKGS)\.?\s*:?\s*([0-9][0-9,.]*(?:[ \t]+[A-Z]+)?)"
                    .to_string(),
                r"\b(?:QUANTITY|QTY)\.?\s*:?\s*([0-9][0-9,.]*(?:[ \t]+[A-Z]+)?)".to_string(),
            ],
        ),
        (
            "gross_weight",
            vec![
                format!(r"\bGROSS\s*(?:WEIGHT|WT)\.?\s*:?\s*({})", WEIGHT),
                format!(r"^[ \t]*(?:WEIGHT|WT)\.?\s*:?\s*({})", WEIGHT),
                r"\bGROSS\s*(?:WEIGHT|WT)\.?\s*:?\s*([0-9][0-9,.]*)".to_string(),
            ],
        ),
        (
            "net_weight",
            vec![
                format!(r"\bNET\s*(?:WEIGHT|WT)\.?\s*:?\s*({})", WEIGHT),
                r"\bNET\s*(?:WEIGHT|WT)\.?\s*:?\s*([0-9][0-9,.]*)".to_string(),
            ],
        ),
        (
            "freight_terms",
            vec![
                r"\bFREIGHT(?:\s*TERMS)?\.?\s*:?\s*(PREPAID|COLLECT|PAYABLE)\b".to_string(),
                r"\bTERMS\.?\s*:?\s*(PREPAID|COLLECT|PAYABLE)\b".to_string(),
            ],
        ),
        (
            "date_of_issue",
            vec![
                format!(
                    r"(?:\bDATE\s*OF\s*ISSUE|\bISSUE\s*DATE|\bDATED?)\b\.?\s*:?\s*({})",
                    any_date
                ),
                format!(r"\b({})\b", iso_date),
                format!(r"\b({})\b", numeric_date),
                format!(r"\b({})\b", day_month),
                format!(r"\b({})\b", month_day),
            ],
        ),
        (
            "shipper",
            vec![
                party_label(r"SHIPPER(?:\s*/\s*EXPORTER)?"),
                party_label(r"EXPORTER(?:\s*/\s*SHIPPER)?"),
                r"^[ \t]*FROM\b\.?[ \t]*:".to_string(),
            ],
        ),
        (
            "consignee",
            vec![
                party_label(r"CONSIGNEE(?:\s*/\s*(?:IMPORTER|BUYER|ORDER))?"),
                r"^[ \t]*TO\b\.?[ \t]*:".to_string(),
            ],
        ),
        (
            "notify_party",
            vec![
                party_label(r"NOTIFY\s*PARTY"),
                party_label(r"ALSO\s*NOTIFY"),
            ],
        ),
        (
            "description_of_goods",
            vec![
                r"\bDESCRIPTION\s*OF\s*(?:GOODS|CARGO)\b\.?\s*:?".to_string(),
                r"^[ \t]*GOODS\b\.?[ \t]*:?".to_string(),
                r"^[ \t]*CARGO\b\.?[ \t]*:?".to_string(),
            ],
        ),
        (
            SECTION_LABELS,
            vec![
                // A blank line closes a block
                r"\n[ \t]*\n".to_string(),
                section_label(
                    r"SHIPPER|EXPORTER|FROM|CONSIGNEE|TO|NOTIFY(?:\s*PARTY)?|ALSO\s*NOTIFY",
                ),
                section_label(r"VESSEL(?:\s*NAME)?|SHIP\s*NAME|VOYAGE(?:\s*(?:NUMBER|NO))?|VOY"),
                section_label(
                    r"PORT\s*OF\s*[A-Z]+|LOAD(?:ING)?\s*PORT|DISCHARGE\s*PORT|PLACE\s*OF\s*[A-Z]+|POL|POD",
                ),
                section_label(
                    r"DESCRIPTION\s*OF\s*(?:GOODS|CARGO)|GOODS|CARGO|MARKS(?:\s*AND\s*NUMBERS)?|(?:NO\.?\s*OF\s*)?PACKAGES|PKGS|QUANTITY|QTY",
                ),
                section_label(r"(?:GROSS|NET)?\s*(?:WEIGHT|WT)|MEASUREMENT"),
                section_label(r"FREIGHT(?:\s*TERMS)?|TERMS|DATE(?:\s*OF\s*ISSUE)?|ISSUE\s*DATE|DATED"),
                section_label(r"(?:B/L|BOL|BILL\s*OF\s*LADING|DOCUMENT)(?:\s*(?:NUMBER|NO|#))?"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_compiles_every_key() {
        let catalog = PatternCatalog::builtin();
        let expected: usize = builtin_sources().iter().map(|(_, s)| s.len()).sum();

        assert_eq!(catalog.len(), expected);
        for key in PatternCatalog::keys() {
            assert!(!catalog.patterns(key).unwrap().is_empty(), "{} has no patterns", key);
        }
    }

    #[test]
    fn test_priority_order_preserved() {
        let catalog = PatternCatalog::builtin();
        let patterns = catalog.patterns("bol_number").unwrap();

        assert!(patterns[0].source().contains("B/L"));
        assert!(patterns[1].source().contains("BOL"));
        assert!(patterns[3].source().contains("Document"));
    }

    #[test]
    fn test_extend_appends() {
        let mut catalog = PatternCatalog::builtin();
        let before = catalog.patterns("bol_number").unwrap().len();

        catalog.extend("BOL_NUMBER", r"REF\s*:\s*([A-Z0-9]+)").unwrap();

        let patterns = catalog.patterns("bol_number").unwrap();
        assert_eq!(patterns.len(), before + 1);
        assert_eq!(patterns[before].source(), r"REF\s*:\s*([A-Z0-9]+)");
    }

    #[test]
    fn test_extend_rejects_unknown_key() {
        let mut catalog = PatternCatalog::builtin();
        let err = catalog.extend("container_number", r"(\w+)").unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownField(ref k) if k == "container_number"));
    }

    #[test]
    fn test_extend_rejects_invalid_regex() {
        let mut catalog = PatternCatalog::builtin();
        let err = catalog.extend("vessel_name", r"VESSEL:\s*(").unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidPattern { ref field, .. } if field == "vessel_name"));
    }

    #[test]
    fn test_from_config_appends_extras() {
        let mut config = ExtractionConfig::default();
        config
            .extra_patterns
            .insert("voyage_number".to_string(), vec![r"TRIP\s*:\s*(\w+)".to_string()]);

        let catalog = PatternCatalog::from_config(&config).unwrap();
        let patterns = catalog.patterns("voyage_number").unwrap();
        assert_eq!(patterns.last().unwrap().source(), r"TRIP\s*:\s*(\w+)");
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let catalog = PatternCatalog::builtin();
        let vessel = &catalog.patterns("vessel_name").unwrap()[0];
        let caps = vessel.regex().captures("Vessel: Nordic Star").unwrap();
        assert_eq!(&caps[1], "Nordic Star");
    }

    #[test]
    fn test_section_labels_need_line_start() {
        let catalog = PatternCatalog::builtin();
        let labels = catalog.patterns(SECTION_LABELS).unwrap();
        let hits = |text: &str| labels.iter().any(|p| p.regex().is_match(text));

        assert!(hits("Acme Corp\nCONSIGNEE:\nGlobex"));
        assert!(hits("1 Main St\n  VESSEL: MV Star"));
        assert!(hits("1 Main St\nCONSIGNEE/IMPORTER:\nGlobex"));
        assert!(hits("1 Main St\nNOTIFY PARTY (if any):\nInitech"));
        assert!(!hits("TO THE ORDER OF Acme Bank"));
        assert!(!hits("Goods shipped in apparent good order"));
    }
}
