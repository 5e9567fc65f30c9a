//! Record export: CSV rows, processing summary, and a text view.

use std::io::Write;

use lading_core::{BatchSummary, BolField, BolRecord};

/// Write records as CSV with the stable column order.
pub fn write_records_csv<W: Write>(writer: W, records: &[BolRecord]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(BolRecord::COLUMNS)?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }

    wtr.flush()?;
    Ok(())
}

/// Records as a CSV string.
pub fn records_csv_string(records: &[BolRecord]) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    write_records_csv(&mut buffer, records)?;
    Ok(String::from_utf8(buffer)?)
}

/// Write the processing summary as `Metric,Count` rows.
pub fn write_summary_csv<W: Write>(writer: W, summary: &BatchSummary) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["Metric", "Count"])?;
    for (metric, count) in summary.metrics() {
        wtr.write_record([metric, &count.to_string()])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Human-readable view of one record.
pub fn format_text(record: &BolRecord, show_notes: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("File: {}\n", record.filename));
    output.push_str(&format!(
        "Status: {} (method: {}, confidence: {})\n\n",
        record.status(),
        record.extraction_method,
        record.extraction_confidence
    ));

    for field in BolField::ALL {
        let value = record.get(field);
        if value.is_empty() {
            continue;
        }
        // Continuation lines of addresses line up under the value
        let value = value.replace('\n', "\n                       ");
        output.push_str(&format!("  {:<20} {}\n", field.as_str(), value));
    }

    if show_notes && !record.processing_notes.is_empty() {
        output.push_str("\nNotes:\n");
        for note in &record.processing_notes {
            output.push_str(&format!("  - {}\n", note));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> BolRecord {
        let mut record = BolRecord::new("a.pdf");
        record.bol_number = "BOL1".to_string();
        record.shipper_address = "1 Main St\nSpringfield".to_string();
        record.add_note("Missing fields: vessel_name");
        record
    }

    #[test]
    fn test_records_csv_header_and_rows() {
        let csv = records_csv_string(&[record(), BolRecord::failed("b.pdf", "boom")]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert!(lines[0].starts_with("filename,bol_number,shipper_name"));
        assert!(lines[0].ends_with("processing_notes,extraction_failed"));
        assert!(csv.contains("a.pdf,BOL1"));
        assert!(csv.contains("\"1 Main St\nSpringfield\""));
        assert!(csv.trim_end().ends_with("boom,true"));
    }

    #[test]
    fn test_summary_csv() {
        let summary = BatchSummary::from_records(&[record()]);
        let mut buffer = Vec::new();
        write_summary_csv(&mut buffer, &summary).unwrap();

        let csv = String::from_utf8(buffer).unwrap();
        assert!(csv.starts_with("Metric,Count\n"));
        assert!(csv.contains("Total PDFs Processed,1\n"));
        assert!(csv.contains("Failed Extractions,0\n"));
    }

    #[test]
    fn test_text_view() {
        let text = format_text(&record(), true);
        assert!(text.contains("bol_number"));
        assert!(text.contains("BOL1"));
        assert!(!text.contains("vessel_name "));
        assert!(text.contains("Notes:\n  - Missing fields: vessel_name"));

        let quiet = format_text(&record(), false);
        assert!(!quiet.contains("Notes:"));
    }
}
