//! Integration tests for the `lading` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use predicates::prelude::*;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lading"))
}

/// An empty config file so the user's own config is never picked up.
fn isolated_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, "{}").unwrap();
    path
}

/// Build a one-page PDF with each line drawn in Courier.
fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
        Operation::new("Td", vec![50.into(), 750.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

#[test]
fn test_help_lists_commands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("patterns"));
}

#[test]
fn test_patterns_lists_catalog() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());

    cli()
        .arg("-c")
        .arg(&config)
        .arg("patterns")
        .assert()
        .success()
        .stdout(predicate::str::contains("bol_number (value)"))
        .stdout(predicate::str::contains("shipper (block)"))
        .stdout(predicate::str::contains("section_labels (boundary)"));
}

#[test]
fn test_patterns_single_key_includes_extras() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(
        &config,
        r#"{ "extraction": { "extra_patterns": { "bol_number": ["REF\\s*:\\s*([A-Z0-9]+)"] } } }"#,
    )
    .unwrap();

    cli()
        .arg("-c")
        .arg(&config)
        .args(["patterns", "bol_number"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r"REF\s*:\s*([A-Z0-9]+)"))
        .stdout(predicate::str::contains("vessel_name").not());
}

#[test]
fn test_patterns_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());

    cli()
        .arg("-c")
        .arg(&config)
        .args(["patterns", "container_seal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field: container_seal"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");

    cli()
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    cli()
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cli()
        .arg("-c")
        .arg(&config)
        .args(["config", "get", "acquisition.min_text_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::diff("100\n"));

    cli()
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "acquisition.min_text_threshold", "250"])
        .assert()
        .success();

    cli()
        .arg("-c")
        .arg(&config)
        .args(["config", "get", "acquisition.min_text_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::diff("250\n"));
}

#[test]
fn test_config_set_rejects_bad_values() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());

    cli()
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "acquisition.no_such_key", "1"])
        .assert()
        .failure();

    cli()
        .arg("-c")
        .arg(&config)
        .args(["config", "set", "extraction.extra_patterns", r#"{"bol_number": ["(unclosed"]}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pattern for bol_number"));

    // Rejected values never reach the file
    assert_eq!(fs::read_to_string(&config).unwrap(), "{}");
}

#[test]
fn test_process_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());

    cli()
        .arg("-c")
        .arg(&config)
        .args(["process", "--text-only"])
        .arg(dir.path().join("absent.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_unreadable_pdf_yields_failed_record() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());
    let input = dir.path().join("broken.pdf");
    fs::write(&input, b"this is not a pdf").unwrap();

    cli()
        .arg("-c")
        .arg(&config)
        .args(["process", "--text-only"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"filename\": \"broken.pdf\""))
        .stdout(predicate::str::contains("\"extraction_failed\": true"))
        .stdout(predicate::str::contains("Document unreadable"));
}

#[test]
fn test_process_text_pdf() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());
    let input = dir.path().join("bol.pdf");
    fs::write(
        &input,
        text_pdf(&[
            "BILL OF LADING",
            "B/L NUMBER: ABC123",
            "VESSEL: MV Northern Star",
            "PORT OF LOADING: Rotterdam",
            "PORT OF DISCHARGE: Singapore",
        ]),
    )
    .unwrap();

    let output = dir.path().join("record.json");
    cli()
        .arg("-c")
        .arg(&config)
        .args(["process", "--text-only", "-o"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let record: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(record["bol_number"], "ABC123");
    assert_eq!(record["extraction_method"], "text");
    assert_eq!(record["extraction_failed"], false);
}

#[test]
fn test_batch_writes_records_and_summary() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());
    let inputs = dir.path().join("inputs");
    fs::create_dir(&inputs).unwrap();
    fs::write(inputs.join("a.pdf"), b"garbage").unwrap();
    fs::write(inputs.join("b.pdf"), b"more garbage").unwrap();
    fs::write(inputs.join("notes.txt"), b"ignored").unwrap();

    let output = dir.path().join("out").join("records.csv");
    let summary = dir.path().join("summary.csv");

    cli()
        .arg("-c")
        .arg(&config)
        .arg("batch")
        .arg(format!("{}/*", inputs.display()))
        .args(["--text-only", "-j", "2", "-o"])
        .arg(&output)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files"))
        .stdout(predicate::str::contains("Failed files:"));

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "filename");
    assert_eq!(&headers[1], "bol_number");

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "a.pdf");
    assert_eq!(&rows[1][0], "b.pdf");
    assert!(rows.iter().all(|row| &row[21] == "true"));

    let summary = fs::read_to_string(&summary).unwrap();
    assert!(summary.contains("Total PDFs Processed,2"));
    assert!(summary.contains("Failed Extractions,2"));
}

#[test]
fn test_batch_unreadable_file_keeps_its_slot() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());
    let inputs = dir.path().join("inputs");
    fs::create_dir(&inputs).unwrap();
    fs::write(inputs.join("a.pdf"), b"garbage").unwrap();
    // A directory matches the glob but cannot be read as a file
    fs::create_dir(inputs.join("b.pdf")).unwrap();
    fs::write(inputs.join("c.pdf"), b"garbage").unwrap();

    let output = dir.path().join("records.csv");
    cli()
        .arg("-c")
        .arg(&config)
        .arg("batch")
        .arg(format!("{}/*.pdf", inputs.display()))
        .args(["--text-only", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("b.pdf: Read error:"));

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    let names: Vec<&str> = rows.iter().map(|row| &row[0]).collect();

    assert_eq!(names, ["a.pdf", "b.pdf", "c.pdf"]);
    assert!(rows[1][20].starts_with("Read error:"));
    assert!(rows[0][20].starts_with("Document unreadable"));
}

#[test]
fn test_batch_without_matches_fails() {
    let dir = TempDir::new().unwrap();
    let config = isolated_config(dir.path());

    cli()
        .arg("-c")
        .arg(&config)
        .arg("batch")
        .arg(format!("{}/*.pdf", dir.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PDF files found"));
}
