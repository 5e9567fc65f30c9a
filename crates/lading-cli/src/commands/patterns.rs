//! Patterns command - inspect the field pattern catalog.

use clap::Args;
use console::style;

use lading_core::PatternCatalog;
use lading_core::extraction::catalog::SECTION_LABELS;

use super::load_config;

/// Arguments for the patterns command.
#[derive(Args)]
pub struct PatternsArgs {
    /// Only show patterns for this catalog key
    key: Option<String>,
}

pub fn run(args: PatternsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let catalog = PatternCatalog::from_config(&config.extraction)?;

    let keys: Vec<&str> = match &args.key {
        Some(key) => {
            catalog.patterns(key)?;
            vec![key.as_str()]
        }
        None => PatternCatalog::keys().collect(),
    };

    for key in keys {
        let kind = if PatternCatalog::is_block_key(key) {
            "block"
        } else if key.eq_ignore_ascii_case(SECTION_LABELS) {
            "boundary"
        } else {
            "value"
        };
        println!("{} ({})", style(key).bold(), kind);
        for (i, pattern) in catalog.patterns(key)?.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, pattern.source());
        }
        println!();
    }

    Ok(())
}
