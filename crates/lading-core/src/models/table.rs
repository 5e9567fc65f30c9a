//! Generic tabular data supplied by an external table extractor.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A 2-D table with column headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column headers, left to right.
    pub headers: Vec<String>,
    /// Data rows; each row is indexed like `headers`.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Cell values of a column, top to bottom. Short rows are skipped.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).map(String::as_str))
    }

    /// Indices of columns whose header satisfies `predicate`.
    pub fn find_columns<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, header)| predicate(header))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Supplies the tables found in a document.
pub trait TableExtractor: Send + Sync {
    /// Extract all tables from raw document bytes.
    fn extract_tables(&self, data: &[u8]) -> Result<Vec<Table>>;
}

/// Table extractor that never finds any table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTableExtractor;

impl TableExtractor for NoTableExtractor {
    fn extract_tables(&self, _data: &[u8]) -> Result<Vec<Table>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cargo_table() -> Table {
        Table::new(
            vec!["Marks".to_string(), "Description of Goods".to_string()],
            vec![
                vec!["M1".to_string(), "Steel pipes".to_string()],
                vec!["M2".to_string()],
                vec!["M3".to_string(), "Copper wire".to_string()],
            ],
        )
    }

    #[test]
    fn test_column_skips_short_rows() {
        let table = cargo_table();
        let values: Vec<&str> = table.column(1).collect();
        assert_eq!(values, vec!["Steel pipes", "Copper wire"]);
    }

    #[test]
    fn test_find_columns() {
        let table = cargo_table();
        let found = table.find_columns(|h| h.to_uppercase().contains("GOODS"));
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_no_table_extractor() {
        assert!(NoTableExtractor.extract_tables(b"%PDF").unwrap().is_empty());
    }
}
