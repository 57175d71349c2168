//! Column index: field name <-> zero-based grid column offset.

use std::collections::HashMap;

use crate::grid::Row;
use crate::record::Record;
use crate::value::Value;

/// Prefix for names given to columns whose header cell is blank.
const SYNTHETIC_PREFIX: &str = "_column_";

/// Bidirectional mapping between column names and offsets.
///
/// Offsets are assigned on first sight and never reused or renumbered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    names: Vec<String>,
    offsets: HashMap<String, usize>,
    // Per offset: true when the name was made up for a blank header cell.
    synthetic: Vec<bool>,
}

impl ColumnIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index from a header row.
    ///
    /// Blank cells get a synthetic `_column_<offset>` name. A repeated header
    /// keeps its column, but lookups resolve to the first occurrence.
    pub fn from_header(header: &[Option<Value>]) -> Self {
        let mut index = Self::new();
        for (offset, cell) in header.iter().enumerate() {
            let (name, synthetic) = match cell {
                Some(value) if !value.is_blank() => (value.to_string(), false),
                _ => (synthetic_name(offset), true),
            };
            index.offsets.entry(name.clone()).or_insert(offset);
            index.names.push(name);
            index.synthetic.push(synthetic);
        }
        index
    }

    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }

    /// Returns the offset for `name`, allocating the next one if unknown.
    ///
    /// The flag is true when the index grew.
    pub fn ensure(&mut self, name: &str) -> (usize, bool) {
        if let Some(offset) = self.resolve(name) {
            return (offset, false);
        }
        let offset = self.names.len();
        self.names.push(name.to_string());
        self.synthetic.push(false);
        self.offsets.insert(name.to_string(), offset);
        (offset, true)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, offset: usize) -> Option<&str> {
        self.names.get(offset).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// True when the column at `offset` had a blank header cell.
    pub fn is_synthetic(&self, offset: usize) -> bool {
        self.synthetic.get(offset).copied().unwrap_or(false)
    }

    /// Header row as written back to the grid; synthetic names are blanked.
    pub fn header_row(&self) -> Row {
        self.names
            .iter()
            .zip(&self.synthetic)
            .map(|(name, &synthetic)| {
                if synthetic {
                    Some(Value::Text(String::new()))
                } else {
                    Some(Value::Text(name.clone()))
                }
            })
            .collect()
    }

    /// Projects a record onto these columns.
    ///
    /// Offsets the record has no value for stay `None` so the write leaves
    /// those cells alone.
    pub fn project(&self, record: &Record) -> Row {
        let mut row: Row = vec![None; self.names.len()];
        for (name, value) in record.fields() {
            if let Some(offset) = self.resolve(name) {
                row[offset] = Some(value.clone());
            }
        }
        row
    }
}

fn synthetic_name(offset: usize) -> String {
    format!("{}{}", SYNTHETIC_PREFIX, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<Value> {
        Some(Value::from(s))
    }

    #[test]
    fn test_ensure_allocates_sequentially() {
        let mut index = ColumnIndex::new();
        assert_eq!(index.ensure("name"), (0, true));
        assert_eq!(index.ensure("age"), (1, true));
        assert_eq!(index.ensure("name"), (0, false));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_offsets_are_stable_after_growth() {
        let mut index = ColumnIndex::new();
        index.ensure("a");
        let (b, _) = index.ensure("b");
        for name in ["c", "d", "e"] {
            index.ensure(name);
        }
        assert_eq!(index.resolve("b"), Some(b));
        assert_eq!(index.resolve("a"), Some(0));
        assert_eq!(index.resolve("missing"), None);
    }

    #[test]
    fn test_from_header_names_blank_cells() {
        let index = ColumnIndex::from_header(&[text("name"), None, text(""), text("age")]);
        assert_eq!(index.names(), &["name", "_column_1", "_column_2", "age"]);
        assert_eq!(index.resolve("age"), Some(3));
        assert_eq!(index.resolve("_column_1"), Some(1));
    }

    #[test]
    fn test_from_header_numeric_header_cell() {
        let index = ColumnIndex::from_header(&[Some(Value::Number(2024.0))]);
        assert_eq!(index.resolve("2024"), Some(0));
    }

    #[test]
    fn test_duplicate_header_resolves_to_first() {
        let index = ColumnIndex::from_header(&[text("x"), text("x")]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve("x"), Some(0));
        assert_eq!(index.name(1), Some("x"));
    }

    #[test]
    fn test_header_row_blanks_synthetic_names() {
        let mut index = ColumnIndex::from_header(&[None, text("name")]);
        index.ensure("email");
        assert_eq!(
            index.header_row(),
            vec![text(""), text("name"), text("email")]
        );
    }

    #[test]
    fn test_synthetic_flag_follows_the_header_cell() {
        let mut index = ColumnIndex::from_header(&[None, text("name")]);
        index.ensure("_column_3");
        assert!(index.is_synthetic(0));
        assert!(!index.is_synthetic(1));
        assert!(!index.is_synthetic(2));
        assert_eq!(
            index.header_row(),
            vec![text(""), text("name"), text("_column_3")]
        );
    }

    #[test]
    fn test_project_leaves_holes() {
        let mut index = ColumnIndex::new();
        for name in ["a", "b", "c"] {
            index.ensure(name);
        }
        let record = Record::new().with("c", 3).with("a", 1).with("z", 9);
        assert_eq!(
            index.project(&record),
            vec![Some(Value::Number(1.0)), None, Some(Value::Number(3.0))]
        );
    }
}
