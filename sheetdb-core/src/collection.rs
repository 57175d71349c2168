//! One logical table backed by one sheet.

use crate::column::ColumnIndex;
use crate::grid::{Row, SheetProperties};
use crate::record::{is_reserved, Record};

/// A collection and its in-memory state.
///
/// An uninitialized collection only knows its name and sheet; the column
/// index and row cache are loaded on first use.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    sheet: Option<SheetProperties>,
    columns: ColumnIndex,
    rows: Vec<Record>,
    initialized: bool,
}

impl Collection {
    /// An unmaterialized shell for an existing (or not yet created) sheet.
    pub fn shell(name: impl Into<String>, sheet: Option<SheetProperties>) -> Self {
        Self {
            name: name.into(),
            sheet,
            columns: ColumnIndex::new(),
            rows: Vec::new(),
            initialized: false,
        }
    }

    /// Builds an initialized collection from the grid contents of its sheet.
    ///
    /// Row 1 is the header. Each following row becomes a record stamped with
    /// its position among data rows and a fresh id. Blank cells are omitted.
    pub fn from_grid(sheet: SheetProperties, grid_rows: Option<Vec<Row>>) -> Self {
        let mut grid_rows = grid_rows.unwrap_or_default().into_iter();
        let columns = grid_rows
            .next()
            .map(|header| ColumnIndex::from_header(&header))
            .unwrap_or_default();

        let rows = grid_rows
            .enumerate()
            .map(|(index, row)| {
                let mut record = Record::new();
                for (offset, cell) in row.into_iter().enumerate() {
                    let (Some(value), Some(name)) = (cell, columns.name(offset)) else {
                        continue;
                    };
                    if value.is_blank() || record.get(name).is_some() {
                        continue;
                    }
                    record.set(name, value);
                }
                record.stamp(index);
                record
            })
            .collect();

        Self {
            name: sheet.title.clone(),
            sheet: Some(sheet),
            columns,
            rows,
            initialized: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet(&self) -> Option<&SheetProperties> {
        self.sheet.as_ref()
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn sheet_mut(&mut self) -> Option<&mut SheetProperties> {
        self.sheet.as_mut()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Record> {
        &mut self.rows
    }

    /// Returns the column index this collection would have after allocating
    /// every non-reserved field of `records`, and whether it grew.
    ///
    /// The collection itself is left alone; see [`Collection::set_columns`].
    pub(crate) fn grown_columns(&self, records: &[Record]) -> (ColumnIndex, bool) {
        let mut columns = self.columns.clone();
        let mut grew = false;
        for record in records {
            for name in record.field_names().filter(|name| !is_reserved(name)) {
                grew |= columns.ensure(name).1;
            }
        }
        (columns, grew)
    }

    pub(crate) fn set_columns(&mut self, columns: ColumnIndex) {
        self.columns = columns;
    }

    /// Re-stamps every cached record with its position and a fresh id.
    pub(crate) fn restamp(&mut self) {
        for (index, record) in self.rows.iter_mut().enumerate() {
            record.stamp(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sheet(title: &str) -> SheetProperties {
        SheetProperties {
            sheet_id: 7,
            title: title.to_string(),
            row_count: 1000,
            column_count: 26,
        }
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::from(s))
    }

    #[test]
    fn test_shell_is_uninitialized() {
        let collection = Collection::shell("users", None);
        assert!(!collection.is_initialized());
        assert!(collection.sheet().is_none());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_from_grid_maps_rows_to_records() {
        let collection = Collection::from_grid(
            sheet("users"),
            Some(vec![
                vec![text("name"), None, text("age")],
                vec![text("ann"), text("x"), Some(Value::Number(31.0))],
                vec![text("bob")],
            ]),
        );

        assert!(collection.is_initialized());
        assert_eq!(collection.columns().names(), &["name", "_column_1", "age"]);
        assert_eq!(collection.len(), 2);

        let ann = &collection.rows()[0];
        assert_eq!(ann.index(), Some(0));
        assert!(ann.id().is_some());
        assert_eq!(ann.get("name"), text("ann").as_ref());
        assert_eq!(ann.get("_column_1"), text("x").as_ref());
        assert_eq!(ann.get("age"), Some(&Value::Number(31.0)));

        let bob = &collection.rows()[1];
        assert_eq!(bob.index(), Some(1));
        assert_eq!(bob.get("age"), None);
    }

    #[test]
    fn test_from_grid_empty_sheet() {
        let collection = Collection::from_grid(sheet("empty"), None);
        assert!(collection.is_initialized());
        assert!(collection.columns().is_empty());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_from_grid_skips_blank_cells() {
        let collection = Collection::from_grid(
            sheet("s"),
            Some(vec![vec![text("a"), text("b")], vec![text(""), text("1")]]),
        );
        let record = &collection.rows()[0];
        assert_eq!(record.get("a"), None);
        assert_eq!(record.get("b"), text("1").as_ref());
    }

    #[test]
    fn test_grown_columns_does_not_touch_collection() {
        let collection = Collection::from_grid(
            sheet("s"),
            Some(vec![vec![text("a"), text("b")]]),
        );
        let known = Record::new().with("b", 2);
        let (columns, grew) = collection.grown_columns(std::slice::from_ref(&known));
        assert!(!grew);
        assert_eq!(columns, *collection.columns());

        let records = vec![Record::new().with("c", 3), Record::new().with("a", 1).with("d", 4)];
        let (columns, grew) = collection.grown_columns(&records);
        assert!(grew);
        assert_eq!(columns.names(), &["a", "b", "c", "d"]);
        assert_eq!(collection.columns().names(), &["a", "b"]);
    }

    #[test]
    fn test_set_columns_commits_growth() {
        let mut collection = Collection::from_grid(sheet("s"), None);
        let (columns, _) = collection.grown_columns(&[Record::new().with("a", 1)]);
        collection.set_columns(columns);
        assert_eq!(collection.columns().resolve("a"), Some(0));
    }
}
