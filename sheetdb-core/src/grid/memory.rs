//! In-process grid with spreadsheet-like semantics.
//!
//! Sheets have declared dimensions (1000 x 26 unless built otherwise),
//! reads trim trailing empty cells and rows, writes skip `None` cells and
//! clear cells written with empty text, and anything outside the declared
//! grid fails the way the remote API does. Every call is counted so callers
//! can assert how much remote traffic an operation caused.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{GridClient, GridError, Row, SheetProperties};
use crate::a1::GridRange;
use crate::value::Value;

/// Rows in a newly created sheet.
pub const DEFAULT_ROW_COUNT: u32 = 1000;
/// Columns in a newly created sheet.
pub const DEFAULT_COLUMN_COUNT: u32 = 26;

const FIRST_SHEET_ID: i64 = 100;

/// Number of calls made against a [`MemoryGrid`], per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub authenticate: usize,
    pub list_sheets: usize,
    pub create_sheet: usize,
    pub apply_header_style: usize,
    pub read_range: usize,
    pub write_range: usize,
    pub insert_rows: usize,
    pub insert_columns: usize,
    pub remove_rows: usize,
}

impl CallCounts {
    /// Calls that read or change cell contents.
    pub fn data_calls(&self) -> usize {
        self.read_range
            + self.write_range
            + self.insert_rows
            + self.insert_columns
            + self.remove_rows
    }
}

#[derive(Debug)]
struct MemorySheet {
    props: SheetProperties,
    cells: Vec<Row>,
    styled: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    sheets: Vec<MemorySheet>,
    next_id: i64,
    counts: CallCounts,
    fail_write_at: Option<usize>,
}

impl MemoryState {
    fn sheet_by_title(&mut self, title: &str) -> Result<&mut MemorySheet, GridError> {
        self.sheets
            .iter_mut()
            .find(|s| s.props.title == title)
            .ok_or_else(|| GridError::SheetNotFound(title.to_string()))
    }

    fn sheet_by_id(&mut self, sheet_id: i64) -> Result<&mut MemorySheet, GridError> {
        self.sheets
            .iter_mut()
            .find(|s| s.props.sheet_id == sheet_id)
            .ok_or_else(|| GridError::SheetNotFound(sheet_id.to_string()))
    }

    fn properties(&self) -> Vec<SheetProperties> {
        self.sheets.iter().map(|s| s.props.clone()).collect()
    }

    fn add_sheet(&mut self, title: &str, row_count: u32, column_count: u32, cells: Vec<Row>) {
        if self.next_id == 0 {
            self.next_id = FIRST_SHEET_ID;
        }
        let sheet_id = self.next_id;
        self.next_id += 1;
        self.sheets.push(MemorySheet {
            props: SheetProperties {
                sheet_id,
                title: title.to_string(),
                row_count,
                column_count,
            },
            cells,
            styled: false,
        });
    }
}

/// A [`GridClient`] backed by memory.
#[derive(Debug, Default)]
pub struct MemoryGrid {
    state: Mutex<MemoryState>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet pre-filled with `rows` (row 1 first).
    pub fn with_sheet(mut self, title: &str, rows: Vec<Row>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let row_count = DEFAULT_ROW_COUNT.max(rows.len() as u32);
        let column_count = DEFAULT_COLUMN_COUNT.max(width);
        self.state
            .get_mut()
            .add_sheet(title, row_count, column_count, rows);
        self
    }

    /// Adds an empty sheet with explicit dimensions.
    pub fn with_sized_sheet(mut self, title: &str, row_count: u32, column_count: u32) -> Self {
        self.state
            .get_mut()
            .add_sheet(title, row_count, column_count, Vec::new());
        self
    }

    /// Makes the `n`th write from now on (1-based) fail.
    pub async fn fail_on_write(&self, n: usize) {
        let mut state = self.state.lock().await;
        state.fail_write_at = Some(state.counts.write_range + n);
    }

    pub async fn counts(&self) -> CallCounts {
        self.state.lock().await.counts
    }

    /// Current non-empty contents of a sheet, trimmed like a read.
    pub async fn sheet_rows(&self, title: &str) -> Option<Vec<Row>> {
        let state = self.state.lock().await;
        let sheet = state.sheets.iter().find(|s| s.props.title == title)?;
        Some(trim_rows(sheet.cells.clone()))
    }

    pub async fn sheet_properties(&self, title: &str) -> Option<SheetProperties> {
        let state = self.state.lock().await;
        state
            .sheets
            .iter()
            .find(|s| s.props.title == title)
            .map(|s| s.props.clone())
    }

    pub async fn is_styled(&self, title: &str) -> bool {
        let state = self.state.lock().await;
        state
            .sheets
            .iter()
            .any(|s| s.props.title == title && s.styled)
    }

    /// Overwrites one cell directly, as an external editor would.
    pub async fn set_cell(&self, title: &str, row: u32, column: u32, value: Option<Value>) {
        if row == 0 || column == 0 {
            return;
        }
        let mut state = self.state.lock().await;
        if let Ok(sheet) = state.sheet_by_title(title) {
            let (r, c) = (row as usize - 1, column as usize - 1);
            if sheet.cells.len() <= r {
                sheet.cells.resize(r + 1, Vec::new());
            }
            if sheet.cells[r].len() <= c {
                sheet.cells[r].resize(c + 1, None);
            }
            sheet.cells[r][c] = value;
        }
    }

    /// Removes a sheet, as if deleted by another client.
    pub async fn drop_sheet(&self, title: &str) {
        let mut state = self.state.lock().await;
        state.sheets.retain(|s| s.props.title != title);
    }
}

fn check_bounds(props: &SheetProperties, range: &GridRange) -> Result<(), GridError> {
    if range.start.row == 0 || range.start.column == 0 {
        return Err(GridError::Api {
            status: 400,
            message: format!("Unable to parse range: {}", range),
        });
    }
    if range.end.row > props.row_count || range.end.column > props.column_count {
        return Err(GridError::Api {
            status: 400,
            message: format!(
                "Range ({}) exceeds grid limits. Max rows: {}, max columns: {}",
                range, props.row_count, props.column_count
            ),
        });
    }
    Ok(())
}

fn trim_row(mut row: Row) -> Row {
    while matches!(row.last(), Some(None)) {
        row.pop();
    }
    row
}

fn trim_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut rows: Vec<Row> = rows.into_iter().map(trim_row).collect();
    while matches!(rows.last(), Some(r) if r.is_empty()) {
        rows.pop();
    }
    rows
}

#[async_trait]
impl GridClient for MemoryGrid {
    async fn authenticate(&self) -> Result<(), GridError> {
        self.state.lock().await.counts.authenticate += 1;
        Ok(())
    }

    async fn list_sheets(&self) -> Result<Vec<SheetProperties>, GridError> {
        let mut state = self.state.lock().await;
        state.counts.list_sheets += 1;
        Ok(state.properties())
    }

    async fn create_sheet(&self, title: &str) -> Result<Vec<SheetProperties>, GridError> {
        let mut state = self.state.lock().await;
        state.counts.create_sheet += 1;
        if state.sheets.iter().any(|s| s.props.title == title) {
            return Err(GridError::DuplicateName(title.to_string()));
        }
        state.add_sheet(title, DEFAULT_ROW_COUNT, DEFAULT_COLUMN_COUNT, Vec::new());
        Ok(state.properties())
    }

    async fn apply_header_style(&self, sheet_id: i64) -> Result<(), GridError> {
        let mut state = self.state.lock().await;
        state.counts.apply_header_style += 1;
        state.sheet_by_id(sheet_id)?.styled = true;
        Ok(())
    }

    async fn read_range(&self, range: &GridRange) -> Result<Option<Vec<Row>>, GridError> {
        let mut state = self.state.lock().await;
        state.counts.read_range += 1;
        let sheet = state.sheet_by_title(&range.sheet)?;
        check_bounds(&sheet.props, range)?;

        let first_col = range.start.column as usize - 1;
        let last_col = range.end.column as usize;
        let rows: Vec<Row> = (range.start.row..=range.end.row)
            .map(|r| {
                let row = sheet.cells.get(r as usize - 1);
                (first_col..last_col)
                    .map(|c| row.and_then(|row| row.get(c)).cloned().flatten())
                    .collect()
            })
            .collect();

        let rows = trim_rows(rows);
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows))
        }
    }

    async fn write_range(&self, range: &GridRange, rows: &[Row]) -> Result<(), GridError> {
        let mut state = self.state.lock().await;
        state.counts.write_range += 1;
        if state.fail_write_at == Some(state.counts.write_range) {
            state.fail_write_at = None;
            return Err(GridError::Http("connection reset".to_string()));
        }

        let sheet = state.sheet_by_title(&range.sheet)?;
        check_bounds(&sheet.props, range)?;
        if rows.len() as u32 > range.row_count()
            || rows.iter().any(|r| r.len() as u32 > range.column_count())
        {
            return Err(GridError::Api {
                status: 400,
                message: format!("Requested writing beyond the range {}", range),
            });
        }

        for (i, row) in rows.iter().enumerate() {
            let r = range.start.row as usize - 1 + i;
            if sheet.cells.len() <= r {
                sheet.cells.resize(r + 1, Vec::new());
            }
            for (j, cell) in row.iter().enumerate() {
                let Some(value) = cell else { continue };
                let c = range.start.column as usize - 1 + j;
                let target = &mut sheet.cells[r];
                if target.len() <= c {
                    target.resize(c + 1, None);
                }
                target[c] = if value.is_blank() {
                    None
                } else {
                    Some(value.clone())
                };
            }
        }
        Ok(())
    }

    async fn insert_rows(
        &self,
        sheet_id: i64,
        start_index: u32,
        count: u32,
    ) -> Result<(), GridError> {
        let mut state = self.state.lock().await;
        state.counts.insert_rows += 1;
        let sheet = state.sheet_by_id(sheet_id)?;
        if start_index > sheet.props.row_count {
            return Err(GridError::Api {
                status: 400,
                message: format!("Insert index {} is past the end of the grid", start_index),
            });
        }
        let at = start_index as usize;
        if at < sheet.cells.len() {
            for _ in 0..count {
                sheet.cells.insert(at, Vec::new());
            }
        }
        sheet.props.row_count += count;
        Ok(())
    }

    async fn insert_columns(
        &self,
        sheet_id: i64,
        start_index: u32,
        count: u32,
    ) -> Result<(), GridError> {
        let mut state = self.state.lock().await;
        state.counts.insert_columns += 1;
        let sheet = state.sheet_by_id(sheet_id)?;
        if start_index > sheet.props.column_count {
            return Err(GridError::Api {
                status: 400,
                message: format!("Insert index {} is past the end of the grid", start_index),
            });
        }
        let at = start_index as usize;
        for row in sheet.cells.iter_mut().filter(|row| at < row.len()) {
            for _ in 0..count {
                row.insert(at, None);
            }
        }
        sheet.props.column_count += count;
        Ok(())
    }

    async fn remove_rows(
        &self,
        sheet_id: i64,
        start_index: u32,
        count: u32,
    ) -> Result<(), GridError> {
        let mut state = self.state.lock().await;
        state.counts.remove_rows += 1;
        let sheet = state.sheet_by_id(sheet_id)?;
        if start_index + count > sheet.props.row_count {
            return Err(GridError::Api {
                status: 400,
                message: format!(
                    "Cannot remove rows {}..{} from a grid of {} rows",
                    start_index,
                    start_index + count,
                    sheet.props.row_count
                ),
            });
        }
        let start = (start_index as usize).min(sheet.cells.len());
        let end = ((start_index + count) as usize).min(sheet.cells.len());
        sheet.cells.drain(start..end);
        sheet.props.row_count -= count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a1::{CellRef, GridRange};

    fn text(s: &str) -> Option<Value> {
        Some(Value::from(s))
    }

    #[tokio::test]
    async fn test_read_trims_trailing_empties() {
        let grid = MemoryGrid::new().with_sheet(
            "people",
            vec![vec![text("name"), text("age")], vec![text("ann"), None]],
        );
        let rows = grid
            .read_range(&GridRange::rows("people", 1, 10, 5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rows, vec![vec![text("name"), text("age")], vec![text("ann")]]);
    }

    #[tokio::test]
    async fn test_read_empty_range_is_none() {
        let grid = MemoryGrid::new().with_sheet("people", vec![vec![text("name")]]);
        let rows = grid
            .read_range(&GridRange::rows("people", 2, 5, 3))
            .await
            .unwrap();
        assert!(rows.is_none());
    }

    #[tokio::test]
    async fn test_write_skips_holes_and_clears_blanks() {
        let grid = MemoryGrid::new().with_sheet("s", vec![vec![text("a"), text("b"), text("c")]]);
        grid.write_range(
            &GridRange::rows("s", 1, 1, 3),
            &[vec![None, text(""), text("z")]],
        )
        .await
        .unwrap();
        assert_eq!(
            grid.sheet_rows("s").await.unwrap(),
            vec![vec![text("a"), None, text("z")]]
        );
    }

    #[tokio::test]
    async fn test_write_outside_grid_fails() {
        let grid = MemoryGrid::new().with_sized_sheet("s", 2, 2);
        let range = GridRange::new("s", CellRef::new(1, 3), CellRef::new(2, 3));
        let err = grid
            .write_range(&range, &[vec![text("x")]])
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_create_duplicate_sheet_fails() {
        let grid = MemoryGrid::new().with_sheet("s", Vec::new());
        let err = grid.create_sheet("s").await.unwrap_err();
        assert!(matches!(err, GridError::DuplicateName(name) if name == "s"));
    }

    #[tokio::test]
    async fn test_insert_and_remove_rows_shift_contents() {
        let grid = MemoryGrid::new().with_sheet(
            "s",
            vec![vec![text("h")], vec![text("1")], vec![text("2")]],
        );
        let id = grid.sheet_properties("s").await.unwrap().sheet_id;

        grid.remove_rows(id, 1, 1).await.unwrap();
        assert_eq!(
            grid.sheet_rows("s").await.unwrap(),
            vec![vec![text("h")], vec![text("2")]]
        );

        grid.insert_rows(id, 1, 2).await.unwrap();
        assert_eq!(
            grid.sheet_rows("s").await.unwrap(),
            vec![vec![text("h")], vec![], vec![], vec![text("2")]]
        );
        assert_eq!(grid.sheet_properties("s").await.unwrap().row_count, 1001);
    }

    #[tokio::test]
    async fn test_insert_columns_shifts_cells_right() {
        let grid = MemoryGrid::new().with_sized_sheet("s", 5, 2);
        let id = grid.sheet_properties("s").await.unwrap().sheet_id;
        grid.write_range(
            &GridRange::rows("s", 1, 2, 2),
            &[vec![text("a"), text("b")], vec![text("1")]],
        )
        .await
        .unwrap();

        grid.insert_columns(id, 1, 2).await.unwrap();
        assert_eq!(
            grid.sheet_rows("s").await.unwrap(),
            vec![vec![text("a"), None, None, text("b")], vec![text("1")]]
        );
        assert_eq!(grid.sheet_properties("s").await.unwrap().column_count, 4);

        grid.insert_columns(id, 4, 1).await.unwrap();
        assert_eq!(grid.sheet_properties("s").await.unwrap().column_count, 5);
        assert!(grid.insert_columns(id, 9, 1).await.is_err());
        assert_eq!(grid.counts().await.insert_columns, 3);
    }

    #[tokio::test]
    async fn test_fail_on_write() {
        let grid = MemoryGrid::new().with_sheet("s", Vec::new());
        grid.fail_on_write(2).await;
        let range = GridRange::rows("s", 1, 1, 1);
        assert!(grid.write_range(&range, &[vec![text("a")]]).await.is_ok());
        assert!(grid.write_range(&range, &[vec![text("b")]]).await.is_err());
        assert!(grid.write_range(&range, &[vec![text("c")]]).await.is_ok());
        assert_eq!(grid.counts().await.write_range, 3);
    }
}
