//! Collection operations: insert, find, update, delete and record refresh.
//!
//! Each operation materializes its collection first, then issues the
//! smallest range reads/writes that cover the change. Local state, the
//! column index included, is only touched after the remote call succeeded.

use tracing::{debug, info, warn};

use super::Store;
use crate::a1::{GridRange, FIRST_DATA_ROW, HEADER_ROW};
use crate::collection::Collection;
use crate::column::ColumnIndex;
use crate::error::{Error, Result};
use crate::grid::{GridClient, Row};
use crate::record::Record;
use crate::value::Value;

impl<G: GridClient> Store<G> {
    /// Inserts one record. See [`Store::insert_many`].
    pub async fn insert(&mut self, name: &str, record: &mut Record) -> Result<usize> {
        self.insert_many(name, std::slice::from_mut(record)).await
    }

    /// Appends records to a collection, creating its sheet if needed.
    ///
    /// Unknown fields get new columns and the header row is rewritten before
    /// the data. On success every record is stamped with its position and a
    /// fresh id and appended to the row cache. Returns the number of rows
    /// written.
    pub async fn insert_many(&mut self, name: &str, records: &mut [Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let needs_sheet = self
            .registry
            .get(name)
            .map_or(true, |c| c.sheet().is_none());
        if needs_sheet {
            self.create_collection(name).await?;
        } else {
            self.materialize(name).await?;
        }

        let grid = &self.grid;
        let collection = self
            .registry
            .get_mut(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;

        let (columns, header_changed) = collection.grown_columns(records);
        let values: Vec<Row> = records.iter().map(|r| columns.project(r)).collect();

        let first_row = collection.len() as u32 + FIRST_DATA_ROW;
        let range = GridRange::rows(
            name,
            first_row,
            values.len() as u32,
            columns.len() as u32,
        );
        let address = range.to_a1()?;

        if header_changed {
            resync_header(grid, collection, columns).await?;
        }
        grow_rows(grid, collection, range.end.row).await?;

        debug!(range = %address, rows = values.len(), "inserting rows");
        grid.write_range(&range, &values).await?;

        let base = collection.len();
        for (offset, record) in records.iter_mut().enumerate() {
            record.stamp(base + offset);
            collection.rows_mut().push(record.clone());
        }
        Ok(records.len())
    }

    /// Returns clones of every record matching `predicate`, in row order.
    ///
    /// The predicate sees the record, its position and the whole row cache.
    pub async fn find<F>(&mut self, name: &str, predicate: F) -> Result<Vec<Record>>
    where
        F: Fn(&Record, usize, &[Record]) -> bool,
    {
        let rows = self.loaded(name).await?.rows();
        Ok(rows
            .iter()
            .enumerate()
            .filter(|(index, record)| predicate(record, *index, rows))
            .map(|(_, record)| record.clone())
            .collect())
    }

    pub async fn find_all(&mut self, name: &str) -> Result<Vec<Record>> {
        self.find(name, |_, _, _| true).await
    }

    /// Returns the first record matching `predicate`.
    pub async fn find_one<F>(&mut self, name: &str, predicate: F) -> Result<Option<Record>>
    where
        F: Fn(&Record, usize, &[Record]) -> bool,
    {
        let rows = self.loaded(name).await?.rows();
        Ok(rows
            .iter()
            .enumerate()
            .find(|(index, record)| predicate(record, *index, rows))
            .map(|(_, record)| record.clone()))
    }

    /// Rewrites the row at `record`'s `_index` with the record's fields.
    ///
    /// Columns the record has no value for are cleared, and the cached slot
    /// is replaced wholesale. Other rows keep their positions.
    pub async fn update(&mut self, name: &str, record: &Record) -> Result<bool> {
        if !self.registry.contains(name) {
            return Err(Error::InvalidUsage(format!(
                "cannot update: collection '{}' does not exist",
                name
            )));
        }
        let index = record.index().ok_or_else(|| {
            Error::InvalidUsage("cannot update a record without an _index".to_string())
        })?;
        self.materialize(name).await?;

        let grid = &self.grid;
        let collection = self
            .registry
            .get_mut(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        check_position(collection, index)?;

        let (columns, header_changed) = collection.grown_columns(std::slice::from_ref(record));
        let row: Row = columns
            .project(record)
            .into_iter()
            .map(|cell| cell.or_else(|| Some(Value::Text(String::new()))))
            .collect();

        let range = GridRange::rows(
            name,
            index as u32 + FIRST_DATA_ROW,
            1,
            columns.len() as u32,
        );
        let address = range.to_a1()?;

        if header_changed {
            resync_header(grid, collection, columns).await?;
        }
        debug!(range = %address, "updating row");
        grid.write_range(&range, &[row]).await?;

        let mut stored = record.clone();
        stored.ensure_id();
        collection.rows_mut()[index] = stored;
        Ok(true)
    }

    /// Removes every record matching `predicate` and returns how many.
    ///
    /// Remote rows are removed one at a time from the highest position down
    /// so earlier removals never shift a row still waiting to go. Afterwards
    /// all remaining records get their new position and a fresh id.
    pub async fn delete<F>(&mut self, name: &str, predicate: F) -> Result<usize>
    where
        F: Fn(&Record, usize, &[Record]) -> bool,
    {
        self.materialize(name).await?;

        let grid = &self.grid;
        let collection = self
            .registry
            .get_mut(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;

        let rows = collection.rows();
        let positions: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(index, record)| predicate(record, *index, rows))
            .map(|(index, _)| index)
            .collect();
        if positions.is_empty() {
            return Ok(0);
        }

        let sheet_id = collection
            .sheet()
            .map(|s| s.sheet_id)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;

        let mut removed = 0;
        let mut outcome = Ok(());
        for &position in positions.iter().rev() {
            // Grid rows are 0-based here and the header is grid row 0.
            let grid_row = position as u32 + HEADER_ROW;
            debug!(collection = name, position, "removing row");
            if let Err(e) = grid.remove_rows(sheet_id, grid_row, 1).await {
                outcome = Err(Error::from(e));
                break;
            }
            collection.rows_mut().remove(position);
            if let Some(sheet) = collection.sheet_mut() {
                sheet.row_count = sheet.row_count.saturating_sub(1);
            }
            removed += 1;
        }

        collection.restamp();
        outcome?;
        info!(collection = name, removed, "deleted records");
        Ok(removed)
    }

    /// Re-reads the record's row and overwrites the fields it carries.
    ///
    /// Fields the remote row has no value for (or that have no column) are
    /// removed. `_index` and `_id` are left alone. The cached record gets the
    /// same treatment.
    pub async fn refresh_record(&mut self, name: &str, record: &mut Record) -> Result<()> {
        if !self.registry.contains(name) {
            return Err(Error::InvalidUsage(format!(
                "cannot refresh: collection '{}' does not exist",
                name
            )));
        }
        let index = record.index().ok_or_else(|| {
            Error::InvalidUsage("cannot refresh a record without an _index".to_string())
        })?;
        self.materialize(name).await?;

        let grid = &self.grid;
        let collection = self
            .registry
            .get_mut(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        check_position(collection, index)?;

        let width = collection.columns().len() as u32;
        let fetched: Row = if width == 0 {
            Vec::new()
        } else {
            let range = GridRange::rows(name, index as u32 + FIRST_DATA_ROW, 1, width);
            let address = range.to_a1()?;
            debug!(range = %address, "refreshing record");
            grid.read_range(&range)
                .await?
                .and_then(|rows| rows.into_iter().next())
                .unwrap_or_default()
        };

        let fields: Vec<String> = record.field_names().map(String::from).collect();
        let fresh: Vec<(String, Option<Value>)> = fields
            .into_iter()
            .map(|field| {
                let value = collection
                    .columns()
                    .resolve(&field)
                    .and_then(|offset| fetched.get(offset).cloned().flatten())
                    .filter(|value| !value.is_blank());
                (field, value)
            })
            .collect();

        let cached = &mut collection.rows_mut()[index];
        for (field, value) in fresh {
            match value {
                Some(value) => {
                    record.set(field.clone(), value.clone());
                    cached.set(field, value);
                }
                None => {
                    record.remove(&field);
                    cached.remove(&field);
                }
            }
        }
        Ok(())
    }

    /// Materializes a collection and returns it.
    async fn loaded(&mut self, name: &str) -> Result<&Collection> {
        self.materialize(name).await?;
        self.registry
            .get(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Creates the backing sheet for `name`, styles its header and registers
    /// it as an empty, initialized collection.
    async fn create_collection(&mut self, name: &str) -> Result<()> {
        if !self.registry.contains(name) {
            self.registry.put(Collection::shell(name, None));
        }

        info!(collection = name, "creating sheet");
        let sheet = self
            .grid
            .create_sheet(name)
            .await?
            .into_iter()
            .find(|s| s.title == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;

        if let Err(e) = self.grid.apply_header_style(sheet.sheet_id).await {
            warn!(collection = name, "failed to style header: {}", e);
        }

        self.registry.put(Collection::from_grid(sheet, None));
        Ok(())
    }
}

fn check_position(collection: &Collection, index: usize) -> Result<()> {
    if index >= collection.len() {
        return Err(Error::InvalidUsage(format!(
            "_index {} is out of range for collection '{}' ({} rows)",
            index,
            collection.name(),
            collection.len()
        )));
    }
    Ok(())
}

/// Widens the grid if needed, overwrites row 1 with the full `columns` list
/// and only then adopts `columns` as the collection's index.
async fn resync_header<G: GridClient>(
    grid: &G,
    collection: &mut Collection,
    columns: ColumnIndex,
) -> Result<()> {
    let width = columns.len() as u32;
    grow_columns(grid, collection, width).await?;

    let range = GridRange::rows(collection.name(), HEADER_ROW, 1, width);
    let address = range.to_a1()?;
    debug!(range = %address, "resyncing header");
    grid.write_range(&range, &[columns.header_row()]).await?;

    collection.set_columns(columns);
    Ok(())
}

/// Appends grid columns so that `width` columns exist.
async fn grow_columns<G: GridClient>(
    grid: &G,
    collection: &mut Collection,
    width: u32,
) -> Result<()> {
    let Some(sheet) = collection.sheet_mut() else {
        return Ok(());
    };
    if width <= sheet.column_count {
        return Ok(());
    }

    let missing = width - sheet.column_count;
    debug!(sheet = %sheet.title, missing, "widening grid");
    grid.insert_columns(sheet.sheet_id, sheet.column_count, missing)
        .await?;
    sheet.column_count = width;
    Ok(())
}

/// Appends grid rows so that `last_row` (1-based) exists.
async fn grow_rows<G: GridClient>(
    grid: &G,
    collection: &mut Collection,
    last_row: u32,
) -> Result<()> {
    let Some(sheet) = collection.sheet_mut() else {
        return Ok(());
    };
    if last_row <= sheet.row_count {
        return Ok(());
    }

    let missing = last_row - sheet.row_count;
    debug!(sheet = %sheet.title, missing, "growing grid");
    grid.insert_rows(sheet.sheet_id, sheet.row_count, missing)
        .await?;
    sheet.row_count = last_row;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridError, MemoryGrid};

    fn text(s: &str) -> Option<Value> {
        Some(Value::from(s))
    }

    fn num(n: f64) -> Option<Value> {
        Some(Value::Number(n))
    }

    async fn empty_store() -> Store<MemoryGrid> {
        Store::open(MemoryGrid::new()).await.unwrap()
    }

    /// Four rows named r0..r3 with a `keep` flag on rows 0 and 2.
    async fn four_row_store() -> Store<MemoryGrid> {
        let grid = MemoryGrid::new().with_sheet(
            "items",
            vec![
                vec![text("name"), text("keep")],
                vec![text("r0"), Some(Value::Bool(true))],
                vec![text("r1"), Some(Value::Bool(false))],
                vec![text("r2"), Some(Value::Bool(true))],
                vec![text("r3"), Some(Value::Bool(false))],
            ],
        );
        Store::open(grid).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_find_on_fresh_collection() {
        let mut store = empty_store().await;
        let mut record = Record::new().with("name", "a");

        assert_eq!(store.insert("users", &mut record).await.unwrap(), 1);
        assert_eq!(record.index(), Some(0));

        let found = store.find_all("users").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("name"), Some(&Value::from("a")));
        assert_eq!(found[0].index(), Some(0));
        assert!(!found[0].id().unwrap().is_empty());

        let grid = store.grid();
        assert!(grid.is_styled("users").await);
        assert_eq!(
            grid.sheet_rows("users").await.unwrap(),
            vec![vec![text("name")], vec![text("a")]]
        );
        let counts = grid.counts().await;
        assert_eq!(counts.create_sheet, 1);
        assert_eq!(counts.read_range, 0);
    }

    #[tokio::test]
    async fn test_insert_many_assigns_positions_in_order() {
        let mut store = empty_store().await;
        let mut records: Vec<Record> = (0..5)
            .map(|i| Record::new().with("n", i as i64))
            .collect();

        assert_eq!(store.insert_many("nums", &mut records).await.unwrap(), 5);
        let indexes: Vec<Option<usize>> = records.iter().map(Record::index).collect();
        assert_eq!(indexes, (0..5).map(Some).collect::<Vec<_>>());

        let found = store.find_all("nums").await.unwrap();
        for (i, record) in found.iter().enumerate() {
            assert_eq!(record.index(), Some(i));
            assert_eq!(record.get("n"), Some(&Value::Number(i as f64)));
        }
    }

    #[tokio::test]
    async fn test_insert_empty_does_no_io() {
        let mut store = empty_store().await;
        let before = store.grid().counts().await;
        assert_eq!(store.insert_many("users", &mut []).await.unwrap(), 0);
        assert_eq!(store.grid().counts().await, before);
        assert!(store.collection("users").is_none());
    }

    #[tokio::test]
    async fn test_insert_into_existing_appends_after_cache() {
        let mut store = four_row_store().await;
        let mut record = Record::new().with("name", "r4");
        store.insert("items", &mut record).await.unwrap();

        assert_eq!(record.index(), Some(4));
        let counts = store.grid().counts().await;
        assert_eq!(counts.read_range, 1);
        assert_eq!(counts.write_range, 1);
        assert_eq!(counts.create_sheet, 0);

        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[5], vec![text("r4")]);
    }

    #[tokio::test]
    async fn test_new_field_resyncs_header_first() {
        let mut store = four_row_store().await;
        let mut record = Record::new().with("name", "r4").with("color", "red");
        store.insert("items", &mut record).await.unwrap();

        assert_eq!(store.grid().counts().await.write_range, 2);
        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows[0], vec![text("name"), text("keep"), text("color")]);
        assert_eq!(rows[5], vec![text("r4"), None, text("red")]);
    }

    #[tokio::test]
    async fn test_header_resync_blanks_synthetic_columns() {
        let grid = MemoryGrid::new().with_sheet(
            "s",
            vec![vec![None, text("b")], vec![text("x"), text("y")]],
        );
        let mut store = Store::open(grid).await.unwrap();
        let mut record = Record::new().with("c", 1);
        store.insert("s", &mut record).await.unwrap();

        let rows = store.grid().sheet_rows("s").await.unwrap();
        assert_eq!(rows[0], vec![None, text("b"), text("c")]);
        assert_eq!(
            store.collection("s").unwrap().columns().names(),
            &["_column_0", "b", "c"]
        );
    }

    #[tokio::test]
    async fn test_failed_data_write_keeps_cache_but_not_header() {
        let mut store = four_row_store().await;
        store.grid().fail_on_write(2).await;

        let mut record = Record::new().with("name", "r4").with("color", "red");
        let err = store.insert("items", &mut record).await.unwrap_err();
        assert!(matches!(err, Error::Remote(GridError::Http(_))));

        assert_eq!(record.index(), None);
        assert_eq!(store.collection("items").unwrap().len(), 4);
        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows[0], vec![text("name"), text("keep"), text("color")]);
        assert_eq!(rows.len(), 5);
    }

    #[tokio::test]
    async fn test_failed_header_write_leaves_columns_unchanged() {
        let mut store = four_row_store().await;
        store.grid().fail_on_write(1).await;

        let mut record = Record::new().with("name", "r4").with("color", "red");
        let err = store.insert("items", &mut record).await.unwrap_err();
        assert!(matches!(err, Error::Remote(GridError::Http(_))));

        let collection = store.collection("items").unwrap();
        assert_eq!(collection.columns().names(), &["name", "keep"]);
        assert_eq!(collection.len(), 4);
        assert_eq!(record.index(), None);

        store.insert("items", &mut record).await.unwrap();
        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows[0], vec![text("name"), text("keep"), text("color")]);
        assert_eq!(rows[5], vec![text("r4"), None, text("red")]);

        store.refresh_collection("items").await.unwrap();
        let reloaded = store.find_all("items").await.unwrap().remove(4);
        assert_eq!(reloaded.get("color"), Some(&Value::from("red")));
    }

    #[tokio::test]
    async fn test_insert_widens_grid_for_wide_record() {
        let mut store = empty_store().await;
        let mut wide = (0..27).fold(Record::new(), |r, i| r.with(format!("f{}", i), i));
        store.insert("wide", &mut wide).await.unwrap();

        let grid = store.grid();
        assert_eq!(grid.counts().await.insert_columns, 1);
        assert_eq!(grid.sheet_properties("wide").await.unwrap().column_count, 27);
        let rows = grid.sheet_rows("wide").await.unwrap();
        assert_eq!(rows[0].len(), 27);
        assert_eq!(rows[0][26], text("f26"));
        assert_eq!(rows[1][26], num(26.0));

        let mut narrow = Record::new().with("f0", "x");
        store.insert("wide", &mut narrow).await.unwrap();
        assert_eq!(narrow.index(), Some(1));
        assert_eq!(store.grid().counts().await.insert_columns, 1);
    }

    #[tokio::test]
    async fn test_insert_widens_existing_sheet() {
        let grid = MemoryGrid::new().with_sized_sheet("narrow", 10, 2);
        let mut store = Store::open(grid).await.unwrap();
        let mut record = Record::new().with("a", 1).with("b", 2).with("c", 3);
        store.insert("narrow", &mut record).await.unwrap();

        let props = store.grid().sheet_properties("narrow").await.unwrap();
        assert_eq!(props.column_count, 3);
        assert_eq!(
            store.collection("narrow").unwrap().sheet().unwrap().column_count,
            3
        );
        assert_eq!(
            store.grid().sheet_rows("narrow").await.unwrap()[1],
            vec![num(1.0), num(2.0), num(3.0)]
        );
    }

    #[tokio::test]
    async fn test_insert_grows_full_grid() {
        let grid = MemoryGrid::new().with_sized_sheet("tiny", 2, 3);
        let mut store = Store::open(grid).await.unwrap();
        let mut records = vec![
            Record::new().with("a", 1),
            Record::new().with("a", 2),
            Record::new().with("a", 3),
        ];
        store.insert_many("tiny", &mut records).await.unwrap();

        let grid = store.grid();
        assert_eq!(grid.counts().await.insert_rows, 1);
        assert_eq!(grid.sheet_properties("tiny").await.unwrap().row_count, 4);
        assert_eq!(
            grid.sheet_rows("tiny").await.unwrap(),
            vec![vec![text("a")], vec![num(1.0)], vec![num(2.0)], vec![num(3.0)]]
        );
    }

    #[tokio::test]
    async fn test_insert_record_without_fields_fails() {
        let mut store = empty_store().await;
        let mut record = Record::new();
        let err = store.insert("bare", &mut record).await.unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange(0)));
        assert_eq!(store.grid().counts().await.write_range, 0);
    }

    #[tokio::test]
    async fn test_insert_retries_creation_for_sheetless_shell() {
        let mut store = empty_store().await;
        store.grid().create_sheet("late").await.unwrap();

        let mut record = Record::new().with("a", 1);
        let err = store.insert("late", &mut record).await.unwrap_err();
        assert!(matches!(err, Error::Remote(GridError::DuplicateName(_))));
        let shell = store.collection("late").unwrap();
        assert!(shell.sheet().is_none());

        store.grid().drop_sheet("late").await;
        store.insert("late", &mut record).await.unwrap();
        assert!(store.collection("late").unwrap().sheet().is_some());
        assert_eq!(record.index(), Some(0));
    }

    #[tokio::test]
    async fn test_find_materializes_once() {
        let mut store = four_row_store().await;
        store.find_all("items").await.unwrap();
        store.find_all("items").await.unwrap();
        store.find_one("items", |_, _, _| true).await.unwrap();
        assert_eq!(store.grid().counts().await.read_range, 1);
    }

    #[tokio::test]
    async fn test_find_with_predicate() {
        let mut store = four_row_store().await;
        let kept = store
            .find("items", |r, _, _| r.get("keep") == Some(&Value::Bool(true)))
            .await
            .unwrap();
        let names: Vec<String> = kept.iter().map(|r| r.get("name").unwrap().to_string()).collect();
        assert_eq!(names, vec!["r0", "r2"]);

        let last = store
            .find("items", |_, i, all| i == all.len() - 1)
            .await
            .unwrap();
        assert_eq!(last[0].get("name"), Some(&Value::from("r3")));
    }

    #[tokio::test]
    async fn test_find_one() {
        let mut store = four_row_store().await;
        let first = store
            .find_one("items", |r, _, _| r.get("keep") == Some(&Value::Bool(false)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.index(), Some(1));

        let none = store
            .find_one("items", |r, _, _| r.get("name") == Some(&Value::from("zz")))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_find_unknown_collection() {
        let mut store = empty_store().await;
        let err = store.find_all("nope").await.unwrap_err();
        assert!(matches!(err, Error::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rewrites_single_row() {
        let mut store = four_row_store().await;
        let before = store.find_all("items").await.unwrap();

        let mut record = before[2].clone();
        record.set("name", "changed");
        record.remove("keep");
        assert!(store.update("items", &record).await.unwrap());

        let after = store.find_all("items").await.unwrap();
        assert_eq!(after[2].get("name"), Some(&Value::from("changed")));
        assert_eq!(after[2].get("keep"), None);
        for i in [0, 1, 3] {
            assert_eq!(after[i], before[i]);
        }

        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows[3], vec![text("changed")]);
        assert_eq!(rows[2], vec![text("r1"), Some(Value::Bool(false))]);
        assert_eq!(store.grid().counts().await.write_range, 1);
    }

    #[tokio::test]
    async fn test_update_with_new_field_resyncs_header() {
        let mut store = four_row_store().await;
        let mut record = store.find_all("items").await.unwrap().remove(0);
        record.set("score", 9);
        store.update("items", &record).await.unwrap();

        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows[0], vec![text("name"), text("keep"), text("score")]);
        assert_eq!(rows[1], vec![text("r0"), Some(Value::Bool(true)), num(9.0)]);
        assert_eq!(store.grid().counts().await.write_range, 2);
    }

    #[tokio::test]
    async fn test_update_failed_header_write_keeps_slot_and_columns() {
        let mut store = four_row_store().await;
        let mut record = store.find_all("items").await.unwrap().remove(0);
        record.set("score", 9);
        store.grid().fail_on_write(1).await;

        let err = store.update("items", &record).await.unwrap_err();
        assert!(matches!(err, Error::Remote(GridError::Http(_))));
        let collection = store.collection("items").unwrap();
        assert_eq!(collection.columns().names(), &["name", "keep"]);
        assert_eq!(collection.rows()[0].get("score"), None);

        store.update("items", &record).await.unwrap();
        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows[0], vec![text("name"), text("keep"), text("score")]);
        assert_eq!(rows[1], vec![text("r0"), Some(Value::Bool(true)), num(9.0)]);
        assert_eq!(store.grid().counts().await.write_range, 3);
    }

    #[tokio::test]
    async fn test_update_usage_errors_have_no_effect() {
        let mut store = four_row_store().await;
        let mut record = store.find_all("items").await.unwrap().remove(0);

        let err = store.update("missing", &record).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUsage(_)));

        let unstamped = Record::new().with("name", "x");
        let err = store.update("items", &unstamped).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUsage(_)));

        record.stamp(10);
        let err = store.update("items", &record).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUsage(_)));

        assert_eq!(store.grid().counts().await.write_range, 0);
    }

    #[tokio::test]
    async fn test_column_offsets_are_monotonic() {
        let mut store = empty_store().await;
        let mut first = Record::new().with("a", 1).with("b", 2);
        store.insert("m", &mut first).await.unwrap();
        let b = store.collection("m").unwrap().columns().resolve("b");

        let mut second = Record::new().with("c", 3).with("d", 4);
        store.insert("m", &mut second).await.unwrap();
        first.set("e", 5);
        store.update("m", &first).await.unwrap();

        let columns = store.collection("m").unwrap().columns();
        assert_eq!(columns.resolve("b"), b);
        assert_eq!(columns.resolve("a"), Some(0));
        assert_eq!(columns.resolve("e"), Some(4));
    }

    #[tokio::test]
    async fn test_delete_reindexes_survivors() {
        let mut store = four_row_store().await;
        let before = store.find_all("items").await.unwrap();

        let removed = store
            .delete("items", |_, i, _| i == 1 || i == 3)
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let after = store.find_all("items").await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].index(), Some(0));
        assert_eq!(after[1].index(), Some(1));
        assert_eq!(after[0].get("name"), Some(&Value::from("r0")));
        assert_eq!(after[1].get("name"), Some(&Value::from("r2")));
        assert_ne!(after[0].id(), before[0].id());
        assert_ne!(after[1].id(), before[2].id());

        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(
            rows,
            vec![
                vec![text("name"), text("keep")],
                vec![text("r0"), Some(Value::Bool(true))],
                vec![text("r2"), Some(Value::Bool(true))],
            ]
        );
        assert_eq!(store.grid().counts().await.remove_rows, 2);
        assert_eq!(store.collection_names(), vec!["items"]);
    }

    #[tokio::test]
    async fn test_delete_without_matches() {
        let mut store = four_row_store().await;
        let removed = store.delete("items", |_, _, _| false).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.grid().counts().await.remove_rows, 0);
        assert_eq!(store.collection("items").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_insert_after_delete_targets_next_free_row() {
        let mut store = four_row_store().await;
        store
            .delete("items", |r, _, _| r.get("keep") == Some(&Value::Bool(false)))
            .await
            .unwrap();

        let mut record = Record::new().with("name", "new");
        store.insert("items", &mut record).await.unwrap();
        assert_eq!(record.index(), Some(2));

        let rows = store.grid().sheet_rows("items").await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec![text("new")]);
    }

    #[tokio::test]
    async fn test_refresh_record_pulls_remote_values() {
        let mut store = four_row_store().await;
        let mut record = store.find_all("items").await.unwrap().remove(1);
        let id = record.id().map(String::from);
        record.set("ghost", "boo");

        store.grid().set_cell("items", 3, 1, text("edited")).await;
        store.grid().set_cell("items", 3, 2, None).await;
        store.refresh_record("items", &mut record).await.unwrap();

        assert_eq!(record.get("name"), Some(&Value::from("edited")));
        assert_eq!(record.get("keep"), None);
        assert_eq!(record.get("ghost"), None);
        assert_eq!(record.index(), Some(1));
        assert_eq!(record.id().map(String::from), id);

        let cached = store.collection("items").unwrap().rows()[1].clone();
        assert_eq!(cached.get("name"), Some(&Value::from("edited")));
        assert_eq!(store.grid().counts().await.read_range, 2);
    }

    #[tokio::test]
    async fn test_refresh_record_only_touches_present_fields() {
        let mut store = four_row_store().await;
        let found = store.find_all("items").await.unwrap();
        let mut partial = found[0].clone();
        partial.remove("keep");

        store.refresh_record("items", &mut partial).await.unwrap();
        assert_eq!(partial.get("keep"), None);
        assert_eq!(partial.get("name"), Some(&Value::from("r0")));
    }

    #[tokio::test]
    async fn test_refresh_record_usage_errors() {
        let mut store = four_row_store().await;
        let mut unstamped = Record::new().with("name", "x");
        let err = store
            .refresh_record("items", &mut unstamped)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUsage(_)));

        let err = store
            .refresh_record("missing", &mut unstamped)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUsage(_)));
    }
}
