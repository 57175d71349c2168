//! The grid client boundary.
//!
//! The engine never talks HTTP itself. Everything it needs from the remote
//! spreadsheet goes through [`GridClient`]: range reads and writes, sheet
//! creation, row insertion/removal and header styling. Every call is a
//! suspension point; the engine awaits each one before the next dependent
//! step.

mod memory;

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::a1::GridRange;
use crate::value::Value;

pub use memory::{CallCounts, MemoryGrid};

/// A cell as exchanged with the grid. `None` is an empty cell on read and
/// "leave unchanged" on write.
pub type Cell = Option<Value>;

/// One row of cells, positioned by column offset.
pub type Row = Vec<Cell>;

/// Properties of one sheet (tab) in the remote spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

/// Errors reported by a grid client.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("A sheet named '{0}' already exists")]
    DuplicateName(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("I/O error for {0:?}: {1}")]
    Io(PathBuf, #[source] io::Error),
}

/// Range-addressed access to a remote two-dimensional grid.
#[async_trait]
pub trait GridClient: Send + Sync {
    /// Establishes the session. Idempotent once authenticated.
    async fn authenticate(&self) -> Result<(), GridError>;

    /// Lists every sheet in the spreadsheet, in display order.
    async fn list_sheets(&self) -> Result<Vec<SheetProperties>, GridError>;

    /// Adds a sheet and returns the updated sheet list.
    async fn create_sheet(&self, title: &str) -> Result<Vec<SheetProperties>, GridError>;

    /// Makes row 1 of the sheet look like a header. Cosmetic.
    async fn apply_header_style(&self, sheet_id: i64) -> Result<(), GridError>;

    /// Reads a range. Returns `None` when the range holds no values.
    async fn read_range(&self, range: &GridRange) -> Result<Option<Vec<Row>>, GridError>;

    /// Writes rows of values starting at the range's top-left corner.
    async fn write_range(&self, range: &GridRange, rows: &[Row]) -> Result<(), GridError>;

    /// Inserts `count` empty rows before the 0-based grid row `start_index`.
    async fn insert_rows(&self, sheet_id: i64, start_index: u32, count: u32)
        -> Result<(), GridError>;

    /// Inserts `count` empty columns before the 0-based grid column
    /// `start_index`.
    async fn insert_columns(&self, sheet_id: i64, start_index: u32, count: u32)
        -> Result<(), GridError>;

    /// Removes `count` rows starting at the 0-based grid row `start_index`.
    async fn remove_rows(&self, sheet_id: i64, start_index: u32, count: u32)
        -> Result<(), GridError>;
}
