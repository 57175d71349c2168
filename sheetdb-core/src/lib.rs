//! sheetdb core library
//!
//! A collection store over a remote spreadsheet: each sheet is a collection,
//! row 1 holds the column names and every following row is a record.

pub mod a1;
pub mod collection;
pub mod column;
pub mod error;
pub mod grid;
pub mod record;
pub mod registry;
pub mod sheets;
pub mod store;
pub mod value;

pub use a1::{column_letter, column_number, CellRef, GridRange};
pub use collection::Collection;
pub use column::ColumnIndex;
pub use error::{Error, Result};
pub use grid::{GridClient, GridError, MemoryGrid, SheetProperties};
pub use record::Record;
pub use registry::Registry;
pub use sheets::{Authenticator, ClientSecret, SheetsClient, Token};
pub use store::Store;
pub use value::Value;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
