//! Engine error types.

use thiserror::Error;

use crate::grid::GridError;

/// Errors surfaced by collection operations.
///
/// Remote failures are never retried; they abort the operation in progress
/// and leave any already-applied remote steps in place.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Column offset out of range: {0} (offsets are 1-based)")]
    IndexOutOfRange(i64),

    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    #[error("Remote grid error: {0}")]
    Remote(#[from] GridError),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
