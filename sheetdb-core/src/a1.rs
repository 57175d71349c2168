//! A1-style range addressing.
//!
//! Columns use bijective base-26 letters (A=1 ... Z=26, AA=27) and rows are
//! 1-based. The header always occupies row 1, data starts at row 2.

use std::fmt;

use crate::error::{Error, Result};

/// Remote row holding the header.
pub const HEADER_ROW: u32 = 1;
/// First remote row holding data.
pub const FIRST_DATA_ROW: u32 = 2;

/// Encodes a 1-based column number as letters.
///
/// Fails with [`Error::IndexOutOfRange`] for `n <= 0`.
pub fn column_letter(n: i64) -> Result<String> {
    if n <= 0 {
        return Err(Error::IndexOutOfRange(n));
    }

    let mut n = n;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    Ok(out.into_iter().map(char::from).collect())
}

/// Decodes column letters back to a 1-based column number.
pub fn column_number(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::IndexOutOfRange(0));
    }

    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(Error::InvalidUsage(format!(
                "Invalid column letters: {}",
                letters
            )));
        }
        let v = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or_else(|| Error::InvalidUsage(format!("Column out of range: {}", letters)))?;
    }
    Ok(col)
}

/// A single cell position, both coordinates 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Renders e.g. `C7`.
    pub fn to_a1(&self) -> Result<String> {
        Ok(format!("{}{}", column_letter(self.column as i64)?, self.row))
    }
}

/// A rectangular range on one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRange {
    pub sheet: String,
    pub start: CellRef,
    pub end: CellRef,
}

impl GridRange {
    /// Builds a range from 1-based inclusive corners.
    pub fn new(sheet: impl Into<String>, start: CellRef, end: CellRef) -> Self {
        Self {
            sheet: sheet.into(),
            start,
            end,
        }
    }

    /// `rows` rows starting at `first_row`, spanning columns `1..=columns`.
    pub fn rows(sheet: impl Into<String>, first_row: u32, rows: u32, columns: u32) -> Self {
        Self::new(
            sheet,
            CellRef::new(1, first_row),
            CellRef::new(columns, first_row + rows.saturating_sub(1)),
        )
    }

    pub fn row_count(&self) -> u32 {
        self.end.row + 1 - self.start.row
    }

    pub fn column_count(&self) -> u32 {
        self.end.column + 1 - self.start.column
    }

    /// Renders `<sheet>!<start>:<end>`, validating both corners.
    pub fn to_a1(&self) -> Result<String> {
        Ok(format!(
            "{}!{}:{}",
            quote_sheet_name(&self.sheet),
            self.start.to_a1()?,
            self.end.to_a1()?
        ))
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_a1() {
            Ok(a1) => write!(f, "{}", a1),
            Err(_) => write!(
                f,
                "{}!R{}C{}:R{}C{}",
                self.sheet, self.start.row, self.start.column, self.end.row, self.end.column
            ),
        }
    }
}

/// Quotes a sheet name unless it is plain alphanumeric/underscore.
pub fn quote_sheet_name(name: &str) -> String {
    let plain = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
