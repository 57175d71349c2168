//! Wire types for the Sheets v4 REST API.
//!
//! Only the fields this crate reads or writes are modelled. Field names
//! follow the API's camelCase.

use serde::{Deserialize, Serialize};

use crate::grid::{Row, SheetProperties};
use crate::value::Value;

/// Response of `GET /spreadsheets/{id}?fields=sheets.properties`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpreadsheetMetadata {
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetEntry {
    pub properties: SheetPropertiesWire,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPropertiesWire {
    #[serde(default)]
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub grid_properties: Option<GridPropertiesWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPropertiesWire {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

impl From<SheetPropertiesWire> for SheetProperties {
    fn from(wire: SheetPropertiesWire) -> Self {
        let grid = wire.grid_properties.unwrap_or_default();
        SheetProperties {
            sheet_id: wire.sheet_id,
            title: wire.title,
            row_count: grid.row_count,
            column_count: grid.column_count,
        }
    }
}

impl SpreadsheetMetadata {
    pub fn into_sheets(self) -> Vec<SheetProperties> {
        self.sheets
            .into_iter()
            .map(|entry| entry.properties.into())
            .collect()
    }
}

/// A block of cell values, as read from or written to a range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<serde_json::Value>>>,
}

impl ValueRange {
    /// Builds a write payload. `None` cells become JSON null, which the API
    /// leaves untouched.
    pub fn from_rows(range: String, rows: &[Row]) -> Self {
        let values = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.as_ref()
                            .map(Value::to_json)
                            .unwrap_or(serde_json::Value::Null)
                    })
                    .collect()
            })
            .collect();
        Self {
            range: Some(range),
            major_dimension: Some("ROWS".to_string()),
            values: Some(values),
        }
    }

    /// Converts a read response into rows. `None` when nothing came back.
    pub fn into_rows(self) -> Option<Vec<Row>> {
        let values = self.values?;
        if values.is_empty() {
            return None;
        }
        Some(
            values
                .iter()
                .map(|row| row.iter().map(Value::from_json).collect())
                .collect(),
        )
    }
}

/// Body of `POST /spreadsheets/{id}:batchUpdate`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<Request>,
}

/// One structural change inside a batch update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    AddSheet {
        properties: NewSheetProperties,
    },
    #[serde(rename_all = "camelCase")]
    RepeatCell {
        range: CellRange,
        cell: CellData,
        fields: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateSheetProperties {
        properties: FrozenRowProperties,
        fields: String,
    },
    #[serde(rename_all = "camelCase")]
    InsertDimension {
        range: DimensionRange,
        inherit_from_before: bool,
    },
    DeleteDimension {
        range: DimensionRange,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSheetProperties {
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRange {
    pub sheet_id: i64,
    pub start_row_index: u32,
    pub end_row_index: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub user_entered_format: CellFormat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    pub text_format: TextFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextFormat {
    pub bold: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrozenRowProperties {
    pub sheet_id: i64,
    pub grid_properties: FrozenGrid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrozenGrid {
    pub frozen_row_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: i64,
    pub dimension: String,
    pub start_index: u32,
    pub end_index: u32,
}

impl DimensionRange {
    pub fn rows(sheet_id: i64, start_index: u32, count: u32) -> Self {
        Self::span(sheet_id, "ROWS", start_index, count)
    }

    pub fn columns(sheet_id: i64, start_index: u32, count: u32) -> Self {
        Self::span(sheet_id, "COLUMNS", start_index, count)
    }

    fn span(sheet_id: i64, dimension: &str, start_index: u32, count: u32) -> Self {
        Self {
            sheet_id,
            dimension: dimension.to_string(),
            start_index,
            end_index: start_index + count,
        }
    }
}

impl Request {
    pub fn add_sheet(title: &str) -> Self {
        Request::AddSheet {
            properties: NewSheetProperties {
                title: title.to_string(),
            },
        }
    }

    /// Bold text for row 1.
    pub fn bold_header(sheet_id: i64) -> Self {
        Request::RepeatCell {
            range: CellRange {
                sheet_id,
                start_row_index: 0,
                end_row_index: 1,
            },
            cell: CellData {
                user_entered_format: CellFormat {
                    text_format: TextFormat { bold: true },
                },
            },
            fields: "userEnteredFormat.textFormat.bold".to_string(),
        }
    }

    pub fn freeze_header(sheet_id: i64) -> Self {
        Request::UpdateSheetProperties {
            properties: FrozenRowProperties {
                sheet_id,
                grid_properties: FrozenGrid {
                    frozen_row_count: 1,
                },
            },
            fields: "gridProperties.frozenRowCount".to_string(),
        }
    }
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
