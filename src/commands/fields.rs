//! Parsing and printing of record fields on the command line.

use sheetdb_core::record::is_reserved;
use sheetdb_core::{Record, Value};

/// Parses `field=value`. The value becomes a bool or number when it looks
/// like one, text otherwise.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", raw))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    if is_reserved(field) {
        return Err(format!("'{}' is managed by sheetdb and cannot be set", field));
    }
    Ok((field.to_string(), Value::parse(value)))
}

/// Parses a JSON object or array of objects into records.
pub fn parse_records(json: &str) -> Result<Vec<Record>, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {}", e))?;
    let records = match parsed {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        _ => return Err("expected a JSON object or an array of objects".to_string()),
    };
    records
        .into_iter()
        .map(|item| {
            serde_json::from_value::<Record>(item)
                .map_err(|e| format!("invalid record: {}", e))
        })
        .collect()
}

/// True when every filter matches the record's field exactly.
pub fn matches_all(record: &Record, filters: &[(String, Value)]) -> bool {
    filters
        .iter()
        .all(|(field, value)| record.get(field) == Some(value))
}

/// One-line rendering: `#3  name=ann, age=31`.
pub fn format_record(record: &Record) -> String {
    let fields: Vec<String> = record
        .fields()
        .iter()
        .map(|(field, value)| format!("{}={}", field, value))
        .collect();
    match record.index() {
        Some(index) => format!("#{:<4} {}", index, fields.join(", ")),
        None => fields.join(", "),
    }
}
