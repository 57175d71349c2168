//! Records: one row of a collection.
//!
//! A record is an ordered mapping from field name to [`Value`], wrapped with
//! two engine-managed attributes:
//!
//! - `_index`: zero-based position in the collection's row cache. The remote
//!   row is `_index + 2` because the header occupies row 1.
//! - `_id`: opaque identifier, regenerated whenever row positions may have
//!   shifted. Rows are addressed by `_index`, never by `_id`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

/// Serialized name of the position attribute.
pub const INDEX_FIELD: &str = "_index";
/// Serialized name of the identifier attribute.
pub const ID_FIELD: &str = "_id";

/// Returns true for field names the engine manages itself.
pub fn is_reserved(field: &str) -> bool {
    field == INDEX_FIELD || field == ID_FIELD
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Creates an empty, unstamped record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter. Reserved names are ignored.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Position in the collection, once inserted or materialized.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field, keeping its original position if it already exists.
    ///
    /// Returns false (and stores nothing) for `_index`/`_id`.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> bool {
        let field = field.into();
        if is_reserved(&field) {
            return false;
        }
        self.fields.insert(field, value.into());
        true
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Assigns a position and a fresh identifier.
    pub(crate) fn stamp(&mut self, index: usize) {
        self.index = Some(index);
        self.id = Some(generate_id());
    }

    pub(crate) fn ensure_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(generate_id());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}

/// Generates an opaque record identifier.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
