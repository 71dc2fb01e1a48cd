//! Rows and change-sets
//!
//! A [`Row`] is one table record as edited in the dashboard, tagged with its
//! edit state. On the wire (and in the draft file) the state travels as the
//! `_isNew` / `_isModified` flags next to the record's fields and `id`:
//!
//! ```json
//! { "id": 9, "setlist_id": 7, "song_id": 42, "_isModified": true }
//! ```
//!
//! Internally the flags and the identity are kept out of `fields`, so a
//! write payload can never leak them.

use indexmap::IndexMap;
use livith_common::Table;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::store::Record;

const FLAG_NEW: &str = "_isNew";
const FLAG_MODIFIED: &str = "_isModified";

/// Fields never sent to the store as part of a payload
const NON_PAYLOAD_FIELDS: [&str; 3] = ["created_at", "updated_at", "deleted_at"];

/// Edit state of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowState {
    /// Created locally, not yet persisted
    New,
    /// Persisted row with local edits
    Modified,
    /// Unchanged since load
    #[default]
    Clean,
}

/// One tagged record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub fields: Map<String, Value>,
    pub state: RowState,
    pub identity: Option<i64>,
}

impl Row {
    /// Locally created row
    pub fn new_row(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            state: RowState::New,
            identity: None,
        }
    }

    /// Edited persisted row
    pub fn modified(id: i64, fields: Map<String, Value>) -> Self {
        Self {
            fields,
            state: RowState::Modified,
            identity: Some(id),
        }
    }

    /// Row as loaded from the store (identity taken from its `id` field)
    pub fn clean(record: Record) -> Self {
        let mut row = Self::from_object(record);
        row.state = RowState::Clean;
        row
    }

    /// Field value, `Null` when absent
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&Value::Null)
    }

    /// Set a field
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Fields to persist: everything except timestamps
    pub fn payload(&self) -> Record {
        self.fields
            .iter()
            .filter(|(key, _)| !NON_PAYLOAD_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Parse the flagged wire form
    fn from_object(mut object: Map<String, Value>) -> Self {
        let is_new = object.remove(FLAG_NEW).is_some_and(|v| truthy(&v));
        let is_modified = object.remove(FLAG_MODIFIED).is_some_and(|v| truthy(&v));
        let identity = object.remove("id").and_then(|v| parse_id(&v));

        let state = if is_new {
            RowState::New
        } else if is_modified {
            RowState::Modified
        } else {
            RowState::Clean
        };

        Self {
            fields: object,
            state,
            identity,
        }
    }

    /// Flagged wire form
    fn to_object(&self) -> Map<String, Value> {
        let mut object = self.fields.clone();
        if let Some(id) = self.identity {
            object.insert("id".to_string(), Value::from(id));
        }
        match self.state {
            RowState::New => {
                object.insert(FLAG_NEW.to_string(), Value::Bool(true));
            }
            RowState::Modified => {
                object.insert(FLAG_MODIFIED.to_string(), Value::Bool(true));
            }
            RowState::Clean => {}
        }
        object
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => s == "true",
        _ => false,
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(object) => Ok(Row::from_object(object)),
            other => Err(D::Error::custom(format!("expected row object, found {}", other))),
        }
    }
}

/// Pending edits for a save, keyed by table in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(IndexMap<Table, Vec<Row>>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending rows of one table (keeps its original position)
    pub fn set_table(&mut self, table: Table, rows: Vec<Row>) {
        self.0.insert(table, rows);
    }

    /// Pending rows of one table
    pub fn rows(&self, table: Table) -> Option<&[Row]> {
        self.0.get(&table).map(Vec::as_slice)
    }

    /// Tables and rows in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (Table, &[Row])> {
        self.0.iter().map(|(table, rows)| (*table, rows.as_slice()))
    }

    /// True if any row is new or modified
    pub fn has_changes(&self) -> bool {
        self.0
            .values()
            .flatten()
            .any(|row| row.state != RowState::Clean)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}
