//! Generic rows reflected from cursor metadata.

use crate::db::driver::Cursor;
use crate::error::{DbError, DbResult};
use crate::models::SqlValue;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered mapping of column name to value.
///
/// Column order follows the cursor's metadata. Serializes as a JSON object
/// with keys in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

/// One row of driver-generated keys.
pub type GeneratedKeyRow = Row;

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push((column.into(), value));
    }

    /// Value of the column with exactly this name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_inner(self) -> Vec<(String, SqlValue)> {
        self.columns
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Read every remaining row of `cursor`.
pub fn collect_rows<K: Cursor>(cursor: &mut K) -> DbResult<Vec<Row>> {
    let names = cursor.column_names()?;
    let mut rows = Vec::new();
    while cursor.next()? {
        let row = names
            .iter()
            .enumerate()
            .map(|(i, name)| Ok((name.clone(), cursor.value(i)?)))
            .collect::<DbResult<Row>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a generated-keys cursor into rows.
///
/// Zero rows is a valid result. A cursor without columns means the statement
/// was not set up to report keys and is an error.
pub fn collect_generated_keys<K: Cursor>(cursor: &mut K) -> DbResult<Vec<GeneratedKeyRow>> {
    if cursor.column_names()?.is_empty() {
        return Err(DbError::extract(
            "generated keys cursor has no columns; the statement does not report keys",
        ));
    }
    collect_rows(cursor)
}
