use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DataTable;
use super::aggregation::AggregationOps;
use super::error::Result;
use super::metrics;
use super::value::Value;

/// Column holding the row's display label
pub const LABEL_COLUMN: &str = "label";

/// Identifier of a subtable that lives in the archive store and has not
/// been fetched yet
pub type SubtableId = u64;

pub type RowMetadata = BTreeMap<String, serde_json::Value>;

/// Link from a row to its child table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "table", rename_all = "snake_case")]
pub enum Subtable {
    #[default]
    None,
    /// Loaded child table, owned by (and dropped with) the row
    Owned(Box<DataTable>),
    /// Child table still in storage, to be fetched by id
    Unloaded(SubtableId),
}

impl Subtable {
    pub fn is_none(&self) -> bool {
        matches!(self, Subtable::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: RowMetadata,
    #[serde(default, skip_serializing_if = "Subtable::is_none")]
    subtable: Subtable,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<K, V>(columns: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_label(label: impl Into<Value>) -> Self {
        let mut row = Self::new();
        row.set_column(LABEL_COLUMN, label);
        row
    }

    pub fn label(&self) -> Option<&Value> {
        self.columns.get(LABEL_COLUMN)
    }

    pub fn label_text(&self) -> Option<String> {
        self.label().map(Value::to_string)
    }

    pub fn columns(&self) -> &BTreeMap<String, Value> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    /// Look a column up by name, falling back to its legacy numeric alias
    pub fn column_aliased(&self, name: &str) -> Option<&Value> {
        self.columns.get(name).or_else(|| {
            metrics::alias(name).and_then(|alias| self.columns.get(&alias))
        })
    }

    pub fn set_column(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(name.into(), value.into());
    }

    pub fn delete_column(&mut self, name: &str) -> Option<Value> {
        self.columns.remove(name)
    }

    pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.columns.retain(|name, _| keep(name));
    }

    /// Move a column to a new name; an existing column under that name wins
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(value) = self.columns.remove(from) {
            self.columns.entry(to.to_string()).or_insert(value);
        }
    }

    pub fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn all_metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn subtable(&self) -> &Subtable {
        &self.subtable
    }

    pub fn subtable_mut(&mut self) -> Option<&mut DataTable> {
        match &mut self.subtable {
            Subtable::Owned(table) => Some(table),
            _ => None,
        }
    }

    pub fn set_subtable(&mut self, table: DataTable) {
        self.subtable = Subtable::Owned(Box::new(table));
    }

    pub fn set_unloaded_subtable(&mut self, id: SubtableId) {
        self.subtable = Subtable::Unloaded(id);
    }

    pub fn take_subtable(&mut self) -> Subtable {
        std::mem::take(&mut self.subtable)
    }

    /// Fold `other`'s columns into this row using the declared operators.
    ///
    /// The label column is left alone, as are metadata and subtables.
    pub fn sum_row(&mut self, other: &Row, ops: &AggregationOps) -> Result<()> {
        for (name, incoming) in &other.columns {
            if name == LABEL_COLUMN {
                continue;
            }
            let combined = ops.op(name).combine(name, self.columns.get(name), incoming)?;
            self.columns.insert(name.clone(), combined);
        }
        Ok(())
    }
}
