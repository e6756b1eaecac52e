//! Hierarchical aggregate tables
//!
//! A [`DataTable`] is an ordered list of [`Row`]s plus an optional summary
//! row, table metadata and a queue of filters waiting to be applied. Rows
//! may own a child table, which makes a report a tree: each table belongs
//! to exactly one row, so ownership alone rules out cycles.
//!
//! Tables are built and consumed by one task at a time; nothing here is
//! synchronized.
//!
//! ## Aggregation contract
//!
//! Whenever rows are merged (summary rows, [`DataTable::add_data_table`])
//! each column is combined with the operator declared in the table
//! metadata under [`COLUMN_AGGREGATION_OPS_METADATA`], `sum` by default.
//! Combining text with `sum`/`min`/`max`, or merging tables that declare
//! different operators for a column, fails with
//! [`DataTableError::AggregationContractViolation`].

mod aggregation;
mod error;
pub mod metrics;
mod row;
mod value;

pub use aggregation::{AggregationOp, AggregationOps};
pub use error::{DataTableError, Result};
pub use row::{LABEL_COLUMN, Row, RowMetadata, Subtable, SubtableId};
pub use value::Value;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::filters::{FilterArgs, FilterError, FilterRegistry, QueuedFilter};

/// Label carried by a summary row until a relabeling filter replaces it
pub const SUMMARY_ROW_LABEL: &str = "summary";

/// Table metadata key holding the per-column aggregation operators
pub const COLUMN_AGGREGATION_OPS_METADATA: &str = "column_aggregation_ops";

/// Position of a row inside a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowId {
    Index(usize),
    Summary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataTable {
    rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary_row: Option<Row>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    queued_filters: VecDeque<QueuedFilter>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row and return its index
    pub fn add_row(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn add_row_from_columns<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> usize
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.add_row(Row::from_columns(columns))
    }

    /// Set or replace the summary row.
    ///
    /// A row without a label gets [`SUMMARY_ROW_LABEL`].
    pub fn add_summary_row(&mut self, mut row: Row) {
        if row.label().is_none() {
            row.set_column(LABEL_COLUMN, SUMMARY_ROW_LABEL);
        }
        self.summary_row = Some(row);
    }

    pub fn summary_row(&self) -> Option<&Row> {
        self.summary_row.as_ref()
    }

    pub fn summary_row_mut(&mut self) -> Option<&mut Row> {
        self.summary_row.as_mut()
    }

    pub fn take_summary_row(&mut self) -> Option<Row> {
        self.summary_row.take()
    }

    /// All rows in order, the summary row last
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().chain(self.summary_row.iter())
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.rows.iter_mut().chain(self.summary_row.iter_mut())
    }

    pub fn rows_without_summary_row(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_without_summary_row_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len() + usize::from(self.summary_row.is_some())
    }

    pub fn row_count_without_summary_row(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Values of one column, one entry per row (summary row included)
    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.rows().map(|row| row.column(name)).collect()
    }

    pub fn row_from_id(&self, id: RowId) -> Option<&Row> {
        match id {
            RowId::Index(index) => self.rows.get(index),
            RowId::Summary => self.summary_row.as_ref(),
        }
    }

    pub fn row_from_id_mut(&mut self, id: RowId) -> Option<&mut Row> {
        match id {
            RowId::Index(index) => self.rows.get_mut(index),
            RowId::Summary => self.summary_row.as_mut(),
        }
    }

    pub fn row_from_label(&self, label: &str) -> Option<&Row> {
        self.rows
            .iter()
            .find(|row| row.label_text().as_deref() == Some(label))
    }

    pub fn delete_row(&mut self, id: RowId) -> Option<Row> {
        match id {
            RowId::Index(index) if index < self.rows.len() => Some(self.rows.remove(index)),
            RowId::Index(_) => None,
            RowId::Summary => self.summary_row.take(),
        }
    }

    /// Remove every regular row matching `predicate`; the summary row is kept
    pub fn delete_rows_where(&mut self, mut predicate: impl FnMut(&Row) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !predicate(row));
        before - self.rows.len()
    }

    /// Keep `limit` rows starting at `offset` (all remaining if `None`)
    pub fn slice_rows(&mut self, offset: usize, limit: Option<usize>) {
        let offset = offset.min(self.rows.len());
        self.rows.drain(..offset);
        if let Some(limit) = limit {
            self.rows.truncate(limit);
        }
    }

    /// Stable sort of the regular rows
    pub fn sort_rows_by(&mut self, compare: impl FnMut(&Row, &Row) -> Ordering) {
        self.rows.sort_by(compare);
    }

    /// Merge `row` into the row at `index`.
    ///
    /// # Panics
    ///
    /// Panics if no row exists at `index`: summing into a missing target is a
    /// bug in the caller and must not be silently dropped.
    pub fn sum_row_at(&mut self, index: usize, row: &Row) -> Result<()> {
        assert!(
            index < self.rows.len(),
            "sum_row_at: no row at index {} (table has {} rows)",
            index,
            self.rows.len()
        );
        let ops = self.aggregation_ops()?;
        self.rows[index].sum_row(row, &ops)
    }

    /// Owned subtables of the regular rows
    pub fn subtables_mut(&mut self) -> impl Iterator<Item = &mut DataTable> {
        self.rows.iter_mut().filter_map(Row::subtable_mut)
    }

    pub fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn all_metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn aggregation_ops(&self) -> Result<AggregationOps> {
        match self.metadata.get(COLUMN_AGGREGATION_OPS_METADATA) {
            Some(value) => AggregationOps::from_json(value),
            None => Ok(AggregationOps::new()),
        }
    }

    pub fn set_aggregation_ops(&mut self, ops: &AggregationOps) {
        self.metadata
            .insert(COLUMN_AGGREGATION_OPS_METADATA.to_string(), ops.to_json());
    }

    /// Merge another table into this one, row by row.
    ///
    /// Rows are matched on their label; unmatched rows are appended. Owned
    /// subtables of matched rows merge recursively, summary rows merge into
    /// each other. A side holding an unloaded subtable cannot be merged and
    /// is rejected.
    pub fn add_data_table(&mut self, other: &DataTable) -> Result<()> {
        let ops = self.aggregation_ops()?.merge(&other.aggregation_ops()?)?;
        if !ops.is_empty() {
            self.set_aggregation_ops(&ops);
        }

        let mut by_label: HashMap<String, usize> = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| row.label_text().map(|label| (label, index)))
            .collect();

        for incoming in &other.rows {
            let existing = incoming
                .label_text()
                .and_then(|label| by_label.get(&label).copied());

            match existing {
                Some(index) => merge_row(&mut self.rows[index], incoming, &ops)?,
                None => {
                    let index = self.add_row(incoming.clone());
                    if let Some(label) = incoming.label_text() {
                        by_label.insert(label, index);
                    }
                }
            }
        }

        if let Some(incoming) = &other.summary_row {
            match self.summary_row.as_mut() {
                Some(summary) => merge_row(summary, incoming, &ops)?,
                None => self.summary_row = Some(incoming.clone()),
            }
        }
        Ok(())
    }

    /// Apply a registered filter right away
    pub fn filter(
        &mut self,
        registry: &FilterRegistry,
        name: &str,
        args: FilterArgs,
    ) -> std::result::Result<(), FilterError> {
        registry.get(name)?.apply(self, &args)
    }

    /// Apply a filter to every owned subtable, recursively
    pub fn filter_subtables(
        &mut self,
        registry: &FilterRegistry,
        name: &str,
        args: FilterArgs,
    ) -> std::result::Result<(), FilterError> {
        let filter = registry.get(name)?;
        for subtable in self.subtables_mut() {
            filter.apply(subtable, &args)?;
            subtable.filter_subtables(registry, name, args.clone())?;
        }
        Ok(())
    }

    /// Defer a filter until [`DataTable::apply_queued_filters`]
    pub fn queue_filter(&mut self, name: impl Into<String>, args: FilterArgs) {
        self.queued_filters.push_back(QueuedFilter {
            name: name.into(),
            args,
        });
    }

    pub fn queue_filter_subtables(&mut self, name: &str, args: FilterArgs) {
        for subtable in self.subtables_mut() {
            subtable.queue_filter(name, args.clone());
            subtable.queue_filter_subtables(name, args.clone());
        }
    }

    pub fn queued_filters(&self) -> impl Iterator<Item = &QueuedFilter> {
        self.queued_filters.iter()
    }

    /// Run queued filters in FIFO order, each exactly once.
    ///
    /// Filters queued while the queue drains run in the same pass.
    pub fn apply_queued_filters(
        &mut self,
        registry: &FilterRegistry,
    ) -> std::result::Result<(), FilterError> {
        while let Some(queued) = self.queued_filters.pop_front() {
            registry.get(&queued.name)?.apply(self, &queued.args)?;
        }
        Ok(())
    }
}

impl PartialEq for DataTable {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.summary_row == other.summary_row
            && self.metadata == other.metadata
    }
}

fn merge_row(target: &mut Row, incoming: &Row, ops: &AggregationOps) -> Result<()> {
    target.sum_row(incoming, ops)?;

    match incoming.subtable() {
        Subtable::None => Ok(()),
        Subtable::Unloaded(id) => Err(DataTableError::UnloadedSubtable(*id)),
        Subtable::Owned(child) => {
            if let Subtable::Unloaded(id) = target.subtable() {
                return Err(DataTableError::UnloadedSubtable(*id));
            }
            match target.subtable_mut() {
                Some(existing) => existing.add_data_table(child),
                None => {
                    target.set_subtable(child.as_ref().clone());
                    Ok(())
                }
            }
        }
    }
}
