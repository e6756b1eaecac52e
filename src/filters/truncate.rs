use tracing::trace;

use super::args::FilterArgs;
use super::replace_summary_row_label::ReplaceSummaryRowLabel;
use super::sort::sort_table;
use super::traits::{Filter, FilterError};
use crate::datatable::{DataTable, Row, SUMMARY_ROW_LABEL};

/// Keep the top `limit` rows and fold the rest into a summary row.
///
/// Arguments: `limit` (required), `column` to rank by (default
/// `nb_visits`), `summary_label` (default from configuration) and
/// `recursive` (default false).
///
/// Nothing happens unless the table holds more than `limit + 1` rows,
/// summary row included. Otherwise rows are ranked descending by `column`,
/// rows past `limit` and any existing summary row are merged with the
/// table's aggregation operators into a new summary row, and a
/// `ReplaceSummaryRowLabel` run is queued to give it its display label.
/// Merged rows contribute columns only, never metadata or subtables.
///
/// With `recursive`, owned subtables are truncated as well; unloaded ones
/// are left alone.
pub struct Truncate {
    default_summary_label: String,
}

impl Truncate {
    pub const NAME: &'static str = "Truncate";

    pub fn new(default_summary_label: impl Into<String>) -> Self {
        Self {
            default_summary_label: default_summary_label.into(),
        }
    }
}

impl Filter for Truncate {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let limit = args
            .opt_usize("limit")?
            .ok_or_else(|| FilterError::InvalidArgument {
                arg: "limit".to_string(),
                reason: "argument is required".to_string(),
            })?;
        let column = args.str_or("column", "nb_visits")?;
        let label = args.str_or("summary_label", &self.default_summary_label)?;
        let recursive = args.bool_or("recursive", false)?;

        truncate_table(table, limit, column, label, recursive)
    }
}

fn truncate_table(
    table: &mut DataTable,
    limit: usize,
    column: &str,
    label: &str,
    recursive: bool,
) -> Result<(), FilterError> {
    if table.row_count() > limit + 1 {
        sort_table(table, column, true, true, false);

        let ops = table.aggregation_ops()?;
        let mut summary = Row::with_label(SUMMARY_ROW_LABEL);
        for row in &table.rows_without_summary_row()[limit..] {
            summary.sum_row(row, &ops)?;
        }
        if let Some(existing) = table.summary_row() {
            summary.sum_row(existing, &ops)?;
        }

        let folded = table.row_count_without_summary_row() - limit;
        table.slice_rows(0, Some(limit));
        table.add_summary_row(summary);
        table.queue_filter(
            ReplaceSummaryRowLabel::NAME,
            FilterArgs::new().with("label", label),
        );
        trace!(limit, folded, "Truncated table");
    }

    if recursive {
        for subtable in table.subtables_mut() {
            truncate_table(subtable, limit, column, label, recursive)?;
        }
    }
    Ok(())
}
