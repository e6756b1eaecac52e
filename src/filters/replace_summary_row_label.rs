use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::{DataTable, LABEL_COLUMN};

/// Give the summary row its display label, in this table and every owned
/// subtable. Argument: `label` (default from configuration).
pub struct ReplaceSummaryRowLabel {
    default_label: String,
}

impl ReplaceSummaryRowLabel {
    pub const NAME: &'static str = "ReplaceSummaryRowLabel";

    pub fn new(default_label: impl Into<String>) -> Self {
        Self {
            default_label: default_label.into(),
        }
    }
}

impl Filter for ReplaceSummaryRowLabel {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let label = args.str_or("label", &self.default_label)?;
        relabel(table, label);
        Ok(())
    }
}

fn relabel(table: &mut DataTable, label: &str) {
    if let Some(summary) = table.summary_row_mut() {
        summary.set_column(LABEL_COLUMN, label);
    }
    for subtable in table.subtables_mut() {
        relabel(subtable, label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatable::{Row, RowId};
    use crate::filters::FilterRegistry;

    #[test]
    fn test_relabels_nested_summaries() {
        let mut child = DataTable::new();
        child.add_summary_row(Row::from_columns([("nb_visits", 2)]));
        let mut table = DataTable::new();
        table.add_row(Row::with_label("a"));
        table.row_from_id_mut(RowId::Index(0)).unwrap().set_subtable(child);
        table.add_summary_row(Row::from_columns([("nb_visits", 3)]));

        table
            .filter(
                &FilterRegistry::with_defaults(),
                ReplaceSummaryRowLabel::NAME,
                FilterArgs::new().with("label", "Rest"),
            )
            .unwrap();

        assert_eq!(table.summary_row().unwrap().label_text().as_deref(), Some("Rest"));
        let child = table.subtables_mut().next().unwrap();
        assert_eq!(child.summary_row().unwrap().label_text().as_deref(), Some("Rest"));
    }

    #[test]
    fn test_no_summary_row_is_noop() {
        let mut table = DataTable::new();
        table.add_row(Row::with_label("a"));
        let before = table.clone();
        table
            .filter(&FilterRegistry::with_defaults(), ReplaceSummaryRowLabel::NAME, FilterArgs::new())
            .unwrap();
        assert_eq!(table, before);
    }
}
