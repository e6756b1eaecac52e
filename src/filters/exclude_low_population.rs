use tracing::trace;

use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::{DataTable, Value};

/// Drop rows whose `column` value is below a threshold.
///
/// Arguments: `column` (required, legacy numeric keys accepted),
/// `min_value` and `min_percentage`. A zero or missing `min_value` makes
/// the threshold `min_percentage` (default from configuration) of the
/// column's total over the regular rows. Rows strictly below the
/// threshold go, rows lacking the column count as zero. The summary row is
/// never removed. Subtables are not visited.
pub struct ExcludeLowPopulation {
    default_percentage: f64,
}

impl ExcludeLowPopulation {
    pub const NAME: &'static str = "ExcludeLowPopulation";

    pub fn new(default_percentage: f64) -> Self {
        Self { default_percentage }
    }
}

impl Filter for ExcludeLowPopulation {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let column = args.require_str("column")?;
        let threshold = match args.opt_f64("min_value")? {
            Some(min) if min != 0.0 => min,
            _ => {
                let percentage = args
                    .opt_f64("min_percentage")?
                    .unwrap_or(self.default_percentage);
                let total: f64 = table
                    .rows_without_summary_row()
                    .iter()
                    .filter_map(|row| row.column_aliased(column))
                    .filter_map(Value::as_f64)
                    .sum();
                total * percentage
            }
        };

        let removed = table.delete_rows_where(|row| {
            row.column_aliased(column)
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                < threshold
        });
        trace!(column, threshold, removed, "Excluded low population rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatable::Row;
    use crate::filters::FilterRegistry;

    fn visits_table(visits: &[i64]) -> DataTable {
        let mut table = DataTable::new();
        for v in visits {
            table.add_row_from_columns([("nb_visits", *v)]);
        }
        table
    }

    fn remaining(table: &DataTable) -> Vec<Option<f64>> {
        table
            .rows()
            .map(|row| row.column_aliased("nb_visits").and_then(Value::as_f64))
            .collect()
    }

    #[test]
    fn test_explicit_minimum() {
        let mut table = visits_table(&[100, 3, 50, 1]);
        table
            .filter(
                &FilterRegistry::with_defaults(),
                ExcludeLowPopulation::NAME,
                FilterArgs::new().with("column", "nb_visits").with("min_value", 5),
            )
            .unwrap();
        assert_eq!(remaining(&table), vec![Some(100.0), Some(50.0)]);
    }

    #[test]
    fn test_percentage_threshold() {
        // total 100, 2% threshold is 2: both rows stay
        let mut table = visits_table(&[90, 10]);
        table
            .filter(
                &FilterRegistry::with_defaults(),
                ExcludeLowPopulation::NAME,
                FilterArgs::new().with("column", "nb_visits"),
            )
            .unwrap();
        assert_eq!(table.row_count(), 2);

        // total 200, 10% threshold is 20
        let mut table = visits_table(&[150, 30, 19, 1]);
        table
            .filter(
                &FilterRegistry::with_defaults(),
                ExcludeLowPopulation::NAME,
                FilterArgs::new()
                    .with("column", "nb_visits")
                    .with("min_value", 0)
                    .with("min_percentage", 0.1),
            )
            .unwrap();
        assert_eq!(remaining(&table), vec![Some(150.0), Some(30.0)]);
    }

    #[test]
    fn test_legacy_column_and_summary_row() {
        let mut table = DataTable::new();
        table.add_row_from_columns([("2", 40)]);
        table.add_row_from_columns([("2", 1)]);
        table.add_summary_row(Row::from_columns([("2", 0)]));

        table
            .filter(
                &FilterRegistry::with_defaults(),
                ExcludeLowPopulation::NAME,
                FilterArgs::new().with("column", "nb_visits").with("min_value", 2),
            )
            .unwrap();
        assert_eq!(table.row_count_without_summary_row(), 1);
        assert!(table.summary_row().is_some());
    }
}
