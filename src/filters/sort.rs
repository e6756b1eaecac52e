use std::cmp::Ordering;

use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::{DataTable, Row, Value};

/// Order rows by one column.
///
/// Arguments: `column` (default `nb_visits`), `order` (`desc` or `asc`,
/// default `desc`), `natural` (default true), `recursive` (default false).
/// Rows lacking the column sort last in either direction; ties keep their
/// previous order. The summary row stays last.
pub struct Sort;

impl Sort {
    pub const NAME: &'static str = "Sort";
}

impl Filter for Sort {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let column = args.str_or("column", "nb_visits")?;
        let descending = match args.str_or("order", "desc")? {
            "desc" => true,
            "asc" => false,
            other => {
                return Err(FilterError::InvalidArgument {
                    arg: "order".to_string(),
                    reason: format!("expected 'asc' or 'desc', got '{}'", other),
                });
            }
        };
        let natural = args.bool_or("natural", true)?;
        let recursive = args.bool_or("recursive", false)?;

        sort_table(table, column, descending, natural, recursive);
        Ok(())
    }
}

pub(crate) fn sort_table(
    table: &mut DataTable,
    column: &str,
    descending: bool,
    natural: bool,
    recursive: bool,
) {
    table.sort_rows_by(|a, b| compare_rows(a, b, column, descending, natural));
    if recursive {
        for subtable in table.subtables_mut() {
            sort_table(subtable, column, descending, natural, recursive);
        }
    }
}

fn compare_rows(a: &Row, b: &Row, column: &str, descending: bool, natural: bool) -> Ordering {
    match (a.column_aliased(column), b.column_aliased(column)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = if natural {
                a.natural_cmp(b)
            } else {
                Value::lexical_cmp(a, b)
            };
            if descending { ord.reverse() } else { ord }
        }
    }
}
