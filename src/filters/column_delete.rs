use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::{DataTable, LABEL_COLUMN};

/// Remove columns from every row, summary row included.
///
/// `columns_to_remove` names columns to drop; a non-empty `columns_to_keep`
/// drops everything else. The label column always survives. `recursive`
/// (default false) applies the same to owned subtables.
pub struct ColumnDelete;

impl ColumnDelete {
    pub const NAME: &'static str = "ColumnDelete";
}

impl Filter for ColumnDelete {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let remove = args.str_list("columns_to_remove")?;
        let keep = args.str_list("columns_to_keep")?;
        let recursive = args.bool_or("recursive", false)?;

        delete_columns(table, &remove, &keep, recursive);
        Ok(())
    }
}

fn delete_columns(table: &mut DataTable, remove: &[String], keep: &[String], recursive: bool) {
    for row in table.rows_mut() {
        row.retain_columns(|name| {
            if name == LABEL_COLUMN {
                return true;
            }
            if remove.iter().any(|r| r == name) {
                return false;
            }
            keep.is_empty() || keep.iter().any(|k| k == name)
        });
    }
    if recursive {
        for subtable in table.subtables_mut() {
            delete_columns(subtable, remove, keep, recursive);
        }
    }
}
