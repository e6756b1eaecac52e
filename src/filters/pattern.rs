use regex::RegexBuilder;

use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::{DataTable, LABEL_COLUMN};

/// Keep rows whose `column` (default `label`) matches `pattern`,
/// case-insensitively. With `invert` the matching rows are removed
/// instead. Rows lacking the column never match. The summary row and
/// subtables are not visited.
pub struct Pattern;

impl Pattern {
    pub const NAME: &'static str = "Pattern";
}

impl Filter for Pattern {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let column = args.str_or("column", LABEL_COLUMN)?;
        let pattern = args.require_str("pattern")?;
        let invert = args.bool_or("invert", false)?;

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| FilterError::InvalidArgument {
                arg: "pattern".to_string(),
                reason: e.to_string(),
            })?;

        table.delete_rows_where(|row| {
            let matched = row
                .column_aliased(column)
                .is_some_and(|value| regex.is_match(&value.to_string()));
            matched == invert
        });
        Ok(())
    }
}
