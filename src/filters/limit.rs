use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::DataTable;

/// Keep a window of rows: `offset` (default 0) and `limit` (negative or
/// absent keeps everything after the offset). The summary row is dropped
/// unless `keep_summary_row` is set.
pub struct Limit;

impl Limit {
    pub const NAME: &'static str = "Limit";
}

impl Filter for Limit {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let offset = args.opt_usize("offset")?.unwrap_or(0);
        let limit = args
            .opt_i64("limit")?
            .and_then(|limit| usize::try_from(limit).ok());
        let keep_summary_row = args.bool_or("keep_summary_row", false)?;

        table.slice_rows(offset, limit);
        if !keep_summary_row {
            table.take_summary_row();
        }
        Ok(())
    }
}
