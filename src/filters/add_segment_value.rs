use super::args::FilterArgs;
use super::traits::{Filter, FilterError};
use crate::datatable::DataTable;

/// Row metadata key holding the raw segment value
pub const SEGMENT_VALUE_METADATA: &str = "segmentValue";

/// Row metadata key holding the ready-to-use segment expression
pub const SEGMENT_METADATA: &str = "segment";

/// Attach a segment filter expression to every labeled row.
///
/// Arguments: `segment`, the dimension name (required), and an optional
/// `callback` mapping a label to the segment value. Rows get
/// `segmentValue` and `segment = <name>==<url-encoded value>` metadata.
/// When the callback returns `None` the row is left untouched. The summary
/// row and subtables are not visited.
pub struct AddSegmentValue;

impl AddSegmentValue {
    pub const NAME: &'static str = "AddSegmentValue";
}

impl Filter for AddSegmentValue {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError> {
        let segment = args.require_str("segment")?;
        let callback = args.callback("callback")?;

        for row in table.rows_without_summary_row_mut() {
            let Some(label) = row.label_text() else {
                continue;
            };
            let value = match callback {
                Some(callback) => match callback(&label) {
                    Some(value) => value,
                    None => continue,
                },
                None => label,
            };

            row.set_metadata(
                SEGMENT_METADATA,
                format!("{}=={}", segment, urlencoding::encode(&value)),
            );
            row.set_metadata(SEGMENT_VALUE_METADATA, value);
        }
        Ok(())
    }
}
