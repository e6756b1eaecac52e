use thiserror::Error;

use super::row::SubtableId;

#[derive(Debug, Error)]
pub enum DataTableError {
    #[error("aggregation contract violated for column '{column}': {reason}")]
    AggregationContractViolation { column: String, reason: String },

    #[error("malformed column aggregation metadata: {0}")]
    MalformedAggregationOps(String),

    #[error("subtable {0} is not loaded and cannot be merged")]
    UnloadedSubtable(SubtableId),
}

pub type Result<T> = std::result::Result<T, DataTableError>;
