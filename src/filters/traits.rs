use thiserror::Error;

use super::args::FilterArgs;
use crate::datatable::{DataTable, DataTableError};

/// Filter errors
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("invalid filter argument '{arg}': {reason}")]
    InvalidArgument { arg: String, reason: String },

    #[error(transparent)]
    Table(#[from] DataTableError),
}

/// A named, parameterized in-place transformation of a [`DataTable`]
///
/// Filters that drop or merge rows must say in their docs whether they
/// descend into subtables.
pub trait Filter: Send + Sync {
    fn apply(&self, table: &mut DataTable, args: &FilterArgs) -> Result<(), FilterError>;
}
