//! Table filters
//!
//! A filter is a named, parameterized transformation applied to a
//! [`DataTable`](crate::datatable::DataTable) in place, either right away
//! with [`DataTable::filter`](crate::datatable::DataTable::filter) or
//! deferred through the table's queue.
//!
//! ## Key Components
//!
//! - [`Filter`] - Trait implemented by every filter
//! - [`FilterRegistry`] - Name to filter lookup, with the built-ins
//! - [`FilterArgs`] - Named arguments, values or label callbacks
//!
//! ## Example
//!
//! ```rust,ignore
//! use archivist::filters::{FilterArgs, FilterRegistry};
//!
//! let registry = FilterRegistry::with_defaults();
//! table.filter(&registry, "Truncate", FilterArgs::new().with("limit", 10))?;
//! table.apply_queued_filters(&registry)?;
//! ```

mod add_segment_value;
mod args;
mod column_delete;
mod exclude_low_population;
mod limit;
mod pattern;
mod registry;
mod replace_column_names;
mod replace_summary_row_label;
mod sort;
mod traits;
mod truncate;

pub use add_segment_value::{AddSegmentValue, SEGMENT_METADATA, SEGMENT_VALUE_METADATA};
pub use args::{FilterArg, FilterArgs, LabelCallback, QueuedFilter};
pub use column_delete::ColumnDelete;
pub use exclude_low_population::ExcludeLowPopulation;
pub use limit::Limit;
pub use pattern::Pattern;
pub use registry::{FilterDefaults, FilterRegistry};
pub use replace_column_names::ReplaceColumnNames;
pub use replace_summary_row_label::ReplaceSummaryRowLabel;
pub use sort::Sort;
pub use traits::{Filter, FilterError};
pub use truncate::Truncate;
