pub mod catalog;
pub mod config;
pub mod datatable;
pub mod error;
pub mod filters;
pub mod humanize;
pub mod invalidator;
pub mod observability;
pub mod period;
pub mod store;

pub use error::{Error, Result};
