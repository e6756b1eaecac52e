use thiserror::Error;

use crate::config::ConfigError;
use crate::datatable::DataTableError;
use crate::filters::FilterError;
use crate::invalidator::InvalidationError;
use crate::period::PeriodError;
use crate::store::StoreError;

/// Any error the crate surfaces to a binary
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    DataTable(#[from] DataTableError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Invalidation(#[from] InvalidationError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Failed to render configuration: {0}")]
    RenderConfig(#[from] toml::ser::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True when the caller asked for something malformed
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::Invalidation(_) | Error::Period(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
