use std::time::Duration;
use thiserror::Error;

use super::ArchiveStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("archive store unavailable: {0}")]
    Unavailable(String),

    #[error("archive store call '{op}' timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("illegal status transition for {key}: {} -> {to}", status_label(.from))]
    IllegalTransition {
        key: String,
        from: Option<ArchiveStatus>,
        to: ArchiveStatus,
    },

    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Failures that concern one call only and may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Timeout { .. } | StoreError::Io(_)
        )
    }
}

fn status_label(status: &Option<ArchiveStatus>) -> &'static str {
    status.map_or("missing", |s| s.label())
}

pub type Result<T> = std::result::Result<T, StoreError>;
