use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidationError {
    /// Rejected before anything touched the archive store
    #[error("invalid request: {field}: {reason}")]
    InvalidRequest { field: &'static str, reason: String },
}

impl InvalidationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        InvalidationError::InvalidRequest {
            field,
            reason: reason.into(),
        }
    }

    /// The request field at fault
    pub fn field(&self) -> &'static str {
        match self {
            InvalidationError::InvalidRequest { field, .. } => field,
        }
    }
}

pub type Result<T> = std::result::Result<T, InvalidationError>;
