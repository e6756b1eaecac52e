use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid date specification: {0}")]
    InvalidDateSpec(String),

    #[error("unknown period: {0}")]
    UnknownPeriod(String),

    #[error("range start {start} is after range end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

pub type Result<T> = std::result::Result<T, PeriodError>;
