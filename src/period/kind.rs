use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::PeriodError;

/// Calendar granularity of a [`Period`](super::Period)
///
/// Variants are declared from finest to coarsest so that the derived
/// ordering sorts days before weeks before months before years. `Range`
/// sits outside the calendar hierarchy and sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Day,
    Week,
    Month,
    Year,
    Range,
}

impl PeriodKind {
    /// The calendar kinds that `all` expands to (ranges are never implied)
    pub const CALENDAR: [PeriodKind; 4] = [
        PeriodKind::Day,
        PeriodKind::Week,
        PeriodKind::Month,
        PeriodKind::Year,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PeriodKind::Day => "day",
            PeriodKind::Week => "week",
            PeriodKind::Month => "month",
            PeriodKind::Year => "year",
            PeriodKind::Range => "range",
        }
    }

    /// Kind produced by subperiod decomposition.
    ///
    /// Years split into months; every other kind splits into days.
    pub fn child(&self) -> Option<PeriodKind> {
        match self {
            PeriodKind::Year => Some(PeriodKind::Month),
            PeriodKind::Month | PeriodKind::Week | PeriodKind::Range => Some(PeriodKind::Day),
            PeriodKind::Day => None,
        }
    }

    /// Kind one level up in the year → month → week → day table.
    ///
    /// A week may straddle two months, so it has no single parent and this
    /// returns `None` for it, just as for the top of the hierarchy and for
    /// ranges.
    pub fn parent(&self) -> Option<PeriodKind> {
        match self {
            PeriodKind::Day => Some(PeriodKind::Week),
            PeriodKind::Month => Some(PeriodKind::Year),
            PeriodKind::Week | PeriodKind::Year | PeriodKind::Range => None,
        }
    }

    /// Next kind down when cascading an invalidation (year → month → week → day)
    pub fn cascade_child(&self) -> Option<PeriodKind> {
        match self {
            PeriodKind::Year => Some(PeriodKind::Month),
            PeriodKind::Month => Some(PeriodKind::Week),
            PeriodKind::Week => Some(PeriodKind::Day),
            PeriodKind::Day | PeriodKind::Range => None,
        }
    }

    pub fn is_calendar(&self) -> bool {
        !matches!(self, PeriodKind::Range)
    }
}

impl FromStr for PeriodKind {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(PeriodKind::Day),
            "week" => Ok(PeriodKind::Week),
            "month" => Ok(PeriodKind::Month),
            "year" => Ok(PeriodKind::Year),
            "range" => Ok(PeriodKind::Range),
            other => Err(PeriodError::UnknownPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
