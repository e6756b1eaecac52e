//! Date and date-range specifications
//!
//! Accepted grammar:
//!
//! - a single date: `2024-03-01`, `today`, `yesterday`, `now`
//! - an explicit pair: `2024-01-01,2024-01-31` (either side may be a keyword)
//! - `lastN`: the N days ending today
//! - `previousN`: the N days ending yesterday

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{PeriodError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive `[start, end]` span of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PeriodError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Parse a date or date-range specification, resolving relative
    /// keywords against `today`
    pub fn parse(spec: &str, today: NaiveDate) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(PeriodError::InvalidDateSpec(spec.to_string()));
        }

        if let Some((start, end)) = spec.split_once(',') {
            return Self::new(parse_date(start, today)?, parse_date(end, today)?);
        }

        if let Some(count) = strip_count(spec, "last")? {
            let start = sub_days(today, count - 1, spec)?;
            return Self::new(start, today);
        }

        if let Some(count) = strip_count(spec, "previous")? {
            let end = sub_days(today, 1, spec)?;
            let start = sub_days(today, count, spec)?;
            return Self::new(start, end);
        }

        parse_date(spec, today).map(Self::single)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn day_count(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    /// Every day in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |day| *day <= self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start.format(DATE_FORMAT))
        } else {
            write!(
                f,
                "{},{}",
                self.start.format(DATE_FORMAT),
                self.end.format(DATE_FORMAT)
            )
        }
    }
}

/// Parse one date token (`YYYY-MM-DD` or a relative keyword)
pub fn parse_date(token: &str, today: NaiveDate) -> Result<NaiveDate> {
    let token = token.trim();
    match token.to_ascii_lowercase().as_str() {
        "today" | "now" => Ok(today),
        "yesterday" => sub_days(today, 1, token),
        _ => NaiveDate::parse_from_str(token, DATE_FORMAT)
            .map_err(|_| PeriodError::InvalidDateSpec(token.to_string())),
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn strip_count(spec: &str, prefix: &str) -> Result<Option<u64>> {
    let Some(digits) = spec.strip_prefix(prefix) else {
        return Ok(None);
    };
    match digits.parse::<u64>() {
        Ok(count) if count > 0 => Ok(Some(count)),
        _ => Err(PeriodError::InvalidDateSpec(spec.to_string())),
    }
}

fn sub_days(date: NaiveDate, days: u64, spec: &str) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(|| PeriodError::InvalidDateSpec(spec.to_string()))
}
