//! Calendar periods and their subperiod decomposition
//!
//! A [`Period`] is a value object: a [`PeriodKind`] plus the inclusive span
//! of days it covers. Calendar kinds are always normalized to their natural
//! boundaries (weeks start on Monday, months on the 1st, years on January
//! 1st), so two periods built from different days of the same week compare
//! equal.
//!
//! Subperiods are computed on first access and memoized; the period is
//! otherwise immutable and can be shared freely across threads.
//!
//! ```rust,ignore
//! use archivist::period::{Period, PeriodKind};
//!
//! let year = Period::build("year", "2024-05-17", today)?;
//! assert_eq!(year.subperiods().len(), 12);
//! assert_eq!(year.child_period_label(), Some("month"));
//! ```

mod error;
mod kind;
mod range;

pub use error::{PeriodError, Result};
pub use kind::PeriodKind;
pub use range::{DateRange, parse_date};

use chrono::{Datelike, Days, NaiveDate};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use range::format_date;

#[derive(Clone)]
pub struct Period {
    kind: PeriodKind,
    span: DateRange,
    subperiods: OnceLock<Vec<Period>>,
}

impl Period {
    /// Build the period of `kind` that contains `date`.
    ///
    /// For [`PeriodKind::Range`] this yields the one-day range `[date, date]`.
    /// Fails when the period would reach past the supported calendar.
    pub fn new(kind: PeriodKind, date: NaiveDate) -> Result<Self> {
        let out_of_range = || {
            PeriodError::InvalidDateSpec(format!(
                "the {} containing {} is outside the supported calendar",
                kind,
                format_date(date)
            ))
        };
        let span = match kind {
            PeriodKind::Day | PeriodKind::Range => DateRange::single(date),
            PeriodKind::Week => {
                let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
                let start = date.checked_sub_days(back).ok_or_else(out_of_range)?;
                DateRange {
                    start,
                    end: start.checked_add_days(Days::new(6)).ok_or_else(out_of_range)?,
                }
            }
            PeriodKind::Month => {
                let start = date.with_day(1).ok_or_else(out_of_range)?;
                DateRange {
                    start,
                    end: month_end(start).ok_or_else(out_of_range)?,
                }
            }
            PeriodKind::Year => DateRange {
                start: date.with_ordinal(1).ok_or_else(out_of_range)?,
                end: NaiveDate::from_ymd_opt(date.year(), 12, 31).ok_or_else(out_of_range)?,
            },
        };
        Ok(Self::from_span(kind, span))
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::from_span(PeriodKind::Day, DateRange::single(date))
    }

    pub fn week(date: NaiveDate) -> Result<Self> {
        Self::new(PeriodKind::Week, date)
    }

    pub fn month(date: NaiveDate) -> Result<Self> {
        Self::new(PeriodKind::Month, date)
    }

    pub fn year(date: NaiveDate) -> Result<Self> {
        Self::new(PeriodKind::Year, date)
    }

    pub fn range(span: DateRange) -> Self {
        Self::from_span(PeriodKind::Range, span)
    }

    fn from_span(kind: PeriodKind, span: DateRange) -> Self {
        Self {
            kind,
            span,
            subperiods: OnceLock::new(),
        }
    }

    /// Parse `kind` and a date specification into a period.
    ///
    /// Ranges accept any [`DateRange`] specification; calendar kinds need a
    /// specification that resolves to a single day.
    pub fn build(kind: &str, spec: &str, today: NaiveDate) -> Result<Self> {
        let kind: PeriodKind = kind.parse()?;
        let span = DateRange::parse(spec, today)?;

        if kind == PeriodKind::Range {
            return Ok(Self::range(span));
        }

        if span.start != span.end {
            return Err(PeriodError::InvalidDateSpec(format!(
                "{} period needs a single date, got '{}'",
                kind, spec
            )));
        }
        Self::new(kind, span.start)
    }

    /// Every period of `kind` that overlaps `span`, in chronological order.
    ///
    /// Instances at the edges may extend beyond `span` (a week overlapping
    /// the first day of a month starts in the previous month).
    pub fn instances_overlapping(kind: PeriodKind, span: &DateRange) -> Result<Vec<Period>> {
        if kind == PeriodKind::Range {
            return Ok(vec![Self::range(*span)]);
        }

        let mut instances = Vec::new();
        let mut current = Self::new(kind, span.start)?;
        while current.span.end < span.end {
            let next = current.next()?;
            instances.push(current);
            current = next;
        }
        instances.push(current);
        Ok(instances)
    }

    /// The adjacent period of the same kind that follows this one
    pub fn next(&self) -> Result<Period> {
        let past_calendar = || {
            PeriodError::InvalidDateSpec(format!(
                "no {} follows {} within the supported calendar",
                self.kind, self
            ))
        };
        let after = self.span.end.succ_opt().ok_or_else(past_calendar)?;
        match self.kind {
            PeriodKind::Range => {
                let length = self.span.day_count();
                let end = after
                    .checked_add_days(Days::new(length - 1))
                    .ok_or_else(past_calendar)?;
                Ok(Self::range(DateRange { start: after, end }))
            }
            kind => Self::new(kind, after),
        }
    }

    pub fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn date_start(&self) -> NaiveDate {
        self.span.start
    }

    pub fn date_end(&self) -> NaiveDate {
        self.span.end
    }

    pub fn date_range(&self) -> DateRange {
        self.span
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.span.contains(date)
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        self.span.overlaps(&other.span)
    }

    pub fn child_period_label(&self) -> Option<&'static str> {
        self.kind.child().map(|kind| kind.label())
    }

    /// See [`PeriodKind::parent`]: weeks deliberately report no parent
    pub fn parent_period_label(&self) -> Option<&'static str> {
        self.kind.parent().map(|kind| kind.label())
    }

    /// Child periods in chronological order, computed once
    pub fn subperiods(&self) -> &[Period] {
        self.subperiods.get_or_init(|| self.decompose())
    }

    /// Force subperiod decomposition; repeated calls are no-ops
    pub fn generate(&self) {
        let _ = self.subperiods();
    }

    pub fn is_generated(&self) -> bool {
        self.subperiods.get().is_some()
    }

    fn decompose(&self) -> Vec<Period> {
        match self.kind {
            PeriodKind::Day => Vec::new(),
            // Every month of a representable year is representable
            PeriodKind::Year => Self::instances_overlapping(PeriodKind::Month, &self.span)
                .unwrap_or_default(),
            PeriodKind::Week | PeriodKind::Month | PeriodKind::Range => {
                self.span.days().map(Period::day).collect()
            }
        }
    }

    /// Human-readable label, e.g. `week 2024-01-01 to 2024-01-07`
    pub fn pretty_label(&self) -> String {
        match self.kind {
            PeriodKind::Day => self.span.start.format("%A %-d %B %Y").to_string(),
            PeriodKind::Month => self.span.start.format("%B %Y").to_string(),
            PeriodKind::Year => self.span.start.format("%Y").to_string(),
            PeriodKind::Week | PeriodKind::Range => format!(
                "{} {} to {}",
                self.kind,
                format_date(self.span.start),
                format_date(self.span.end)
            ),
        }
    }
}

fn month_end(start: NaiveDate) -> Option<NaiveDate> {
    if start.month() == 12 {
        return NaiveDate::from_ymd_opt(start.year(), 12, 31);
    }
    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)?.pred_opt()
}

/// Canonical string form used in keys and logs
impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PeriodKind::Day => write!(f, "{}", format_date(self.span.start)),
            PeriodKind::Month => write!(f, "{}", self.span.start.format("%Y-%m")),
            PeriodKind::Year => write!(f, "{}", self.span.start.format("%Y")),
            PeriodKind::Week | PeriodKind::Range => write!(
                f,
                "{},{}",
                format_date(self.span.start),
                format_date(self.span.end)
            ),
        }
    }
}

impl fmt::Debug for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Period({} {})", self.kind, self)
    }
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.span == other.span
    }
}

impl Eq for Period {}

impl Hash for Period {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.span.hash(state);
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.span.cmp(&other.span))
    }
}
