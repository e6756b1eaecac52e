use chrono::{Days, NaiveDate};

use crate::period::{self, DateRange, Period, PeriodKind};

/// Every `kind` period overlapping `range`; edge instances may reach past it
pub(crate) fn expand(kind: PeriodKind, range: &DateRange) -> period::Result<Vec<Period>> {
    Period::instances_overlapping(kind, range)
}

/// All descendants of `period` down the year → month → week → day chain.
///
/// Each level covers the whole span of its parent, not just the part the
/// caller asked for: cascading a week always reaches all seven of its days,
/// and cascading a month reaches the days of weeks that start or end in a
/// neighbouring month.
pub(crate) fn descendants(period: &Period) -> period::Result<Vec<Period>> {
    let mut out = Vec::new();
    let Some(child_kind) = period.kind().cascade_child() else {
        return Ok(out);
    };
    for child in Period::instances_overlapping(child_kind, &period.date_range())? {
        let grandchildren = descendants(&child)?;
        out.push(child);
        out.extend(grandchildren);
    }
    Ok(out)
}

/// First day still covered by raw logs, if logs are ever deleted
pub(crate) fn retention_cutoff(today: NaiveDate, retention_days: Option<u64>) -> Option<NaiveDate> {
    retention_days.and_then(|days| today.checked_sub_days(Days::new(days)))
}

/// A period ending before the cutoff can no longer be rebuilt from logs
pub(crate) fn beyond_retention(span: &DateRange, cutoff: Option<NaiveDate>) -> bool {
    cutoff.is_some_and(|cutoff| span.end < cutoff)
}
