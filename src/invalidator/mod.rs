//! Archive invalidation
//!
//! [`ArchiveInvalidator::invalidate`] turns an [`InvalidationRequest`] into
//! archive markers:
//!
//! 1. the request is validated and resolved against the site registry and
//!    segment catalog; nothing is written if that fails
//! 2. for each site and date range, each requested calendar kind is
//!    expanded into the periods overlapping the range, and every (site,
//!    period, segment) is marked invalidated
//! 3. with `cascade`, every descendant along year → month → week → day is
//!    marked too, over the descendant's full span
//! 4. `range` requests record the literal date pairs as stale ranges
//!
//! Periods ending before the log retention cutoff are skipped unless the
//! request says to ignore the limit. A dry run computes the same markers and
//! log but writes nothing. Store failures are recorded per key and do not
//! stop the run; cancellation is checked between (site, date range) units.

mod error;
mod plan;
mod report;
mod request;

pub use error::{InvalidationError, Result};
pub use report::{InvalidationReport, KeyFailure};
pub use request::{InvalidationRequest, SiteSelection};
pub use tokio_util::sync::CancellationToken;

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::catalog::{SegmentCatalog, SiteRegistry};
use crate::observability::InvalidationMetrics;
use crate::period::{DateRange, Period, PeriodError};
use crate::store::{ArchiveKey, ArchiveStore, KeyLocks, RangeInvalidation, SiteId, StatusTracker};
use request::ResolvedRequest;

const MILLIS_PER_DAY: u128 = 86_400_000;

/// Marks archives stale so they get rebuilt
pub struct ArchiveInvalidator {
    tracker: StatusTracker,
    sites: Arc<dyn SiteRegistry>,
    segments: Arc<dyn SegmentCatalog>,
    log_retention_days: Option<u64>,
    today: Option<NaiveDate>,
    metrics: Arc<InvalidationMetrics>,
}

impl ArchiveInvalidator {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        sites: Arc<dyn SiteRegistry>,
        segments: Arc<dyn SegmentCatalog>,
    ) -> Self {
        Self {
            tracker: StatusTracker::new(store),
            sites,
            segments,
            log_retention_days: None,
            today: None,
            metrics: Arc::new(InvalidationMetrics::new()),
        }
    }

    /// Share per-key locks with other invalidators over the same store
    pub fn with_locks(mut self, locks: Arc<KeyLocks>) -> Self {
        self.tracker = StatusTracker::with_locks(Arc::clone(self.tracker.store()), locks);
        self
    }

    /// How long raw logs are kept; `None` means forever.
    ///
    /// A partial day counts as a whole one, so the cutoff never moves
    /// closer to today than the retention allows.
    pub fn with_log_retention(mut self, retention: Option<Duration>) -> Self {
        self.log_retention_days = retention.map(|d| {
            u64::try_from(d.as_millis().div_ceil(MILLIS_PER_DAY)).unwrap_or(u64::MAX)
        });
        self
    }

    /// Fix "today" for relative dates and the retention cutoff
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<InvalidationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &InvalidationMetrics {
        &self.metrics
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn invalidate(&self, request: &InvalidationRequest) -> Result<InvalidationReport> {
        self.invalidate_with_cancel(request, &CancellationToken::new())
    }

    pub fn invalidate_with_cancel(
        &self,
        request: &InvalidationRequest,
        cancel: &CancellationToken,
    ) -> Result<InvalidationReport> {
        let today = self.today();
        let resolved = request.resolve(self.sites.as_ref(), self.segments.as_ref(), today)?;

        let mut run = Run {
            invalidator: self,
            cutoff: plan::retention_cutoff(today, self.log_retention_days)
                .filter(|_| !resolved.ignore_log_deletion_limit),
            report: InvalidationReport::new(resolved.dry_run, resolved.cascade),
            request: &resolved,
        };
        info!(
            run_id = %run.report.run_id,
            sites = resolved.sites.len(),
            dates = resolved.dates.len(),
            dry_run = resolved.dry_run,
            "Starting invalidation"
        );

        run.execute(cancel);
        Ok(run.report)
    }
}

/// State of one invalidation run
struct Run<'a> {
    invalidator: &'a ArchiveInvalidator,
    request: &'a ResolvedRequest,
    cutoff: Option<NaiveDate>,
    report: InvalidationReport,
}

impl Run<'_> {
    fn execute(&mut self, cancel: &CancellationToken) {
        let request = self.request;
        for warning in &request.warnings {
            self.report.warnings.push(warning.clone());
            self.report.log.push(format!("Warning: {}", warning));
        }

        let units: Vec<(SiteId, DateRange)> = request
            .sites
            .iter()
            .flat_map(|site| request.dates.iter().map(move |range| (*site, *range)))
            .collect();

        for (done, (site, range)) in units.iter().enumerate() {
            if cancel.is_cancelled() {
                self.report.cancelled = true;
                self.invalidator.metrics.run_cancelled();
                self.report.log.push(format!(
                    "Cancelled after {} of {} site/date units.",
                    done,
                    units.len()
                ));
                warn!(run_id = %self.report.run_id, done, total = units.len(), "Invalidation cancelled");
                break;
            }
            self.process_unit(*site, range);
        }

        if !self.report.skipped_retention.is_empty() {
            if let Some(cutoff) = self.cutoff {
                self.report.log.push(format!(
                    "Skipped {} period(s) ending before {}, older than the raw log retention; \
                     use --ignore-log-deletion-limit to invalidate them anyway.",
                    self.report.skipped_retention.len(),
                    cutoff
                ));
            }
        }
        if !self.report.failures.is_empty() {
            self.report.log.push(format!(
                "{} marker(s) could not be written; rerun to retry them.",
                self.report.failures.len()
            ));
        }

        info!(
            run_id = %self.report.run_id,
            markers = self.report.markers.len(),
            ranges = self.report.ranges.len(),
            skipped = self.report.skipped_retention.len(),
            failures = self.report.failures.len(),
            cancelled = self.report.cancelled,
            "Invalidation finished"
        );
        self.report.finish();
    }

    fn process_unit(&mut self, site: SiteId, range: &DateRange) {
        let request = self.request;
        for segment in &request.segments {
            let segment = segment.as_deref();
            for kind in &request.kinds {
                self.log_unit(site, range, kind.label(), segment);
                let periods = match plan::expand(*kind, range) {
                    Ok(periods) => periods,
                    Err(e) => {
                        self.record_unplannable(e);
                        continue;
                    }
                };
                for period in periods {
                    self.visit(site, &period, segment);
                    if request.cascade {
                        match plan::descendants(&period) {
                            Ok(children) => {
                                for child in children {
                                    self.visit(site, &child, segment);
                                }
                            }
                            Err(e) => self.record_unplannable(e),
                        }
                    }
                }
            }
            if request.include_ranges {
                self.log_unit(site, range, "range", segment);
                self.visit_range(site, range, segment);
            }
        }
    }

    fn log_unit(&mut self, site: SiteId, range: &DateRange, period: &str, segment: Option<&str>) {
        let line = format!(
            "Invalidating site {}, dates {}, period {}, segment {}, cascade {}",
            site,
            range,
            period,
            segment.unwrap_or("none"),
            self.request.cascade
        );
        info!(run_id = %self.report.run_id, site, dates = %range, period, segment, "{}", line);
        self.report.log.push(line);
    }

    fn visit(&mut self, site: SiteId, period: &Period, segment: Option<&str>) {
        let key = ArchiveKey::for_period(site, period, segment, self.request.plugin.as_deref());
        if self.report.markers.contains(&key) || self.report.skipped_retention.contains(&key) {
            return;
        }
        if self.report.failures.iter().any(|f| f.key == key) {
            return;
        }

        if plan::beyond_retention(&period.date_range(), self.cutoff) {
            self.invalidator.metrics.marker_skipped_retention();
            self.report.skipped_retention.insert(key);
            return;
        }

        if !self.request.dry_run {
            if let Err(e) = self.invalidator.tracker.invalidate(&key) {
                self.record_failure(key, e.to_string());
                return;
            }
            self.invalidator.metrics.marker_written();
        }
        self.report.record_marker(key);
    }

    fn visit_range(&mut self, site: SiteId, range: &DateRange, segment: Option<&str>) {
        let plugin = self.request.plugin.as_deref();
        let record = RangeInvalidation::new(site, *range, segment, plugin);
        if self.report.ranges.contains(&record) {
            return;
        }

        if plan::beyond_retention(range, self.cutoff) {
            let key = ArchiveKey::for_period(site, &Period::range(*range), segment, plugin);
            self.invalidator.metrics.marker_skipped_retention();
            self.report.skipped_retention.insert(key);
            return;
        }

        if !self.request.dry_run {
            let store = self.invalidator.tracker.store();
            if let Err(e) = store.mark_overlapping_range_invalidated(&[site], range, segment, plugin)
            {
                let key = ArchiveKey::for_period(site, &Period::range(*range), segment, plugin);
                self.record_failure(key, e.to_string());
                return;
            }
            self.invalidator.metrics.marker_written();
        }
        self.report.record_range(record);
    }

    fn record_unplannable(&mut self, error: PeriodError) {
        warn!(run_id = %self.report.run_id, error = %error, "Periods could not be expanded");
        self.report.warnings.push(error.to_string());
        self.report.log.push(format!("Warning: {}", error));
    }

    fn record_failure(&mut self, key: ArchiveKey, error: String) {
        warn!(run_id = %self.report.run_id, %key, error = %error, "Failed to invalidate archive");
        self.invalidator.metrics.store_failure();
        self.report
            .log
            .push(format!("Failed to invalidate {}: {}", key, error));
        self.report.failures.push(KeyFailure { key, error });
    }
}
