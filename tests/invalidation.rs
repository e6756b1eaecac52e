//! Integration tests for archive invalidation
//!
//! Runs the invalidator against in-memory and fjall stores through the
//! public API only.

use archivist::catalog::{MemorySegmentCatalog, MemorySiteRegistry, SegmentDefinition};
use archivist::invalidator::{
    ArchiveInvalidator, CancellationToken, InvalidationRequest, SiteSelection,
};
use archivist::period::{DateRange, PeriodKind};
use archivist::store::{
    ArchiveKey, ArchiveMarker, ArchiveStatus, ArchiveStore, FjallArchiveStore, KeyLocks,
    MemoryArchiveStore, PruneStats, RangeInvalidation, SiteId, StatusTracker, StoreError,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn today() -> NaiveDate {
    date("2024-06-15")
}

fn invalidator(store: Arc<dyn ArchiveStore>) -> ArchiveInvalidator {
    ArchiveInvalidator::new(
        store,
        Arc::new(MemorySiteRegistry::new([1, 2, 3])),
        Arc::new(MemorySegmentCatalog::new([
            SegmentDefinition::new("Mobile", "deviceType==smartphone"),
        ])),
    )
    .with_today(today())
}

fn request(sites: &[SiteId], periods: &[&str], dates: &[&str]) -> InvalidationRequest {
    InvalidationRequest::builder()
        .sites(SiteSelection::Ids(sites.to_vec()))
        .periods(periods.iter().map(|p| p.to_string()).collect())
        .dates(dates.iter().map(|d| d.to_string()).collect())
        .build()
}

fn written(store: &dyn ArchiveStore) -> BTreeSet<ArchiveKey> {
    store
        .markers()
        .unwrap()
        .into_iter()
        .filter(|(_, marker)| marker.status == ArchiveStatus::Invalidated)
        .map(|(key, _)| key)
        .collect()
}

#[test]
fn test_all_periods_for_one_date_on_two_sites() {
    let store = Arc::new(MemoryArchiveStore::new());
    let report = invalidator(store.clone())
        .invalidate(&request(&[1, 2], &["all"], &["2024-03-01"]))
        .unwrap();

    assert_eq!(report.total(), 8);
    for site in [1, 2] {
        for kind in PeriodKind::CALENDAR {
            assert_eq!(report.count(kind, site), 1, "{} site {}", kind, site);
        }
    }

    let keys = written(store.as_ref());
    assert_eq!(keys.len(), 8);
    let starts: BTreeSet<(PeriodKind, NaiveDate)> =
        keys.iter().map(|k| (k.period, k.date)).collect();
    assert_eq!(
        starts,
        BTreeSet::from([
            (PeriodKind::Day, date("2024-03-01")),
            (PeriodKind::Week, date("2024-02-26")),
            (PeriodKind::Month, date("2024-03-01")),
            (PeriodKind::Year, date("2024-01-01")),
        ])
    );
    assert!(report.is_complete());
}

#[test]
fn test_week_cascade_reaches_days_outside_requested_range() {
    let store = Arc::new(MemoryArchiveStore::new());
    let mut req = request(&[1], &["week"], &["2024-01-01,2024-01-31"]);
    req.cascade = true;
    let report = invalidator(store.clone()).invalidate(&req).unwrap();

    assert_eq!(report.count(PeriodKind::Week, 1), 5);
    assert_eq!(report.count(PeriodKind::Day, 1), 35);

    let keys = written(store.as_ref());
    let days: Vec<NaiveDate> = keys
        .iter()
        .filter(|k| k.period == PeriodKind::Day)
        .map(|k| k.date)
        .collect();
    assert_eq!(days.first(), Some(&date("2024-01-01")));
    assert_eq!(days.last(), Some(&date("2024-02-04")));
    assert!(days.contains(&date("2024-02-01")));
    assert!(keys.iter().all(|k| k.period != PeriodKind::Month));
}

#[test]
fn test_week_cascade_straddling_new_year() {
    let store = Arc::new(MemoryArchiveStore::new());
    let mut req = request(&[1], &["week"], &["2023-12-01,2023-12-31"]);
    req.cascade = true;
    invalidator(store.clone()).invalidate(&req).unwrap();

    let days: BTreeSet<NaiveDate> = written(store.as_ref())
        .into_iter()
        .filter(|k| k.period == PeriodKind::Day)
        .map(|k| k.date)
        .collect();
    // 2023-11-27 is the Monday of the week holding December 1st
    assert!(days.contains(&date("2023-11-27")));
    assert!(days.contains(&date("2023-12-31")));
}

#[test]
fn test_segments_multiply_markers_and_warn_on_unknown() {
    let store = Arc::new(MemoryArchiveStore::new());
    let mut req = request(&[1], &["day"], &["2024-03-01"]);
    req.segments = vec!["Mobile".to_string(), "browserCode==ff".to_string()];
    let report = invalidator(store.clone()).invalidate(&req).unwrap();

    assert_eq!(report.count(PeriodKind::Day, 1), 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("browserCode==ff"));

    let segments: BTreeSet<Option<String>> = written(store.as_ref())
        .into_iter()
        .map(|k| k.segment)
        .collect();
    assert_eq!(
        segments,
        BTreeSet::from([
            Some("deviceType==smartphone".to_string()),
            Some("browserCode==ff".to_string()),
        ])
    );
}

#[test]
fn test_invalid_requests_name_the_field() {
    let store = Arc::new(MemoryArchiveStore::new());
    let invalidator = invalidator(store.clone());

    let cases = [
        (request(&[], &["day"], &["2024-03-01"]), "sites"),
        (request(&[99], &["day"], &["2024-03-01"]), "sites"),
        (request(&[1], &["fortnight"], &["2024-03-01"]), "periods"),
        (request(&[1], &["day"], &["yesterday-ish"]), "dates"),
        (request(&[1], &["day"], &["2024-03-10,2024-03-01"]), "dates"),
        (request(&[1], &["day"], &[]), "dates"),
    ];
    for (req, field) in cases {
        let err = invalidator.invalidate(&req).unwrap_err();
        assert_eq!(err.field(), field, "{}", err);
    }
    assert!(store.markers().unwrap().is_empty());
}

#[test]
fn test_range_periods_recorded_separately() {
    let store = Arc::new(MemoryArchiveStore::new());
    let report = invalidator(store.clone())
        .invalidate(&request(&[1, 2], &["range", "day"], &["2024-03-01,2024-03-03"]))
        .unwrap();

    assert_eq!(report.count(PeriodKind::Day, 1), 3);
    assert_eq!(report.count(PeriodKind::Range, 1), 1);
    assert_eq!(report.count(PeriodKind::Range, 2), 1);

    let range = DateRange::new(date("2024-03-01"), date("2024-03-03")).unwrap();
    let ranges = store.range_invalidations().unwrap();
    assert!(ranges.contains(&RangeInvalidation::new(2, range, None, None)));
    assert_eq!(ranges.len(), 2);
}

#[test]
fn test_all_sites_selection() {
    let store = Arc::new(MemoryArchiveStore::new());
    let req = InvalidationRequest::builder()
        .sites(SiteSelection::All)
        .periods(vec!["month".to_string()])
        .dates(vec!["2024-03-01".to_string()])
        .build();
    let report = invalidator(store).invalidate(&req).unwrap();

    for site in [1, 2, 3] {
        assert_eq!(report.count(PeriodKind::Month, site), 1);
    }
}

#[test]
fn test_dry_run_log_differs_only_in_closing_line() {
    let live_store = Arc::new(MemoryArchiveStore::new());
    let dry_store = Arc::new(MemoryArchiveStore::new());

    let mut req = request(&[1, 2], &["week", "month"], &["2024-02-10"]);
    req.cascade = true;
    let live = invalidator(live_store.clone()).invalidate(&req).unwrap();
    req.dry_run = true;
    let dry = invalidator(dry_store.clone()).invalidate(&req).unwrap();

    assert_eq!(live.diagnostics(), dry.diagnostics());
    assert_ne!(live.log.last(), dry.log.last());
    assert_eq!(live.markers, dry.markers);
    assert_eq!(written(live_store.as_ref()), dry.markers);
    assert!(dry_store.markers().unwrap().is_empty());
}

#[test]
fn test_reinvalidation_is_idempotent() {
    let store = Arc::new(MemoryArchiveStore::new());
    let invalidator = invalidator(store.clone());
    let req = request(&[1], &["day"], &["2024-03-01"]);

    invalidator.invalidate(&req).unwrap();
    let first = store.markers().unwrap();
    invalidator.invalidate(&req).unwrap();
    assert_eq!(store.markers().unwrap(), first);
}

#[test]
fn test_fjall_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("archive");

    {
        let store = Arc::new(FjallArchiveStore::open(&path).unwrap());
        invalidator(store.clone())
            .invalidate(&request(&[1], &["all"], &["2024-03-01"]))
            .unwrap();
        store.persist().unwrap();
    }

    let store = FjallArchiveStore::open(&path).unwrap();
    let stats = store.stats().unwrap();
    assert_eq!(stats.invalidated, 4);
}

#[test]
fn test_concurrent_runs_on_shared_keys() {
    let store: Arc<dyn ArchiveStore> = Arc::new(MemoryArchiveStore::new());
    let locks = Arc::new(KeyLocks::new());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let invalidator = invalidator(store.clone()).with_locks(locks.clone());
            thread::spawn(move || {
                // every run shares March; each adds its own day
                let own = format!("2024-03-{:02}", 10 + i);
                invalidator
                    .invalidate(&request(&[1, 2], &["day", "month"], &["2024-03-01", own.as_str()]))
                    .unwrap()
            })
        })
        .collect();

    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for report in &reports {
        assert!(report.is_complete());
        assert_eq!(report.count(PeriodKind::Month, 1), 1);
        assert_eq!(report.count(PeriodKind::Day, 2), 2);
    }

    // 2 sites x (1 month + 1 shared day + 4 own days)
    assert_eq!(written(store.as_ref()).len(), 12);
    assert_eq!(locks.active(), 0);
}

#[test]
fn test_invalidation_during_rebuild() {
    let store: Arc<dyn ArchiveStore> = Arc::new(MemoryArchiveStore::new());
    let locks = Arc::new(KeyLocks::new());
    let tracker = StatusTracker::with_locks(store.clone(), locks.clone());
    let key = ArchiveKey::new(1, PeriodKind::Day, date("2024-03-01"), None, None);

    tracker.begin(&key).unwrap();
    invalidator(store.clone())
        .with_locks(locks)
        .invalidate(&request(&[1], &["day"], &["2024-03-01"]))
        .unwrap();

    // the rebuild that was running can no longer mark the archive valid
    assert_eq!(tracker.status(&key).unwrap(), Some(ArchiveStatus::Invalidated));
    assert!(tracker.complete(&key).is_err());
}

/// Cancels its token after the first marker write
struct CancellingStore {
    inner: MemoryArchiveStore,
    token: CancellationToken,
}

impl ArchiveStore for CancellingStore {
    fn get_marker(&self, key: &ArchiveKey) -> archivist::store::Result<Option<ArchiveMarker>> {
        self.inner.get_marker(key)
    }

    fn put_marker(&self, key: &ArchiveKey, marker: &ArchiveMarker) -> archivist::store::Result<()> {
        self.token.cancel();
        self.inner.put_marker(key, marker)
    }

    fn mark_overlapping_range_invalidated(
        &self,
        sites: &[SiteId],
        range: &DateRange,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> archivist::store::Result<()> {
        self.inner
            .mark_overlapping_range_invalidated(sites, range, segment, plugin)
    }

    fn markers(&self) -> archivist::store::Result<Vec<(ArchiveKey, ArchiveMarker)>> {
        self.inner.markers()
    }

    fn range_invalidations(&self) -> archivist::store::Result<Vec<RangeInvalidation>> {
        self.inner.range_invalidations()
    }

    fn prune_ranges(&self, cutoff: DateTime<Utc>) -> archivist::store::Result<PruneStats> {
        self.inner.prune_ranges(cutoff)
    }
}

#[test]
fn test_cancellation_between_units() {
    let token = CancellationToken::new();
    let store = Arc::new(CancellingStore {
        inner: MemoryArchiveStore::new(),
        token: token.clone(),
    });

    let report = invalidator(store.clone())
        .invalidate_with_cancel(&request(&[1, 2, 3], &["day", "week"], &["2024-03-01"]), &token)
        .unwrap();

    // the first (site, date) unit runs to completion, nothing after it
    assert!(report.cancelled);
    assert!(!report.is_complete());
    assert_eq!(report.count(PeriodKind::Day, 1), 1);
    assert_eq!(report.count(PeriodKind::Week, 1), 1);
    assert_eq!(report.count(PeriodKind::Day, 2), 0);
    assert!(report
        .log
        .iter()
        .any(|line| line == "Cancelled after 1 of 3 site/date units."));
}

#[test]
fn test_cancelled_before_start_writes_nothing() {
    let store = Arc::new(MemoryArchiveStore::new());
    let token = CancellationToken::new();
    token.cancel();

    let invalidator = invalidator(store.clone());
    let report = invalidator
        .invalidate_with_cancel(&request(&[1], &["day"], &["2024-03-01"]), &token)
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.total(), 0);
    assert!(store.markers().unwrap().is_empty());
    assert_eq!(invalidator.metrics().snapshot().runs_cancelled, 1);
}

#[test]
fn test_shutdown_token_cancels_child_run() {
    let store = Arc::new(MemoryArchiveStore::new());
    let shutdown = CancellationToken::new();
    let run_token = shutdown.child_token();
    shutdown.cancel();

    let report = invalidator(store.clone())
        .invalidate_with_cancel(&request(&[1, 2], &["day"], &["2024-03-01"]), &run_token)
        .unwrap();

    assert!(run_token.is_cancelled());
    assert!(report.cancelled);
    assert!(store.markers().unwrap().is_empty());
}

/// Unreachable for one site
struct PartitionedStore {
    inner: MemoryArchiveStore,
    down: SiteId,
}

impl PartitionedStore {
    fn check(&self, site: SiteId) -> archivist::store::Result<()> {
        if site == self.down {
            return Err(StoreError::Unavailable(format!("shard for site {} is down", site)));
        }
        Ok(())
    }
}

impl ArchiveStore for PartitionedStore {
    fn get_marker(&self, key: &ArchiveKey) -> archivist::store::Result<Option<ArchiveMarker>> {
        self.check(key.site)?;
        self.inner.get_marker(key)
    }

    fn put_marker(&self, key: &ArchiveKey, marker: &ArchiveMarker) -> archivist::store::Result<()> {
        self.check(key.site)?;
        self.inner.put_marker(key, marker)
    }

    fn mark_overlapping_range_invalidated(
        &self,
        sites: &[SiteId],
        range: &DateRange,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> archivist::store::Result<()> {
        for site in sites {
            self.check(*site)?;
        }
        self.inner
            .mark_overlapping_range_invalidated(sites, range, segment, plugin)
    }

    fn markers(&self) -> archivist::store::Result<Vec<(ArchiveKey, ArchiveMarker)>> {
        self.inner.markers()
    }

    fn range_invalidations(&self) -> archivist::store::Result<Vec<RangeInvalidation>> {
        self.inner.range_invalidations()
    }

    fn prune_ranges(&self, cutoff: DateTime<Utc>) -> archivist::store::Result<PruneStats> {
        self.inner.prune_ranges(cutoff)
    }
}

#[test]
fn test_unavailable_store_fails_per_key() {
    let store = Arc::new(PartitionedStore {
        inner: MemoryArchiveStore::new(),
        down: 2,
    });
    let invalidator = invalidator(store.clone());
    let report = invalidator
        .invalidate(&request(&[1, 2, 3], &["day", "range"], &["2024-03-01"]))
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.key.site == 2));
    assert!(report.failures[0].error.contains("shard for site 2 is down"));

    assert_eq!(report.count(PeriodKind::Day, 1), 1);
    assert_eq!(report.count(PeriodKind::Day, 3), 1);
    assert_eq!(report.count(PeriodKind::Day, 2), 0);
    assert_eq!(report.count(PeriodKind::Range, 3), 1);
    assert_eq!(written(store.as_ref()).len(), 2);

    assert_eq!(invalidator.metrics().snapshot().store_failures, 2);
    assert!(report
        .log
        .iter()
        .any(|line| line.starts_with("Failed to invalidate site 2 day 2024-03-01")));
}
