use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::period::PeriodKind;
use crate::store::{ArchiveKey, RangeInvalidation, SiteId};

pub(crate) const LIVE_RUN_LINE: &str = "Invalidation markers written to the archive store.";
pub(crate) const DRY_RUN_LINE: &str = "Dry run: nothing was written to the archive store.";

/// A key the store failed on; the rest of the run went ahead
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFailure {
    pub key: ArchiveKey,
    pub error: String,
}

/// Outcome of one invalidation run
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub cascade: bool,
    /// Markers per period kind and site
    pub counts: BTreeMap<PeriodKind, BTreeMap<SiteId, usize>>,
    /// Markers written, or that would be written on a dry run
    pub markers: BTreeSet<ArchiveKey>,
    pub ranges: BTreeSet<RangeInvalidation>,
    /// Periods left alone because their raw logs are gone
    pub skipped_retention: BTreeSet<ArchiveKey>,
    pub failures: Vec<KeyFailure>,
    pub warnings: Vec<String>,
    /// Human-readable account of the run
    pub log: Vec<String>,
    pub cancelled: bool,
}

impl InvalidationReport {
    pub(crate) fn new(dry_run: bool, cascade: bool) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            dry_run,
            cascade,
            counts: BTreeMap::new(),
            markers: BTreeSet::new(),
            ranges: BTreeSet::new(),
            skipped_retention: BTreeSet::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
            log: Vec::new(),
            cancelled: false,
        }
    }

    pub fn count(&self, kind: PeriodKind, site: SiteId) -> usize {
        self.counts
            .get(&kind)
            .and_then(|sites| sites.get(&site))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().flat_map(BTreeMap::values).sum()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }

    /// The log without its closing line, identical for live and dry runs
    pub fn diagnostics(&self) -> &[String] {
        match self.log.split_last() {
            Some((last, rest)) if last == LIVE_RUN_LINE || last == DRY_RUN_LINE => rest,
            _ => &self.log,
        }
    }

    pub(crate) fn record_marker(&mut self, key: ArchiveKey) {
        let (kind, site) = (key.period, key.site);
        if self.markers.insert(key) {
            self.bump(kind, site);
        }
    }

    pub(crate) fn record_range(&mut self, range: RangeInvalidation) {
        let site = range.site;
        if self.ranges.insert(range) {
            self.bump(PeriodKind::Range, site);
        }
    }

    fn bump(&mut self, kind: PeriodKind, site: SiteId) {
        *self.counts.entry(kind).or_default().entry(site).or_default() += 1;
    }

    pub(crate) fn finish(&mut self) {
        let line = if self.dry_run { DRY_RUN_LINE } else { LIVE_RUN_LINE };
        self.log.push(line.to_string());
    }
}
