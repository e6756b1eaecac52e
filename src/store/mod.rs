//! Archive store boundary
//!
//! The archive store holds one [`ArchiveMarker`] per archive, keyed by
//! (site, period kind, period start, segment, plugin), plus a log of range
//! periods whose cached results overlap an invalidated date span.
//!
//! ## Backends
//!
//! - [`MemoryArchiveStore`] - in-process maps, for tests and one-shot runs
//! - [`FjallArchiveStore`] - embedded LSM store, survives restarts
//! - [`BoundedStore`] - wraps any backend and enforces a per-call timeout
//!
//! Marker mutations are serialized per key by [`KeyLocks`]; the
//! [`StatusTracker`] drives the archive lifecycle on top of it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use archivist::store::{ArchiveStore, FjallArchiveStore};
//!
//! let store = FjallArchiveStore::open("data/archive")?;
//! store.mark_invalidated(&key)?;
//! assert_eq!(store.get_status(&key)?, Some(ArchiveStatus::Invalidated));
//! ```

mod bounded;
mod error;
mod fjall_store;
mod locks;
mod memory;
pub mod partitions;
mod pruning;
mod status;
mod tracker;

pub use bounded::BoundedStore;
pub use error::{Result, StoreError};
pub use fjall_store::FjallArchiveStore;
pub use locks::KeyLocks;
pub use memory::MemoryArchiveStore;
pub use pruning::PruneStats;
pub use status::{ArchiveMarker, ArchiveStatus};
pub use tracker::StatusTracker;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::period::{DateRange, Period, PeriodKind};

pub type SiteId = u32;

/// Identity of one archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchiveKey {
    pub site: SiteId,
    pub period: PeriodKind,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl ArchiveKey {
    /// Empty segment or plugin strings mean "none"
    pub fn new(
        site: SiteId,
        period: PeriodKind,
        date: NaiveDate,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> Self {
        Self {
            site,
            period,
            date,
            segment: segment.filter(|s| !s.is_empty()).map(str::to_string),
            plugin: plugin.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    pub fn for_period(
        site: SiteId,
        period: &Period,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> Self {
        Self::new(site, period.kind(), period.date_start(), segment, plugin)
    }

    pub fn period(&self) -> crate::period::Result<Period> {
        Period::new(self.period, self.date)
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site {} {} {}", self.site, self.period, self.date)?;
        if let Some(segment) = &self.segment {
            write!(f, " segment '{}'", segment)?;
        }
        if let Some(plugin) = &self.plugin {
            write!(f, " plugin {}", plugin)?;
        }
        Ok(())
    }
}

/// A range period whose cached results overlap an invalidated span
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RangeInvalidation {
    pub site: SiteId,
    pub range: DateRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl RangeInvalidation {
    pub fn new(site: SiteId, range: DateRange, segment: Option<&str>, plugin: Option<&str>) -> Self {
        Self {
            site,
            range,
            segment: segment.filter(|s| !s.is_empty()).map(str::to_string),
            plugin: plugin.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub valid: usize,
    pub invalidated: usize,
    pub in_progress: usize,
    pub ranges: usize,
}

impl StoreStats {
    pub fn markers(&self) -> usize {
        self.valid + self.invalidated + self.in_progress
    }

    fn count(&mut self, status: ArchiveStatus) {
        match status {
            ArchiveStatus::Valid => self.valid += 1,
            ArchiveStatus::Invalidated => self.invalidated += 1,
            ArchiveStatus::InProgress => self.in_progress += 1,
        }
    }
}

/// Persistence of archive markers.
///
/// Every write is idempotent: repeating a call leaves the store as the
/// first call did. Implementations do no locking of their own beyond what
/// keeps their maps consistent; callers serialize per key.
pub trait ArchiveStore: Send + Sync {
    fn get_marker(&self, key: &ArchiveKey) -> Result<Option<ArchiveMarker>>;

    fn put_marker(&self, key: &ArchiveKey, marker: &ArchiveMarker) -> Result<()>;

    /// Record that range periods of each site overlapping `range` are stale
    fn mark_overlapping_range_invalidated(
        &self,
        sites: &[SiteId],
        range: &DateRange,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> Result<()>;

    fn markers(&self) -> Result<Vec<(ArchiveKey, ArchiveMarker)>>;

    fn range_invalidations(&self) -> Result<Vec<RangeInvalidation>>;

    /// Drop range records written before `cutoff`
    fn prune_ranges(&self, cutoff: DateTime<Utc>) -> Result<PruneStats>;

    fn get_status(&self, key: &ArchiveKey) -> Result<Option<ArchiveStatus>> {
        Ok(self.get_marker(key)?.map(|marker| marker.status))
    }

    fn mark_invalidated(&self, key: &ArchiveKey) -> Result<()> {
        let current = self.get_marker(key)?;
        if current.as_ref().map(|m| m.status) == Some(ArchiveStatus::Invalidated) {
            return Ok(());
        }
        let next = ArchiveMarker::transition(
            key,
            current.as_ref(),
            ArchiveStatus::Invalidated,
            Utc::now(),
        )?;
        self.put_marker(key, &next)
    }

    fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();
        for (_, marker) in self.markers()? {
            stats.count(marker.status);
        }
        stats.ranges = self.range_invalidations()?.len();
        Ok(stats)
    }
}
