use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::error::Result;
use super::pruning::PruneStats;
use super::{ArchiveKey, ArchiveMarker, ArchiveStore, RangeInvalidation, SiteId};
use crate::period::DateRange;

/// In-process archive store
#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    markers: RwLock<BTreeMap<ArchiveKey, ArchiveMarker>>,
    ranges: RwLock<BTreeMap<RangeInvalidation, DateTime<Utc>>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveStore for MemoryArchiveStore {
    fn get_marker(&self, key: &ArchiveKey) -> Result<Option<ArchiveMarker>> {
        Ok(self.markers.read().get(key).cloned())
    }

    fn put_marker(&self, key: &ArchiveKey, marker: &ArchiveMarker) -> Result<()> {
        self.markers.write().insert(key.clone(), marker.clone());
        Ok(())
    }

    fn mark_overlapping_range_invalidated(
        &self,
        sites: &[SiteId],
        range: &DateRange,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        let mut ranges = self.ranges.write();
        for site in sites {
            ranges.insert(RangeInvalidation::new(*site, *range, segment, plugin), now);
        }
        Ok(())
    }

    fn markers(&self) -> Result<Vec<(ArchiveKey, ArchiveMarker)>> {
        Ok(self
            .markers
            .read()
            .iter()
            .map(|(k, m)| (k.clone(), m.clone()))
            .collect())
    }

    fn range_invalidations(&self) -> Result<Vec<RangeInvalidation>> {
        Ok(self.ranges.read().keys().cloned().collect())
    }

    fn prune_ranges(&self, cutoff: DateTime<Utc>) -> Result<PruneStats> {
        let mut ranges = self.ranges.write();
        let before = ranges.len();
        ranges.retain(|_, written| *written >= cutoff);
        Ok(PruneStats {
            ranges_pruned: before - ranges.len(),
            ranges_kept: ranges.len(),
        })
    }
}
