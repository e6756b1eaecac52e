use std::path::Path;

use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info, warn};

use super::error::Result;
use super::partitions::{
    decode_marker_key, decode_range_key, encode_marker_key, encode_meta_key, encode_range_key,
    encode_site_prefix,
};
use super::pruning::{META_LAST_PRUNE_RANGES, PruneStats, prune_ranges};
use super::{ArchiveKey, ArchiveMarker, ArchiveStore, RangeInvalidation, SiteId};
use crate::period::DateRange;

/// Fjall-backed persistent storage for archive markers
#[derive(Clone)]
pub struct FjallArchiveStore {
    keyspace: Keyspace,
    markers: PartitionHandle,
    ranges: PartitionHandle,
    metadata: PartitionHandle,
}

impl FjallArchiveStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening archive store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let markers = keyspace.open_partition("markers", PartitionCreateOptions::default())?;
        let ranges = keyspace.open_partition("ranges", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            markers,
            ranges,
            metadata,
        })
    }

    /// Markers of one site, in key order
    pub fn site_markers(&self, site: SiteId) -> Result<Vec<(ArchiveKey, ArchiveMarker)>> {
        let mut out = Vec::new();
        for item in self.markers.prefix(encode_site_prefix(site)) {
            let (raw_key, value) = item?;
            if let Some(key) = decode_marker_key(&raw_key) {
                out.push((key, serde_json::from_slice(&value)?));
            }
        }
        Ok(out)
    }

    /// When [`ArchiveStore::prune_ranges`] last ran
    pub fn last_pruned(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .metadata
            .get(encode_meta_key(META_LAST_PRUNE_RANGES))?
            .and_then(|raw| {
                std::str::from_utf8(&raw)
                    .ok()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            })
            .map(|ts| ts.with_timezone(&Utc)))
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

impl ArchiveStore for FjallArchiveStore {
    fn get_marker(&self, key: &ArchiveKey) -> Result<Option<ArchiveMarker>> {
        match self.markers.get(encode_marker_key(key))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn put_marker(&self, key: &ArchiveKey, marker: &ArchiveMarker) -> Result<()> {
        let value = serde_json::to_vec(marker)?;
        self.markers.insert(encode_marker_key(key), value)?;
        debug!(%key, status = %marker.status, "Stored archive marker");
        Ok(())
    }

    fn mark_overlapping_range_invalidated(
        &self,
        sites: &[SiteId],
        range: &DateRange,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        for site in sites {
            let record = RangeInvalidation::new(*site, *range, segment, plugin);
            self.ranges.insert(encode_range_key(&record), now.as_bytes())?;
            debug!(site, %range, "Stored range invalidation");
        }
        Ok(())
    }

    fn markers(&self) -> Result<Vec<(ArchiveKey, ArchiveMarker)>> {
        let mut out = Vec::new();
        for item in self.markers.iter() {
            let (raw_key, value) = item?;
            match decode_marker_key(&raw_key) {
                Some(key) => out.push((key, serde_json::from_slice(&value)?)),
                None => warn!(key = %String::from_utf8_lossy(&raw_key), "Skipping undecodable marker key"),
            }
        }
        Ok(out)
    }

    fn range_invalidations(&self) -> Result<Vec<RangeInvalidation>> {
        let mut out = Vec::new();
        for item in self.ranges.iter() {
            let (raw_key, _) = item?;
            if let Some(range) = decode_range_key(&raw_key) {
                out.push(range);
            }
        }
        Ok(out)
    }

    fn prune_ranges(&self, cutoff: DateTime<Utc>) -> Result<PruneStats> {
        info!(%cutoff, "Starting range pruning");
        let stats = prune_ranges(&self.ranges, &self.metadata, cutoff)?;
        self.persist()?;
        Ok(stats)
    }
}
