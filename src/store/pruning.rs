/// Retention of range invalidation records
use chrono::{DateTime, Utc};
use fjall::PartitionHandle;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::Result;
use super::partitions::encode_meta_key;

/// Metadata key recording when ranges were last pruned
pub(crate) const META_LAST_PRUNE_RANGES: &str = "last_prune_ranges";

/// Pruning statistics
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PruneStats {
    pub ranges_pruned: usize,
    pub ranges_kept: usize,
}

/// Remove range records whose timestamp is older than `cutoff`.
///
/// Records with an unreadable timestamp are removed as well.
pub(crate) fn prune_ranges(
    ranges_partition: &PartitionHandle,
    metadata_partition: &PartitionHandle,
    cutoff: DateTime<Utc>,
) -> Result<PruneStats> {
    let mut stats = PruneStats::default();
    let mut expired = Vec::new();

    for item in ranges_partition.iter() {
        let (key, value) = item?;
        let written = std::str::from_utf8(&value)
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc));
        match written {
            Some(ts) if ts >= cutoff => stats.ranges_kept += 1,
            Some(_) => expired.push(key),
            None => {
                warn!(key = %String::from_utf8_lossy(&key), "Dropping range record with unreadable timestamp");
                expired.push(key);
            }
        }
    }

    for key in expired {
        ranges_partition.remove(key)?;
        stats.ranges_pruned += 1;
    }
    debug!(?stats, "Range records pruned");

    metadata_partition.insert(
        encode_meta_key(META_LAST_PRUNE_RANGES),
        Utc::now().to_rfc3339().as_bytes(),
    )?;

    info!("Pruned {} range invalidation records", stats.ranges_pruned);
    Ok(stats)
}
