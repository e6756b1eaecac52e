use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::error::Result;
use super::locks::KeyLocks;
use super::status::{ArchiveMarker, ArchiveStatus};
use super::{ArchiveKey, ArchiveStore};

/// Drives archive markers through their lifecycle.
///
/// Every transition reads the current marker and writes the next one while
/// holding that key's lock, so concurrent callers on one key serialize and
/// the later write wins.
#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn ArchiveStore>,
    locks: Arc<KeyLocks>,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn ArchiveStore>) -> Self {
        Self::with_locks(store, Arc::new(KeyLocks::new()))
    }

    /// Share `locks` with other trackers over the same store
    pub fn with_locks(store: Arc<dyn ArchiveStore>, locks: Arc<KeyLocks>) -> Self {
        Self { store, locks }
    }

    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    pub fn status(&self, key: &ArchiveKey) -> Result<Option<ArchiveStatus>> {
        self.store.get_status(key)
    }

    /// Mark the archive stale; allowed from any state
    pub fn invalidate(&self, key: &ArchiveKey) -> Result<()> {
        self.locks.with_lock(key, || self.store.mark_invalidated(key))
    }

    /// An archiver starts (re)building the archive
    pub fn begin(&self, key: &ArchiveKey) -> Result<ArchiveMarker> {
        self.move_to(key, ArchiveStatus::InProgress)
    }

    /// The build finished and the archive is current
    pub fn complete(&self, key: &ArchiveKey) -> Result<ArchiveMarker> {
        self.move_to(key, ArchiveStatus::Valid)
    }

    /// The build failed; the archive stays stale for a later retry
    pub fn fail(&self, key: &ArchiveKey) -> Result<ArchiveMarker> {
        self.locks.with_lock(key, || {
            let current = self.store.get_marker(key)?;
            if current.as_ref().map(|m| m.status) != Some(ArchiveStatus::InProgress) {
                return Err(super::StoreError::IllegalTransition {
                    key: key.to_string(),
                    from: current.map(|m| m.status),
                    to: ArchiveStatus::Invalidated,
                });
            }
            self.write(key, current.as_ref(), ArchiveStatus::Invalidated)
        })
    }

    fn move_to(&self, key: &ArchiveKey, to: ArchiveStatus) -> Result<ArchiveMarker> {
        self.locks.with_lock(key, || {
            let current = self.store.get_marker(key)?;
            self.write(key, current.as_ref(), to)
        })
    }

    fn write(
        &self,
        key: &ArchiveKey,
        current: Option<&ArchiveMarker>,
        to: ArchiveStatus,
    ) -> Result<ArchiveMarker> {
        let next = ArchiveMarker::transition(key, current, to, Utc::now())?;
        self.store.put_marker(key, &next)?;
        debug!(%key, from = ?current.map(|m| m.status), to = %to, "Archive status changed");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodKind;
    use crate::store::{MemoryArchiveStore, StoreError};
    use chrono::NaiveDate;
    use std::thread;

    fn key() -> ArchiveKey {
        ArchiveKey::new(
            1,
            PeriodKind::Month,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            None,
            None,
        )
    }

    fn tracker() -> StatusTracker {
        StatusTracker::new(Arc::new(MemoryArchiveStore::new()))
    }

    #[test]
    fn test_full_cycle() {
        let tracker = tracker();
        tracker.complete(&key()).unwrap();
        assert_eq!(tracker.status(&key()).unwrap(), Some(ArchiveStatus::Valid));

        tracker.invalidate(&key()).unwrap();
        let running = tracker.begin(&key()).unwrap();
        assert!(running.started_at.is_some());

        tracker.fail(&key()).unwrap();
        assert_eq!(tracker.status(&key()).unwrap(), Some(ArchiveStatus::Invalidated));

        tracker.begin(&key()).unwrap();
        tracker.complete(&key()).unwrap();
        assert_eq!(tracker.status(&key()).unwrap(), Some(ArchiveStatus::Valid));
    }

    #[test]
    fn test_rejects_rebuilding_valid_archive() {
        let tracker = tracker();
        tracker.complete(&key()).unwrap();
        assert!(matches!(
            tracker.begin(&key()),
            Err(StoreError::IllegalTransition { .. })
        ));
        assert!(matches!(
            tracker.fail(&key()),
            Err(StoreError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_only_one_concurrent_builder() {
        let tracker = tracker();
        tracker.invalidate(&key()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || tracker.begin(&key()).is_ok())
            })
            .collect();
        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(started, 1);
    }
}
