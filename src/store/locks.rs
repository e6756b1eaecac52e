use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::ArchiveKey;

/// One mutex per archive key, created on demand and dropped when idle.
///
/// Holders of different keys never wait on each other; the map lock is
/// only taken to find or release a slot, never while `f` runs.
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<ArchiveKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`
    pub fn with_lock<T>(&self, key: &ArchiveKey, f: impl FnOnce() -> T) -> T {
        let slot = SlotRelease {
            locks: self,
            key,
            slot: {
                let mut slots = self.slots.lock();
                Arc::clone(slots.entry(key.clone()).or_default())
            },
        };

        let _guard = slot.slot.lock();
        f()
    }

    /// Keys currently locked or waited on
    pub fn active(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Drops an idle slot when its holder leaves, even by unwinding
struct SlotRelease<'a> {
    locks: &'a KeyLocks,
    key: &'a ArchiveKey,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        // Slots are only cloned under the map lock: a count of two means
        // nobody else holds or waits for this key.
        let mut slots = self.locks.slots.lock();
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(self.key);
        }
    }
}
