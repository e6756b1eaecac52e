use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Mutex as InFlight;
use tracing::warn;

use super::error::{Result, StoreError};
use super::pruning::PruneStats;
use super::{ArchiveKey, ArchiveMarker, ArchiveStore, RangeInvalidation, SiteId};
use crate::period::DateRange;

/// Archive store wrapper bounding every call by a timeout.
///
/// Calls run on a dedicated runtime and block the calling thread, so use it
/// from plain threads or `spawn_blocking`, never from async code.
///
/// Calls on one key queue behind each other in arrival order. The backend
/// call owns its key's slot until it returns, even after the caller has
/// given up with [`StoreError::Timeout`], so a late write can never land
/// after a newer one. A call that times out while still queued never runs.
#[derive(Clone)]
pub struct BoundedStore {
    inner: Arc<dyn ArchiveStore>,
    timeout: Duration,
    runtime: Arc<StoreRuntime>,
    in_flight: Arc<Mutex<HashMap<ArchiveKey, Arc<InFlight<()>>>>>,
}

struct StoreRuntime(Option<Runtime>);

impl Drop for StoreRuntime {
    fn drop(&mut self) {
        // The last handle may be dropped inside async code
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl BoundedStore {
    pub fn new(inner: Arc<dyn ArchiveStore>, timeout: Duration) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("archive-store")
            .enable_time()
            .build()?;
        Ok(Self {
            inner,
            timeout,
            runtime: Arc::new(StoreRuntime(Some(runtime))),
            in_flight: Arc::default(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn slot(&self, key: &ArchiveKey) -> Arc<InFlight<()>> {
        let mut slots = self.in_flight.lock();
        // Idle slots are referenced by the map alone
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        match &self.runtime.0 {
            Some(runtime) => Ok(runtime.block_on(future)),
            None => Err(StoreError::Unavailable(
                "archive store runtime is shut down".to_string(),
            )),
        }
    }

    fn call<T, F>(&self, op: &'static str, key: Option<&ArchiveKey>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ArchiveStore) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let slot = key.map(|key| self.slot(key));

        let outcome = self.block_on(async {
            tokio::time::timeout(self.timeout, async move {
                let guard = match slot {
                    Some(slot) => Some(slot.lock_owned().await),
                    None => None,
                };
                tokio::task::spawn_blocking(move || {
                    let _guard = guard;
                    f(inner.as_ref())
                })
                .await
            })
            .await
        })?;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(StoreError::Unavailable(format!(
                "archive store call '{}' died before answering: {}",
                op, e
            ))),
            Err(_) => {
                warn!(op, timeout = ?self.timeout, "Archive store call timed out");
                Err(StoreError::Timeout {
                    op,
                    after: self.timeout,
                })
            }
        }
    }
}

impl ArchiveStore for BoundedStore {
    fn get_marker(&self, key: &ArchiveKey) -> Result<Option<ArchiveMarker>> {
        let owned = key.clone();
        self.call("get_marker", Some(key), move |store| store.get_marker(&owned))
    }

    fn put_marker(&self, key: &ArchiveKey, marker: &ArchiveMarker) -> Result<()> {
        let owned = key.clone();
        let marker = marker.clone();
        self.call("put_marker", Some(key), move |store| {
            store.put_marker(&owned, &marker)
        })
    }

    fn mark_overlapping_range_invalidated(
        &self,
        sites: &[SiteId],
        range: &DateRange,
        segment: Option<&str>,
        plugin: Option<&str>,
    ) -> Result<()> {
        let sites = sites.to_vec();
        let range = *range;
        let segment = segment.map(str::to_string);
        let plugin = plugin.map(str::to_string);
        self.call("mark_overlapping_range_invalidated", None, move |store| {
            store.mark_overlapping_range_invalidated(
                &sites,
                &range,
                segment.as_deref(),
                plugin.as_deref(),
            )
        })
    }

    fn markers(&self) -> Result<Vec<(ArchiveKey, ArchiveMarker)>> {
        self.call("markers", None, |store| store.markers())
    }

    fn range_invalidations(&self) -> Result<Vec<RangeInvalidation>> {
        self.call("range_invalidations", None, |store| store.range_invalidations())
    }

    fn prune_ranges(&self, cutoff: DateTime<Utc>) -> Result<PruneStats> {
        self.call("prune_ranges", None, move |store| store.prune_ranges(cutoff))
    }

    fn mark_invalidated(&self, key: &ArchiveKey) -> Result<()> {
        let owned = key.clone();
        self.call("mark_invalidated", Some(key), move |store| {
            store.mark_invalidated(&owned)
        })
    }
}
