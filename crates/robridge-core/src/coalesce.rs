//! Sharing of in-flight work between identical concurrent cache misses.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

type Slot<T> = Arc<OnceCell<T>>;

/// Runs at most one computation per key at a time; callers that arrive while
/// it is running await the same result.
///
/// If the running caller is dropped mid-flight, one of the waiters takes
/// over the computation. A slot nobody holds any more is removed, whether
/// its computation finished or was abandoned.
#[derive(Debug)]
pub struct Coalescer<T> {
    inflight: Arc<Mutex<HashMap<String, Slot<T>>>>,
}

impl<T> Clone for Coalescer<T> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = {
            let mut inflight = self
                .inflight
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(
                inflight
                    .entry(key.to_owned())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let guard = SlotGuard {
            inflight: &self.inflight,
            key,
            slot: Some(slot),
        };
        let value = guard.cell().get_or_init(compute).await.clone();
        value
    }

    /// Keys with a computation currently running.
    pub fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Releases one caller's hold on a slot, on completion or cancellation.
struct SlotGuard<'a, T> {
    inflight: &'a Mutex<HashMap<String, Slot<T>>>,
    key: &'a str,
    slot: Option<Slot<T>>,
}

impl<T> SlotGuard<'_, T> {
    fn cell(&self) -> &OnceCell<T> {
        match &self.slot {
            Some(slot) => slot.as_ref(),
            None => unreachable!("slot is only taken on drop"),
        }
    }
}

impl<T> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let owned = inflight
            .get(self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &slot));
        // Two holders left means the map and this guard.
        if owned && (slot.initialized() || Arc::strong_count(&slot) == 2) {
            inflight.remove(self.key);
        }
        // Released under the lock so the next guard sees the new count.
        drop(slot);
    }
}
