use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

/// Per-key exclusive scopes. Holding the guard for a key serializes the
/// whole read-check-write window against other writers on the same key;
/// distinct keys never contend.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

/// How long a writer may wait for a contended key before the request is
/// surfaced as retryable, rather than misreported as a business conflict.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive scope for `key`, waiting at most
    /// [`ACQUIRE_TIMEOUT`]. `None` means the wait timed out and the caller
    /// should report a transient failure.
    ///
    /// Each acquire also sweeps out entries nobody holds or waits on
    /// (strong count 1 means the map owns the only reference), so the map
    /// stays bounded by the number of currently contended keys.
    pub async fn acquire(&self, key: i64) -> Option<OwnedMutexGuard<()>> {
        let entry = {
            let mut map = self.inner.lock().await;
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(key).or_default())
        };
        timeout(ACQUIRE_TIMEOUT, entry.lock_owned()).await.ok()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
