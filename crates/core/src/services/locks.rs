//! Per-key async locks.

use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Async mutexes keyed by string, dropped once nobody holds or waits on them.
#[derive(Clone, Default)]
pub(crate) struct KeyedLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Run `fut` while holding the lock for `key`.
    ///
    /// The entry is released even when the returned future is dropped
    /// before it completes.
    pub(crate) async fn run<T>(&self, key: &str, fut: impl Future<Output = T>) -> T {
        // Declared first so it drops after `lock`
        let _release = Release {
            map: &self.inner,
            key,
        };
        let lock = self.inner.entry(key.to_string()).or_default().clone();
        let _guard = lock.lock().await;
        fut.await
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Drops a key's entry once its last user is gone.
struct Release<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.map.remove_if(self.key, |_, l| Arc::strong_count(l) == 1);
    }
}
