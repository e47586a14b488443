//! A per-key async mutex with reference counting (§5, §9): at most one
//! in-flight Reconciler/renewal invocation per `instance_id`, without
//! leaking an entry for every Route that has ever been touched — locks are
//! removed once their last holder drops, the same pooling discipline this
//! lineage's nonce pool applies to short-lived resources.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Entry {
    lock: Arc<AsyncMutex<()>>,
    refcount: usize,
}

#[derive(Default)]
pub struct KeyedLocks {
    table: StdMutex<HashMap<String, Entry>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, creating its entry if this is the first
    /// concurrent holder. The returned guard releases the per-key lock and,
    /// if it was the last holder, removes the bookkeeping entry on drop.
    pub async fn lock(&self, key: &str) -> KeyedLockGuard<'_> {
        let per_key_lock = {
            let mut table = self.table.lock().expect("keyed lock table poisoned");
            let entry = table.entry(key.to_string()).or_insert_with(|| Entry {
                lock: Arc::new(AsyncMutex::new(())),
                refcount: 0,
            });
            entry.refcount += 1;
            entry.lock.clone()
        };

        let guard = per_key_lock.lock_owned().await;
        KeyedLockGuard {
            locks: self,
            key: key.to_string(),
            _guard: guard,
        }
    }

    fn release(&self, key: &str) {
        let mut table = self.table.lock().expect("keyed lock table poisoned");
        if let Some(entry) = table.get_mut(key) {
            entry.refcount -= 1;
            if entry.refcount == 0 {
                table.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.table.lock().expect("keyed lock table poisoned").len()
    }
}

pub struct KeyedLockGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for KeyedLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entry_is_removed_once_last_holder_drops() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.lock("inst-1").await;
            assert_eq!(locks.tracked_keys(), 1);
        }
        assert_eq!(locks.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn same_key_serializes_concurrent_holders() {
        let locks = Arc::new(KeyedLocks::new());
        let order = Arc::new(StdMutex::new(Vec::new()));

        let l1 = locks.clone();
        let o1 = order.clone();
        let h1 = tokio::spawn(async move {
            let _guard = l1.lock("inst-1").await;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            o1.lock().unwrap().push(1);
        });

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let l2 = locks.clone();
        let o2 = order.clone();
        let h2 = tokio::spawn(async move {
            let _guard = l2.lock("inst-1").await;
            o2.lock().unwrap().push(2);
        });

        h1.await.unwrap();
        h2.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }
}
