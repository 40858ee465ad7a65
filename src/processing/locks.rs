//! Per-file serialization of ingestion and deletion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per file identifier.
///
/// Ingestion holds the lock from extraction until its chunks are committed (or rolled back), so a
/// delete for the same file waits for the in-flight ingestion to settle. Unused entries are pruned
/// on the next acquisition.
#[derive(Default)]
pub(crate) struct FileLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FileLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn acquire(&self, file_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(file_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_file_waits_for_holder() {
        let locks = Arc::new(FileLocks::new());
        let guard = locks.acquire("f-1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("f-1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender acquires after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_files_do_not_block() {
        let locks = FileLocks::new();
        let _first = locks.acquire("f-1").await;
        let second = tokio::time::timeout(Duration::from_millis(200), locks.acquire("f-2")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = FileLocks::new();
        drop(locks.acquire("f-1").await);
        drop(locks.acquire("f-2").await);
        let _held = locks.acquire("f-3").await;
        assert_eq!(locks.tracked(), 1);
    }
}
