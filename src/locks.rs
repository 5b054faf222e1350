// Per-game lock registry: at most one mutation of a game runs at a time.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::metrics;

/// One async mutex per game id. Entries are created on first use; the map's
/// entry API makes creation atomic, so two callers racing on a new id end up
/// sharing the same mutex.
#[derive(Default)]
pub struct LockRegistry {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `game_id`. The guard releases the lock
    /// when dropped, on every exit path.
    pub async fn acquire(&self, game_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        metrics::LOCK_REGISTRY_SIZE.set(self.locks.len() as i64);

        let started = Instant::now();
        let guard = lock.lock_owned().await;
        metrics::LOCK_WAIT_MS.observe(started.elapsed().as_secs_f64() * 1000.0);
        guard
    }

    /// Drop the entry for a game that will not be mutated again. Callers
    /// already holding or waiting on the old mutex keep it alive until done.
    pub fn remove(&self, game_id: Uuid) {
        self.locks.remove(&game_id);
        metrics::LOCK_REGISTRY_SIZE.set(self.locks.len() as i64);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
