use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-user mutual exclusion for the recommendation replace step.
///
/// Two concurrent generation runs for the same user would interleave the
/// delete and insert halves of the replace, leaving a mixed or
/// double-written set; serializing per user keeps the persisted set the
/// output of exactly one run. Different users never contend.
///
/// Entries are never evicted; the map grows with the set of users that
/// generated at least once in this process.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one user, creating it on first use. The
    /// returned guard releases on drop.
    pub async fn acquire(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }
}
