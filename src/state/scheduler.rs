use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::task::AbortHandle;

/// Bookkeeping for deferred quiz actions waiting on their timer.
///
/// A slot is reserved before the task is spawned so a task finishing early can release it
/// before its handle is tracked.
#[derive(Default)]
pub struct Scheduler {
    pending: DashMap<u64, Option<AbortHandle>>,
    next_id: AtomicU64,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a task about to be spawned.
    pub fn reserve(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(id, None);
        id
    }

    /// Attach the handle of a spawned task to its slot, unless the task already released it.
    pub fn track(&self, id: u64, handle: AbortHandle) {
        if let Some(mut slot) = self.pending.get_mut(&id) {
            *slot = Some(handle);
        }
    }

    /// Release the slot of a task whose timer fired.
    pub fn complete(&self, id: u64) {
        self.pending.remove(&id);
    }

    /// Abort every task still waiting, returning how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut cancelled = 0;
        for id in ids {
            if let Some((_, handle)) = self.pending.remove(&id) {
                if let Some(handle) = handle {
                    handle.abort();
                }
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Number of tasks waiting on their timer.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cancel_all_aborts_waiting_tasks() {
        let scheduler = Scheduler::new();
        let id = scheduler.reserve();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        scheduler.track(id, handle.abort_handle());
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.cancel_all(), 1);
        assert_eq!(scheduler.pending(), 0);
        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn released_slot_ignores_late_tracking() {
        let scheduler = Scheduler::new();
        let id = scheduler.reserve();
        scheduler.complete(id);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.cancel_all(), 0);
    }
}
