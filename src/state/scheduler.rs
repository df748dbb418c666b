//! One-shot per-room timers driving automatic round ends.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::AbortHandle;

/// A scheduled one-shot, identified by the generation it was armed with.
struct PendingTimer {
    generation: u64,
    handle: AbortHandle,
}

/// Owns at most one pending timer per room.
///
/// Scheduling replaces any prior timer for the room, so the round-duration
/// timer and the early-end timer can never both fire. A fired timer consumes
/// its slot before running its callback; losing that removal race means the
/// timer was cancelled or replaced in the meantime, and the callback is
/// skipped. Callbacks still re-check room status themselves, so a stale fire
/// that slips through ends up a no-op.
pub struct RoundScheduler {
    timers: Arc<DashMap<String, PendingTimer>>,
    generation: AtomicU64,
}

impl Default for RoundScheduler {
    fn default() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }
}

impl RoundScheduler {
    /// Create a scheduler with no pending timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot for the room, replacing any pending timer.
    pub fn schedule<F, Fut>(&self, code: &str, delay: Duration, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);
        let key = code.to_string();

        let entry = self.timers.entry(key.clone());
        // Spawn while holding the map entry: the task cannot observe the
        // slot until its handle is registered below.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Consume the slot before firing; the timer is a one-shot.
            let armed = timers
                .remove_if(&key, |_, pending| pending.generation == generation)
                .is_some();
            if armed {
                task().await;
            }
        })
        .abort_handle();

        let pending = PendingTimer { generation, handle };
        let previous = match entry {
            Entry::Occupied(mut occupied) => Some(std::mem::replace(occupied.get_mut(), pending)),
            Entry::Vacant(vacant) => {
                vacant.insert(pending);
                None
            }
        };

        if let Some(previous) = previous {
            previous.handle.abort();
        }
    }

    /// Drop the room's pending timer, if any.
    pub fn cancel(&self, code: &str) {
        if let Some((_, pending)) = self.timers.remove(code) {
            pending.handle.abort();
        }
    }

    /// Whether a timer is currently armed for the room.
    pub fn is_pending(&self, code: &str) -> bool {
        self.timers.contains_key(code)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    fn counter() -> (Arc<AtomicU32>, impl Fn() -> Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let clone = Arc::clone(&count);
        (count, move || Arc::clone(&clone))
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay_and_clears_its_slot() {
        let scheduler = RoundScheduler::new();
        let (fired, fired_ref) = counter();

        let hit = fired_ref();
        scheduler.schedule("room", Duration::from_secs(30), move || async move {
            hit.fetch_add(1, Ordering::SeqCst);
        });
        assert!(scheduler.is_pending("room"));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending("room"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_fire() {
        let scheduler = RoundScheduler::new();
        let (fired, fired_ref) = counter();

        let hit = fired_ref();
        scheduler.schedule("room", Duration::from_secs(30), move || async move {
            hit.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.cancel("room");

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_pending("room"));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_timer() {
        let scheduler = RoundScheduler::new();
        let (slow, slow_ref) = counter();
        let (fast, fast_ref) = counter();

        let hit = slow_ref();
        scheduler.schedule("room", Duration::from_secs(30), move || async move {
            hit.fetch_add(1, Ordering::SeqCst);
        });
        // The early-end path replaces the round-duration timer.
        let hit = fast_ref();
        scheduler.schedule("room", Duration::from_secs(3), move || async move {
            hit.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(slow.load(Ordering::SeqCst), 0);
        assert_eq!(fast.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rooms_keep_independent_timers() {
        let scheduler = RoundScheduler::new();
        let (fired, fired_ref) = counter();

        for code in ["one", "two"] {
            let hit = fired_ref();
            scheduler.schedule(code, Duration::from_secs(10), move || async move {
                hit.fetch_add(1, Ordering::SeqCst);
            });
        }
        scheduler.cancel("one");

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
