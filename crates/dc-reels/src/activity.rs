//! In-flight animation step counter
//!
//! A single `AtomicU64` packs an epoch (high 32 bits) and a count (low 32
//! bits). Guards remember the epoch they were issued in; after a forced
//! reset bumps the epoch, stale guards drop without touching the new count.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

const COUNT_MASK: u64 = 0xFFFF_FFFF;
const EPOCH_SHIFT: u32 = 32;

#[inline]
fn count_of(state: u64) -> usize {
    (state & COUNT_MASK) as usize
}

#[inline]
fn epoch_of(state: u64) -> u32 {
    (state >> EPOCH_SHIFT) as u32
}

struct ActivityInner {
    state: AtomicU64,
    idle: Notify,
}

/// Shared counter of animation steps in flight
#[derive(Clone)]
pub struct ActivityCounter {
    inner: Arc<ActivityInner>,
}

impl ActivityCounter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ActivityInner {
                state: AtomicU64::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Mark one step as started. The step ends when the guard drops.
    pub fn begin(&self) -> ActivityGuard {
        let previous = self.inner.state.fetch_add(1, Ordering::AcqRel);
        ActivityGuard {
            inner: Arc::clone(&self.inner),
            epoch: epoch_of(previous),
        }
    }

    /// Steps currently in flight
    pub fn in_flight(&self) -> usize {
        count_of(self.inner.state.load(Ordering::Acquire))
    }

    pub fn epoch(&self) -> u32 {
        epoch_of(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Force the count to zero and invalidate every outstanding guard
    pub fn reset(&self) {
        let _ = self
            .inner
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let epoch = epoch_of(state).wrapping_add(1) as u64;
                Some(epoch << EPOCH_SHIFT)
            });
        self.inner.idle.notify_waiters();
    }

    /// Resolve once no step is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a decrement in between is not lost
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ActivityCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActivityCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityCounter")
            .field("in_flight", &self.in_flight())
            .field("epoch", &self.epoch())
            .finish()
    }
}

/// Keeps one step counted until dropped
#[must_use = "the step is counted only while the guard is alive"]
pub struct ActivityGuard {
    inner: Arc<ActivityInner>,
    epoch: u32,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        let epoch = self.epoch;
        let result = self
            .inner
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                if epoch_of(state) == epoch && count_of(state) > 0 {
                    Some(state - 1)
                } else {
                    None
                }
            });

        if let Ok(previous) = result {
            if count_of(previous) == 1 {
                self.inner.idle.notify_waiters();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_guard_counts() {
        let counter = ActivityCounter::new();
        let a = counter.begin();
        let b = counter.begin();
        assert_eq!(counter.in_flight(), 2);
        drop(a);
        assert_eq!(counter.in_flight(), 1);
        drop(b);
        assert!(counter.is_idle());
    }

    #[test]
    fn test_reset_ignores_stale_guards() {
        let counter = ActivityCounter::new();
        let stale = counter.begin();
        counter.reset();
        assert_eq!(counter.in_flight(), 0);
        assert_eq!(counter.epoch(), 1);

        let fresh = counter.begin();
        drop(stale);
        assert_eq!(counter.in_flight(), 1);
        drop(fresh);
        assert_eq!(counter.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_resolves_after_last_guard() {
        let counter = ActivityCounter::new();
        let guard = counter.begin();

        let waiter = {
            let counter = counter.clone();
            tokio::spawn(async move { counter.wait_idle().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(counter.is_idle());
    }

    #[tokio::test]
    async fn test_wait_idle_when_already_idle() {
        ActivityCounter::new().wait_idle().await;
    }
}
