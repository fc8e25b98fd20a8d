//! Deferred board effects tied to a session generation
//!
//! Every effect is a tokio task that sleeps for its delay and then runs only
//! if the session generation it was scheduled in is still current.
//! [`EffectScheduler::cancel_all`] bumps the generation and aborts whatever is
//! still sleeping, so a reply scheduled for an abandoned line can never land
//! on the next one.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
struct Shared {
    generation: AtomicU64,
    pending: Mutex<HashMap<u64, JoinHandle<()>>>,
    idle: Notify,
}

impl Shared {
    fn finish(&self, id: u64) {
        let mut pending = self.pending.lock();
        pending.remove(&id);
        if pending.is_empty() {
            self.idle.notify_waiters();
        }
    }
}

/// Scheduler for delayed, cancellable effects
#[derive(Default)]
pub struct EffectScheduler {
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// `true` when no effect is waiting to run
    pub fn is_idle(&self) -> bool {
        self.shared.pending.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Run `effect` after `delay` unless the generation moves on first
    ///
    /// `effect` receives the generation it was scheduled in so it can re-check
    /// it under its own locks.
    pub fn schedule<F>(&self, delay: Duration, effect: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.schedule_for(self.generation(), delay, effect);
    }

    /// Like [`EffectScheduler::schedule`], on behalf of `generation`
    ///
    /// Nothing is scheduled when `generation` is already stale. Returns
    /// whether the effect was scheduled.
    pub fn schedule_for<F>(&self, generation: u64, delay: Duration, effect: F) -> bool
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);

        // Held across spawn so a zero-delay task cannot finish before it is tracked
        let mut pending = self.shared.pending.lock();
        if !self.is_current(generation) {
            debug!("[SESSION] Not scheduling for stale generation {}", generation);
            return false;
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if shared.generation.load(Ordering::SeqCst) == generation {
                effect(generation);
            } else {
                debug!("[SESSION] Dropping effect from generation {}", generation);
            }
            shared.finish(id);
        });
        pending.insert(id, handle);
        true
    }

    /// Invalidate every scheduled effect and start a new generation
    pub fn cancel_all(&self) -> u64 {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut pending = self.shared.pending.lock();
        let cancelled = pending.len();
        for (_, handle) in pending.drain() {
            handle.abort();
        }
        drop(pending);
        self.shared.idle.notify_waiters();

        if cancelled > 0 {
            debug!(
                "[SESSION] Cancelled {} pending effect(s), generation now {}",
                cancelled, generation
            );
        }
        generation
    }

    /// Wait until no effect is pending
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_effect_runs_after_delay() {
        let scheduler = EffectScheduler::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        scheduler.schedule(Duration::from_millis(200), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!scheduler.is_idle());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0, "not before the delay");

        scheduler.wait_idle().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_drops_stale_effects() {
        let scheduler = EffectScheduler::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        scheduler.schedule(Duration::from_millis(600), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let before = scheduler.generation();
        let after = scheduler.cancel_all();

        assert_eq!(after, before + 1);
        assert!(scheduler.is_idle());
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0, "cancelled effect never runs");
    }

    #[tokio::test(start_paused = true)]
    async fn test_effect_receives_its_generation() {
        let scheduler = EffectScheduler::new();
        scheduler.cancel_all();
        let seen = Arc::new(AtomicU64::new(u64::MAX));

        let slot = Arc::clone(&seen);
        scheduler.schedule(Duration::ZERO, move |generation| {
            slot.store(generation, Ordering::SeqCst);
        });
        scheduler.wait_idle().await;

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_for_stale_generation_is_skipped() {
        let scheduler = EffectScheduler::new();
        let stale = scheduler.generation();
        scheduler.cancel_all();

        let scheduled = scheduler.schedule_for(stale, Duration::from_millis(10), |_| {
            panic!("stale effect must not run");
        });

        assert!(!scheduled);
        assert!(scheduler.is_idle(), "nothing tracked for a stale generation");
    }
}
