//! Cancellable one-shot timer for debounced input.
//!
//! `arm()` cancels whatever is pending and schedules a new action `delay`
//! from now, so only the most recently armed action can ever fire. The timer
//! covers the quiet period only: once the action has run, anything it spawned
//! is outside the timer's reach and cannot be aborted by a later `arm()`.
//!
//! Must be used from within a tokio runtime.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct DebounceTimer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending action and schedule `action` after the delay.
    pub fn arm<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    /// Cancel the pending action. Returns true if one was still waiting.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                let was_waiting = !handle.is_finished();
                handle.abort();
                was_waiting
            }
            None => false,
        }
    }

    /// True while an action is armed and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        // The guarded value is a plain handle; a poisoned lock is still usable.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let make = move || {
            let c = c.clone();
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let timer = DebounceTimer::new(Duration::from_millis(300));
        let (count, make) = counter();

        timer.arm(make());
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_cancels_previous() {
        let timer = DebounceTimer::new(Duration::from_millis(300));
        let (count, make) = counter();

        timer.arm(make());
        tokio::time::sleep(Duration::from_millis(200)).await;
        timer.arm(make());
        tokio::time::sleep(Duration::from_millis(200)).await;
        timer.arm(make());

        // 400ms since the first arm, but only 0ms since the last
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(301)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_fire() {
        let timer = DebounceTimer::new(Duration::from_millis(300));
        let (count, make) = counter();

        timer.arm(make());
        assert!(timer.cancel());
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_reports_nothing_pending() {
        let timer = DebounceTimer::new(Duration::from_millis(10));
        let (count, make) = counter();

        timer.arm(make());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.cancel());
    }

    #[tokio::test]
    async fn cancel_without_arm_is_noop() {
        let timer = DebounceTimer::new(Duration::from_millis(10));
        assert!(!timer.cancel());
        assert_eq!(timer.delay(), Duration::from_millis(10));
    }
}
