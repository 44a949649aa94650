//! Cancellable one-shot debounce timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::util::lock;

#[derive(Debug, Default)]
struct TimerSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// Runs a callback once the timer has gone `window` without being re-armed.
///
/// Re-arming bumps the generation and aborts the previous sleep, so at most
/// one callback is ever pending. Dropping the timer cancels it.
#[derive(Debug)]
pub struct DebounceTimer {
    window: Duration,
    slot: Arc<Mutex<TimerSlot>>,
}

impl DebounceTimer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slot: Arc::new(Mutex::new(TimerSlot::default())),
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Start (or restart) the countdown. Must be called inside a Tokio runtime.
    pub fn arm<F>(&self, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + self.window;
        let slot = Arc::clone(&self.slot);

        let mut current = lock(&self.slot);
        current.generation = current.generation.wrapping_add(1);
        let generation = current.generation;
        if let Some(previous) = current.handle.take() {
            previous.abort();
        }

        current.handle = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut current = lock(&slot);
                if current.generation != generation {
                    return;
                }
                current.handle = None;
            }
            on_fire();
        }));
    }

    /// Drop the pending countdown, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut current = lock(&self.slot);
        current.generation = current.generation.wrapping_add(1);
        current.handle.take().is_some_and(|handle| {
            handle.abort();
            true
        })
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        lock(&self.slot).handle.is_some()
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&fired);
        let make = move || {
            let fired = Arc::clone(&handle);
            Box::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_window() {
        let timer = DebounceTimer::new(Duration::from_millis(800));
        let (fired, make) = counter();

        timer.arm(make());
        assert!(timer.is_armed());
        tokio::time::sleep(Duration::from_millis(799)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_window() {
        let timer = DebounceTimer::new(Duration::from_millis(800));
        let (fired, make) = counter();

        timer.arm(make());
        tokio::time::sleep(Duration::from_millis(500)).await;
        timer.arm(make());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let timer = DebounceTimer::new(Duration::from_millis(100));
        let (fired, make) = counter();

        timer.arm(make());
        assert!(timer.cancel());
        assert!(!timer.cancel());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
