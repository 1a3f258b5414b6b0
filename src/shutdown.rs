//! Cooperative cancellation shared by every pipeline loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest single sleep while waiting, so a trigger is noticed promptly
const POLL_SLICE: Duration = Duration::from_millis(10);

/// Clonable flag; once triggered it stays triggered
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!("[Shutdown] Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` or until triggered, whichever comes first
    ///
    /// # Returns
    /// `true` if the signal was triggered while (or before) waiting
    ///
    /// A duration too long to schedule waits for the trigger alone.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.is_triggered() {
                return true;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    (deadline - now).min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };
            std::thread::sleep(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_is_shared_between_clones() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_triggered());
        signal.trigger();
        assert!(clone.is_triggered());
    }

    #[test]
    fn test_sleep_returns_early_when_triggered() {
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            trigger.trigger();
        });

        let started = Instant::now();
        assert!(signal.sleep(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }

    #[test]
    fn test_unbounded_sleep_waits_for_trigger() {
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            trigger.trigger();
        });

        assert!(signal.sleep(Duration::MAX));
        handle.join().unwrap();
    }

    #[test]
    fn test_sleep_runs_full_duration_when_idle() {
        let signal = ShutdownSignal::new();
        let started = Instant::now();
        assert!(!signal.sleep(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
