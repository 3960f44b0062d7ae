use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Default minimum spacing between two backtest runs
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(30);

const NEVER: i64 = i64::MIN;

/// Per-service request spacing guard.
///
/// `try_acquire` compares and records the run timestamp in one atomic step,
/// so two concurrent callers cannot both pass the same window.
#[derive(Debug)]
pub struct RateGuard {
    min_interval_ms: i64,
    last_run_ms: AtomicI64,
}

impl RateGuard {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval_ms: i64::try_from(min_interval.as_millis()).unwrap_or(i64::MAX),
            last_run_ms: AtomicI64::new(NEVER),
        }
    }

    pub fn min_interval_ms(&self) -> i64 {
        self.min_interval_ms
    }

    pub fn last_run_ms(&self) -> Option<i64> {
        match self.last_run_ms.load(Ordering::Acquire) {
            NEVER => None,
            t => Some(t),
        }
    }

    /// Record a run at `now_ms`, or return the milliseconds left to wait
    pub fn try_acquire(&self, now_ms: i64) -> Result<(), i64> {
        self.last_run_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                if last == NEVER || now_ms.saturating_sub(last) >= self.min_interval_ms {
                    Some(now_ms)
                } else {
                    None
                }
            })
            .map(|_| ())
            .map_err(|last| self.min_interval_ms - now_ms.saturating_sub(last))
    }

    /// Forget the last run so the next request is accepted
    pub fn reset(&self) {
        self.last_run_ms.store(NEVER, Ordering::Release);
    }
}

impl Default for RateGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_run_passes() {
        let guard = RateGuard::default();
        assert_eq!(guard.last_run_ms(), None);
        assert!(guard.try_acquire(0).is_ok());
        assert_eq!(guard.last_run_ms(), Some(0));
    }

    #[test]
    fn test_spacing() {
        let guard = RateGuard::default();
        guard.try_acquire(1_000_000).unwrap();

        assert_eq!(guard.try_acquire(1_010_000), Err(20_000));
        assert!(guard.try_acquire(1_030_000).is_ok());
        assert_eq!(guard.last_run_ms(), Some(1_030_000));
    }

    #[test]
    fn test_rejected_attempt_does_not_move_window() {
        let guard = RateGuard::default();
        guard.try_acquire(0).unwrap();
        assert!(guard.try_acquire(29_999).is_err());
        assert_eq!(guard.last_run_ms(), Some(0));
        assert!(guard.try_acquire(30_000).is_ok());
    }

    #[test]
    fn test_clock_going_backwards_is_rejected() {
        let guard = RateGuard::default();
        guard.try_acquire(100_000).unwrap();
        assert!(guard.try_acquire(50_000).is_err());
    }

    #[test]
    fn test_reset() {
        let guard = RateGuard::default();
        guard.try_acquire(0).unwrap();
        guard.reset();
        assert!(guard.try_acquire(1).is_ok());
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let guard = Arc::new(RateGuard::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                std::thread::spawn(move || guard.try_acquire(5_000).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }
}
