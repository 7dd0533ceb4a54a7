//! Once-only consumption flag shared by events and error reports.

use std::sync::atomic::{AtomicBool, Ordering};

/// A latch that records whether something has been handled.
///
/// Events and [`ErrorReport`](crate::ErrorReport)s both carry one. The latch is
/// flipped atomically, so concurrent callers racing on [`flag_handled`] will
/// observe exactly one winner.
///
/// [`flag_handled`]: ConsumptionGuard::flag_handled
#[derive(Debug, Default)]
pub struct ConsumptionGuard {
    handled: AtomicBool,
}

impl ConsumptionGuard {
    /// Creates a guard in the unhandled state.
    pub const fn new() -> Self {
        Self {
            handled: AtomicBool::new(false),
        }
    }

    /// Marks the guard as handled.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// guard had already been flagged.
    pub fn flag_handled(&self) -> bool {
        !self.handled.swap(true, Ordering::AcqRel)
    }

    /// Returns whether the guard has been flagged.
    pub fn was_handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }

    /// Resets the guard to the unhandled state.
    pub fn recycle(&self) {
        self.handled.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_once_only() {
        let guard = ConsumptionGuard::new();
        assert!(!guard.was_handled());
        assert!(guard.flag_handled());
        assert!(!guard.flag_handled());
        assert!(guard.was_handled());
    }

    #[test]
    fn test_recycle_resets() {
        let guard = ConsumptionGuard::new();
        guard.flag_handled();
        guard.recycle();
        assert!(!guard.was_handled());
        assert!(guard.flag_handled());
    }

    #[test]
    fn test_concurrent_flag_has_single_winner() {
        let guard = std::sync::Arc::new(ConsumptionGuard::new());
        let winners: usize = (0..8)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.flag_handled())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}
