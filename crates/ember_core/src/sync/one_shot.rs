//! # One-Shot Flag
//!
//! A signal raised by one party and consumed exactly once by another.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-shot boolean token.
///
/// Raising an already raised flag has no extra effect: the consumer observes
/// it once and the flag is cleared in the same atomic step.
///
/// ```rust
/// use ember_core::OneShotFlag;
///
/// let flag = OneShotFlag::new();
/// flag.raise();
/// flag.raise();
/// assert!(flag.take());
/// assert!(!flag.take());
/// ```
#[derive(Debug, Default)]
pub struct OneShotFlag {
    raised: AtomicBool,
}

impl OneShotFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Raises the flag.
    #[inline]
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Consumes the flag. Returns true if it was raised.
    #[inline]
    #[must_use]
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Returns whether the flag is raised, without consuming it.
    #[inline]
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
