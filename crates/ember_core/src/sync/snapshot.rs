//! # Snapshot Cell
//!
//! One writer publishes complete values; any number of readers load the
//! current one.
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────────────────────┐
//!                │         SnapshotCell         │
//!                │                              │
//!                │   RwLock< Arc<T> >  ──────┐  │
//!                │   generation: AtomicU64   │  │
//!                └───────────────────────────┼──┘
//!                                            │
//!            ┌───────────────────────────────┼──────────────┐
//!            ▼                               ▼              ▼
//!     ┌──────────────┐               ┌────────────┐  ┌────────────┐
//!     │  publish()   │               │  load()    │  │  load()    │
//!     │ (swap Arc)   │               │ (Arc clone)│  │ (Arc clone)│
//!     └──────────────┘               └────────────┘  └────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! - The lock is held only for a pointer swap or an `Arc` clone, never while
//!   the value is being built or read.
//! - A loaded `Arc<T>` stays valid and unchanged for as long as the reader
//!   keeps it, regardless of later publishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Copy-on-publish cell holding the latest complete value of `T`.
///
/// ## Usage
///
/// ```rust
/// use std::sync::Arc;
/// use ember_core::SnapshotCell;
///
/// let cell = Arc::new(SnapshotCell::new((0u64, 0u64)));
///
/// // Writer
/// cell.publish((1, 1));
///
/// // Reader (any thread)
/// let current = cell.load();
/// assert_eq!(current.0, current.1);
/// ```
pub struct SnapshotCell<T> {
    /// The current value. Replaced as a whole on publish.
    current: RwLock<Arc<T>>,

    /// Number of publishes since creation.
    generation: AtomicU64,
}

impl<T> SnapshotCell<T> {
    /// Creates a cell holding `initial` at generation zero.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the current value.
    ///
    /// The returned `Arc` is a complete snapshot; later publishes do not
    /// affect it.
    #[inline]
    #[must_use]
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Publishes a new value, discarding the previous one.
    pub fn publish(&self, value: T) {
        drop(self.replace(Arc::new(value)));
    }

    /// Publishes `value` and returns the snapshot it replaced.
    ///
    /// Writers can hand the returned `Arc` to `Arc::try_unwrap` to recycle
    /// the old value's buffers once no reader holds it anymore.
    pub fn replace(&self, value: Arc<T>) -> Arc<T> {
        let previous = std::mem::replace(&mut *self.current.write(), value);
        self.generation.fetch_add(1, Ordering::Release);
        previous
    }

    /// Returns how many times a value has been published.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCell")
            .field("current", &*self.load())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_value() {
        let cell = SnapshotCell::new(7u32);
        assert_eq!(*cell.load(), 7);
        assert_eq!(cell.generation(), 0);
    }

    #[test]
    fn test_publish_replaces_value() {
        let cell = SnapshotCell::new(String::from("a"));
        let held = cell.load();

        cell.publish(String::from("b"));

        assert_eq!(cell.load().as_str(), "b");
        // Old snapshot is untouched for the reader that still holds it
        assert_eq!(held.as_str(), "a");
        assert_eq!(cell.generation(), 1);
    }

    #[test]
    fn test_replace_returns_previous_for_recycling() {
        let cell = SnapshotCell::new(vec![1u8, 2, 3]);
        let previous = cell.replace(Arc::new(vec![4]));

        let recycled = Arc::try_unwrap(previous).expect("no reader holds the old value");
        assert_eq!(recycled, vec![1, 2, 3]);
    }

    #[test]
    fn test_replace_keeps_shared_previous() {
        let cell = SnapshotCell::new(vec![1u8]);
        let reader = cell.load();
        let previous = cell.replace(Arc::new(vec![2]));

        // A reader still holds it, so it cannot be recycled
        assert!(Arc::try_unwrap(previous).is_err());
        assert_eq!(*reader, vec![1]);
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_pair() {
        let cell = Arc::new(SnapshotCell::new((0u64, String::from("0"))));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        let snapshot = cell.load();
                        assert_eq!(snapshot.0.to_string(), snapshot.1);
                    }
                })
            })
            .collect();

        for n in 1..=5_000u64 {
            cell.publish((n, n.to_string()));
        }

        for reader in readers {
            reader.join().expect("reader thread panicked");
        }
        assert_eq!(cell.generation(), 5_000);
    }
}
