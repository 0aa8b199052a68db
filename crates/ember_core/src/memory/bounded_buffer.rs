//! # Bounded Buffer
//!
//! A growable vector with a hard element limit, cleared without releasing
//! its allocation.

use thiserror::Error;

/// Errors returned when a [`BoundedBuffer`] cannot accept another element.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The buffer already holds its maximum number of elements.
    #[error("buffer full: limit of {limit} elements reached")]
    Full {
        /// The hard limit.
        limit: usize,
    },

    /// Growing the backing storage failed.
    #[error("failed to grow buffer to {requested} elements")]
    AllocationFailed {
        /// Capacity that was requested.
        requested: usize,
    },
}

/// Lifetime counters for a [`BoundedBuffer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Number of times the backing storage grew.
    pub grow_count: u32,
    /// Largest number of elements held at once.
    pub high_water_mark: usize,
    /// Number of pushes rejected.
    pub rejected: u64,
}

/// A vector that grows up to `limit` elements and is reused across frames.
///
/// # Thread Safety
///
/// Not shared. Each render worker owns its own buffer.
///
/// # Example
///
/// ```rust
/// use ember_core::{BoundedBuffer, BufferError};
///
/// let mut buffer = BoundedBuffer::new(2, 3);
/// buffer.try_push(1).unwrap();
/// buffer.try_push(2).unwrap();
/// buffer.try_push(3).unwrap(); // grows
/// assert_eq!(buffer.try_push(4), Err(BufferError::Full { limit: 3 }));
///
/// buffer.clear(); // keeps the allocation
/// assert!(buffer.capacity() >= 3);
/// ```
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    items: Vec<T>,
    limit: usize,
    stats: BufferStats,
}

impl<T> BoundedBuffer<T> {
    /// Creates a buffer with `initial_capacity` pre-allocated slots and a hard
    /// limit of `limit` elements.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is zero.
    #[must_use]
    pub fn new(initial_capacity: usize, limit: usize) -> Self {
        assert!(limit > 0, "Limit must be greater than zero");

        Self {
            items: Vec::with_capacity(initial_capacity.min(limit)),
            limit,
            stats: BufferStats::default(),
        }
    }

    /// Appends an element, growing the storage if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Full`] at the hard limit, or
    /// [`BufferError::AllocationFailed`] if growing the storage failed.
    pub fn try_push(&mut self, value: T) -> Result<(), BufferError> {
        if self.items.len() >= self.limit {
            self.stats.rejected += 1;
            return Err(BufferError::Full { limit: self.limit });
        }

        if self.items.len() == self.items.capacity() {
            self.grow()?;
        }

        self.items.push(value);
        self.stats.high_water_mark = self.stats.high_water_mark.max(self.items.len());
        Ok(())
    }

    /// Doubles the capacity, capped at the limit.
    fn grow(&mut self) -> Result<(), BufferError> {
        let current = self.items.capacity();
        let target = (current.max(8) * 2).min(self.limit);
        let additional = target - self.items.len();

        if self.items.try_reserve_exact(additional).is_err() {
            self.stats.rejected += 1;
            return Err(BufferError::AllocationFailed { requested: target });
        }

        self.stats.grow_count += 1;
        Ok(())
    }

    /// Shortens the buffer to `len` elements, keeping the allocation.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Removes all elements, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns the stored elements.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Returns the number of stored elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no elements are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the allocated capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Returns the hard limit.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of additional elements accepted before the limit.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.items.len()
    }

    /// Returns lifetime counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> BufferStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_limit() {
        let mut buffer = BoundedBuffer::new(1, 4);
        for i in 0..4 {
            buffer.try_push(i).unwrap();
        }
        assert_eq!(buffer.try_push(4), Err(BufferError::Full { limit: 4 }));
        assert_eq!(buffer.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(buffer.stats().rejected, 1);
    }

    #[test]
    fn test_growth_is_capped_at_limit() {
        let mut buffer = BoundedBuffer::new(0, 20);
        for i in 0..20 {
            buffer.try_push(i).unwrap();
        }
        assert!(buffer.capacity() >= 20);
        assert!(buffer.stats().grow_count >= 1);
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buffer = BoundedBuffer::new(16, 64);
        for i in 0..10 {
            buffer.try_push(i).unwrap();
        }
        let capacity = buffer.capacity();

        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), capacity);
        assert_eq!(buffer.stats().high_water_mark, 10);
    }

    #[test]
    fn test_no_growth_when_prewarmed() {
        let mut buffer = BoundedBuffer::new(32, 32);
        for _ in 0..3 {
            for i in 0..32 {
                buffer.try_push(i).unwrap();
            }
            buffer.clear();
        }
        assert_eq!(buffer.stats().grow_count, 0);
    }

    #[test]
    fn test_truncate() {
        let mut buffer = BoundedBuffer::new(4, 4);
        for i in 0..4 {
            buffer.try_push(i).unwrap();
        }
        buffer.truncate(1);
        assert_eq!(buffer.as_slice(), &[0]);
    }

    #[test]
    #[should_panic(expected = "Limit must be greater than zero")]
    fn test_zero_limit_panics() {
        let _ = BoundedBuffer::<u8>::new(0, 0);
    }
}
