//! Optionally bounded ring buffer for sample history.
//!
//! - **Unbounded**: grows for the lifetime of the process (default retention)
//! - **Bounded**: never exceeds its capacity; pushing at capacity evicts the
//!   oldest element and hands it back to the caller
//!
//! # Example
//!
//! ```rust,ignore
//! use smi_viz::telemetry::RingBuffer;
//!
//! let mut buffer = RingBuffer::bounded(100);
//! for i in 0..200 {
//!     buffer.push(i as f64);
//! }
//! assert_eq!(buffer.len(), 100);
//! assert_eq!(buffer.latest(), Some(&199.0));
//! ```

use std::collections::VecDeque;

/// A ring buffer for time-ordered data with optional capacity.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Internal storage using VecDeque for O(1) push/pop at both ends.
    data: VecDeque<T>,
    /// Maximum capacity, `None` when unbounded.
    capacity: Option<usize>,
}

impl<T> RingBuffer<T> {
    /// Creates a buffer that keeps at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be greater than 0");
        Self { data: VecDeque::with_capacity(capacity), capacity: Some(capacity) }
    }

    /// Creates a buffer without a capacity limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self { data: VecDeque::new(), capacity: None }
    }

    /// Pushes a value, returning the evicted oldest value when at capacity.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = match self.capacity {
            Some(capacity) if self.data.len() >= capacity => self.data.pop_front(),
            _ => None,
        };
        self.data.push_back(value);
        evicted
    }

    /// Returns the most recent value, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.data.back()
    }

    /// Returns the oldest value, if any.
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        self.data.front()
    }

    /// Returns the current number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an iterator over the values from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.data.iter()
    }

    /// Returns an iterator over the last `n` values (oldest first).
    ///
    /// If `n > len`, yields all elements.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.data.len().saturating_sub(n);
        self.data.iter().skip(skip)
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
