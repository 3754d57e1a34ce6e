//! Bounded window buffer for the sensor stream.
//!
//! Holds the most recent W readings in a FIFO ring. One producer (the
//! ingestion tick) pushes; any number of readers take snapshots. The
//! snapshot is the concurrency-safety boundary: readers get an immutable
//! ordered copy and never observe a partially-applied push.

use std::collections::VecDeque;
use std::sync::RwLock;

use crate::types::SensorReading;

/// Bounded FIFO of the most recent sensor readings.
///
/// `push` is O(1) (amortized) with eviction of the oldest entry once
/// capacity is exceeded. `snapshot` is copy-on-read under a read lock, so
/// concurrent evaluations never block ingestion for longer than one copy
/// of at most `capacity` readings.
pub struct WindowBuffer {
    inner: RwLock<VecDeque<SensorReading>>,
    capacity: usize,
}

impl WindowBuffer {
    /// Create a buffer holding at most `capacity` readings.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a reading, evicting the oldest once capacity is exceeded.
    pub fn push(&self, reading: SensorReading) {
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            // A poisoned lock means a panic mid-push; the deque itself is
            // still structurally valid, so keep ingesting.
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(reading);
    }

    /// Immutable ordered copy of the current contents (oldest first).
    pub fn snapshot(&self) -> Vec<SensorReading> {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.iter().cloned().collect()
    }

    /// Number of readings currently buffered.
    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True when no readings are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
