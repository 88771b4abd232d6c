use crate::sample::TelemetrySample;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Number of samples kept when no capacity is configured.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Fixed-capacity FIFO of the most recent telemetry samples.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    samples: VecDeque<TelemetrySample>,
    capacity: usize,
}

impl SlidingWindow {
    /// A capacity of zero is raised to one so the latest sample is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `sample`, returning the evicted oldest sample when full.
    pub fn push(&mut self, sample: TelemetrySample) -> Option<TelemetrySample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<TelemetrySample> {
        self.samples.back().copied()
    }

    pub fn to_snapshot(&self) -> WindowSnapshot {
        let mut snapshot = WindowSnapshot::with_capacity(self.samples.len());
        for sample in &self.samples {
            snapshot.timestamps.push(sample.timestamp_s());
            snapshot.rpm.push(sample.rpm());
            snapshot.setpoint.push(sample.setpoint());
        }
        snapshot
    }
}

/// Column-oriented copy of the window, ready for plotting.
///
/// The three series always have the same length and share indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot {
    pub timestamps: Vec<f64>,
    pub rpm: Vec<f64>,
    pub setpoint: Vec<f64>,
}

impl WindowSnapshot {
    fn with_capacity(len: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(len),
            rpm: Vec::with_capacity(len),
            setpoint: Vec::with_capacity(len),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn sample(&self, index: usize) -> Option<TelemetrySample> {
        Some(TelemetrySample::new(
            *self.timestamps.get(index)?,
            *self.rpm.get(index)?,
            *self.setpoint.get(index)?,
        ))
    }

    pub fn latest(&self) -> Option<TelemetrySample> {
        self.len().checked_sub(1).and_then(|idx| self.sample(idx))
    }
}

/// Sliding window shared between the ingestion thread (writer) and the
/// display path (reader).
///
/// A single mutex guards both operations; it is held only for the push or
/// the copy, never across I/O or rendering.
pub struct WindowStore {
    window: Mutex<SlidingWindow>,
}

impl WindowStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: Mutex::new(SlidingWindow::new(capacity)),
        }
    }

    /// Called by the ingestion loop for every decoded frame.
    pub fn append(&self, sample: TelemetrySample) -> Option<TelemetrySample> {
        let evicted = self.lock().push(sample);
        if let Some(old) = evicted {
            log::trace!("evicted sample at t={}", old.timestamp_s());
        }
        evicted
    }

    /// Read-consistent copy of the whole window.
    pub fn snapshot(&self) -> WindowSnapshot {
        self.lock().to_snapshot()
    }

    pub fn latest(&self) -> Option<TelemetrySample> {
        self.lock().latest()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned guard is still safe to use.
    fn lock(&self) -> MutexGuard<'_, SlidingWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WindowStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
