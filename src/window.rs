use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// One recorded observation. Timestamps are epoch seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub value: f32,
    pub timestamp: f64,
}

/// Exactly-window-length value/timestamp arrays ready for filtering.
#[derive(Clone, Debug)]
pub struct WindowFrame {
    pub values: Vec<f32>,
    pub timestamps: Vec<f64>,
}

/// Fixed-capacity rolling buffer; pushing at capacity evicts the oldest entry.
///
/// Callers are expected to feed samples in non-decreasing timestamp order;
/// the buffer never reorders.
pub struct RollingWindow {
    data: VecDeque<Sample>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.data.iter()
    }

    /// Materialize the buffer into exactly `capacity` entries, left-padding
    /// when under-filled. The current wall clock is only consulted when the
    /// buffer is completely empty.
    pub fn materialize(&self, dt: f64) -> WindowFrame {
        self.materialize_at(epoch_now(), dt)
    }

    /// Like [`materialize`](Self::materialize) with an explicit clock value,
    /// so the empty-buffer path stays deterministic under test.
    pub fn materialize_at(&self, now: f64, dt: f64) -> WindowFrame {
        let w = self.capacity;
        let n = self.data.len();
        let mut values = Vec::with_capacity(w);
        let mut timestamps = Vec::with_capacity(w);

        match self.data.front() {
            None => {
                values.resize(w, 0.0);
                for j in 0..w {
                    timestamps.push(now - (w - 1 - j) as f64 * dt);
                }
            }
            Some(first) => {
                // Flat value extrapolation avoids filter transients that
                // zero-padding would introduce.
                let pad = w - n;
                for j in 0..pad {
                    values.push(first.value);
                    timestamps.push(first.timestamp - (pad - j) as f64 * dt);
                }
                for sample in &self.data {
                    values.push(sample.value);
                    timestamps.push(sample.timestamp);
                }
            }
        }

        WindowFrame { values, timestamps }
    }
}

fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
