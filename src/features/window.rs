//! Fixed-capacity trailing window of game observations.

use std::collections::VecDeque;

/// Trailing window over (first-inning runs, YRFI) observations.
///
/// Pushing past capacity evicts the oldest observation.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    buffer: VecDeque<(u32, bool)>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, runs: u32, yrfi: bool) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back((runs, yrfi));
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean first-inning runs; `None` when empty
    pub fn mean_runs(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            return None;
        }
        let sum: u64 = self.buffer.iter().map(|(runs, _)| *runs as u64).sum();
        Some(sum as f64 / self.buffer.len() as f64)
    }

    /// Share of observations with a first-inning run; `None` when empty
    pub fn yrfi_rate(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            return None;
        }
        let hits = self.buffer.iter().filter(|(_, yrfi)| *yrfi).count();
        Some(hits as f64 / self.buffer.len() as f64)
    }

    /// (mean runs, YRFI rate) once at least `min_periods` observations are held
    pub fn stat(&self, min_periods: usize) -> Option<(f64, f64)> {
        if self.buffer.len() < min_periods {
            return None;
        }
        Some((self.mean_runs()?, self.yrfi_rate()?))
    }
}
