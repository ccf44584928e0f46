//! Progress reporting for embedding store builds.

use std::time::Instant;

/// Progress snapshot reported after each durable chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildProgress {
    /// Chunks written and synced so far
    pub chunks_completed: usize,
    /// Rows written so far (the writer's offset)
    pub rows_written: usize,
    /// Records skipped so far (malformed or zero-norm)
    pub records_skipped: usize,
    /// Pre-allocated row capacity of the store
    pub capacity: usize,
    /// Time elapsed since the build started (milliseconds)
    pub elapsed_ms: u64,
}

impl BuildProgress {
    /// Returns the fill percentage of the pre-allocated store (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            (self.rows_written as f64 / self.capacity as f64 * 100.0).min(100.0)
        }
    }

    /// Returns throughput in rows per second.
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed_ms == 0 {
            0.0
        } else {
            self.rows_written as f64 / (self.elapsed_ms as f64 / 1000.0)
        }
    }

    /// Returns estimated time until the store is full, if computable.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        if self.rows_written == 0 || self.rows_written >= self.capacity {
            return None;
        }
        let remaining = (self.capacity - self.rows_written) as f64;
        let ms_per_row = self.elapsed_ms as f64 / self.rows_written as f64;
        Some((remaining * ms_per_row) as u64)
    }
}

/// Helper for tracking elapsed time during a build.
pub struct ProgressTimer {
    start: Instant,
}

impl ProgressTimer {
    /// Creates a new timer starting now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for ProgressTimer {
    fn default() -> Self {
        Self::new()
    }
}
