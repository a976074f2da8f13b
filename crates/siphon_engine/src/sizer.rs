//! Feedback-controlled chunk sizing.

use std::time::Duration;

/// Tuning parameters for the chunk-size controller.
#[derive(Debug, Clone)]
pub struct SizerConfig {
    /// Lower edge of the target latency band.
    pub target_low: Duration,
    /// Upper edge of the target latency band.
    pub target_high: Duration,
    /// Maximum growth factor applied in a single step.
    pub max_growth: f64,
}

impl SizerConfig {
    /// Sets the target band.
    pub fn with_band(mut self, low: Duration, high: Duration) -> Self {
        self.target_low = low;
        self.target_high = high;
        self
    }

    /// Sets the per-step growth cap.
    pub fn with_max_growth(mut self, factor: f64) -> Self {
        self.max_growth = factor.max(1.0);
        self
    }
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            target_low: Duration::from_millis(800),
            target_high: Duration::from_secs(3),
            max_growth: 2.0,
        }
    }
}

/// Proposes the next chunk size from the previous size and the measured
/// cost of the last chunk.
///
/// The controller drives per-chunk elapsed time toward the configured
/// band: a chunk cheaper than the band scales the size up proportionally
/// (capped at `max_growth` per step), a chunk more expensive than the band
/// scales it down proportionally, and a chunk inside the band leaves it
/// unchanged. The proposed size is never below 1 and has no upper bound;
/// transport payload limits are enforced elsewhere.
///
/// The controller is stateless beyond its configuration, so a transfer
/// resumed from a persisted chunk size continues tuning from where it left
/// off rather than re-probing from scratch.
#[derive(Debug, Clone, Default)]
pub struct ChunkSizer {
    config: SizerConfig,
}

impl ChunkSizer {
    /// Creates a sizer with the given tuning parameters.
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    /// Returns the size to use for the next chunk.
    ///
    /// `elapsed` must cover exactly the production (or retrieval) of the
    /// previous chunk, not retry bookkeeping.
    pub fn next_size(&self, previous: u64, elapsed: Duration) -> u64 {
        let previous = previous.max(1);
        let low = self.config.target_low.as_secs_f64();
        let high = self.config.target_high.as_secs_f64();
        let secs = elapsed.as_secs_f64();

        if secs < low {
            let scale = if secs > 0.0 {
                (low / secs).min(self.config.max_growth)
            } else {
                self.config.max_growth
            };
            let grown = (previous as f64 * scale).ceil();
            if grown >= u64::MAX as f64 {
                u64::MAX
            } else {
                (grown as u64).max(previous)
            }
        } else if secs > high {
            (((previous as f64) * (high / secs)).floor() as u64).clamp(1, previous)
        } else {
            previous
        }
    }
}
