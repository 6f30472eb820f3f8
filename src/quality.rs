// SPDX-License-Identifier: GPL-3.0-only

//! Adaptive frame pacing
//!
//! The capture thread records how long each frame took to process. Once
//! enough samples are in the window the mean is compared to a target of
//! 70% of the current interval: sustained slowness lengthens the interval,
//! a large margin shortens it. The interval always stays within
//! [`MIN_INTERVAL_MS`, `MAX_INTERVAL_MS`].

use crate::constants::pacing::{
    GROW_FACTOR, INITIAL_INTERVAL_MS, MAX_INTERVAL_MS, MIN_INTERVAL_MS, MIN_SAMPLES,
    SHRINK_FACTOR, SLOW_STRIKES, TARGET_RATIO, WINDOW_SIZE,
};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Outcome of a window evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacingDecision {
    /// Not enough samples, or adaptation disabled
    Pending,
    /// Interval unchanged
    Hold,
    /// Interval lengthened to the given milliseconds
    SlowedDown(f64),
    /// Interval shortened to the given milliseconds
    SpedUp(f64),
}

#[derive(Debug, Clone)]
pub struct QualityController {
    samples: VecDeque<f64>,
    interval_ms: f64,
    slow_count: u32,
    adaptive: bool,
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(INITIAL_INTERVAL_MS, true)
    }
}

impl QualityController {
    /// Create a controller; the initial interval is clamped into range
    pub fn new(initial_interval_ms: f64, adaptive: bool) -> Self {
        let interval_ms = if initial_interval_ms.is_finite() {
            initial_interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
        } else {
            INITIAL_INTERVAL_MS
        };
        Self {
            samples: VecDeque::with_capacity(WINDOW_SIZE),
            interval_ms,
            slow_count: 0,
            adaptive,
        }
    }

    /// Current pacing interval in milliseconds
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_ms / 1000.0)
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Record a processing duration and evaluate the window if it is full enough
    pub fn record(&mut self, processing: Duration) -> PacingDecision {
        self.record_ms(processing.as_secs_f64() * 1000.0)
    }

    pub fn record_ms(&mut self, processing_ms: f64) -> PacingDecision {
        if !processing_ms.is_finite() || processing_ms < 0.0 {
            return PacingDecision::Pending;
        }

        if self.samples.len() == WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(processing_ms);

        if !self.adaptive || self.samples.len() < MIN_SAMPLES {
            return PacingDecision::Pending;
        }

        let decision = self.evaluate();
        self.samples.clear();
        decision
    }

    fn evaluate(&mut self) -> PacingDecision {
        let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        let target = self.interval_ms * TARGET_RATIO;

        if mean > target {
            self.slow_count += 1;
            if self.slow_count >= SLOW_STRIKES {
                self.slow_count = 0;
                self.interval_ms = (self.interval_ms * GROW_FACTOR).min(MAX_INTERVAL_MS);
                debug!(
                    mean_ms = mean,
                    interval_ms = self.interval_ms,
                    "Processing too slow, lowering frame rate"
                );
                return PacingDecision::SlowedDown(self.interval_ms);
            }
            PacingDecision::Hold
        } else if mean < target * 0.5 {
            self.interval_ms = (self.interval_ms * SHRINK_FACTOR).max(MIN_INTERVAL_MS);
            debug!(
                mean_ms = mean,
                interval_ms = self.interval_ms,
                "Processing headroom available, raising frame rate"
            );
            PacingDecision::SpedUp(self.interval_ms)
        } else {
            self.slow_count = 0;
            PacingDecision::Hold
        }
    }
}
