// SPDX-License-Identifier: GPL-3.0-only

//! Engine-wide constants

use std::time::Duration;

/// Frame buffering
pub mod buffer {
    /// Number of recent frames kept in the ring buffer
    pub const RING_CAPACITY: usize = 3;

    /// Bytes per pixel of the BGRA frames the engine produces
    pub const BYTES_PER_PIXEL: usize = 4;
}

/// Deadlines used by the capture facade
pub mod capture {
    use super::Duration;

    /// Buffer lock deadline for a normal capture
    pub const LOCK_TIMEOUT: Duration = Duration::from_millis(5);

    /// Buffer lock deadline for a forced capture
    pub const FORCED_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

    /// Newest buffered frame older than this is stale for a forced capture
    pub const STALE_FRAME_AGE: Duration = Duration::from_millis(100);

    /// Wait for a new frame on a normal capture
    pub const FRAME_WAIT: Duration = Duration::from_millis(50);

    /// Wait for a new frame on a forced capture
    pub const FORCED_FRAME_WAIT: Duration = Duration::from_millis(200);

    /// Settle time between stop and restart in the alternative capture path
    pub const RESTART_SETTLE_MS: u64 = 500;

    /// Maximum wait for the first frame after a restart
    pub const RESTART_FRAME_TIMEOUT_MS: u64 = 2000;
}

/// Adaptive pacing
pub mod pacing {
    /// Initial interval between accepted frames (~30 fps)
    pub const INITIAL_INTERVAL_MS: f64 = 33.0;

    /// Fastest allowed pacing (~60 fps)
    pub const MIN_INTERVAL_MS: f64 = 16.0;

    /// Slowest allowed pacing (~15 fps)
    pub const MAX_INTERVAL_MS: f64 = 66.0;

    /// Rolling window of processing samples
    pub const WINDOW_SIZE: usize = 30;

    /// Samples required before the window is evaluated
    pub const MIN_SAMPLES: usize = 5;

    /// Target processing time as a fraction of the interval
    pub const TARGET_RATIO: f64 = 0.7;

    /// Consecutive slow evaluations that trigger a slowdown
    pub const SLOW_STRIKES: u32 = 3;

    pub const GROW_FACTOR: f64 = 1.2;
    pub const SHRINK_FACTOR: f64 = 0.9;
}

/// Digital zoom
pub mod zoom {
    pub const MIN_ZOOM: f32 = 1.0;

    /// Default upper zoom bound
    pub const MAX_ZOOM: f32 = 10.0;

    /// Levels at or below this are treated as no zoom
    pub const IDENTITY_THRESHOLD: f32 = 1.01;
}

/// Common capture resolutions, smallest first
pub mod resolutions {
    use crate::backends::camera::types::Resolution;

    pub const VGA: Resolution = Resolution::new(640, 480);
    pub const HD: Resolution = Resolution::new(1280, 720);
    pub const FULL_HD: Resolution = Resolution::new(1920, 1080);

    pub const COMMON: [Resolution; 3] = [VGA, HD, FULL_HD];

    /// Resolution requested when none is configured
    pub const DEFAULT: Resolution = HD;
}

/// Device backend settings
pub mod device {
    /// Memory-mapped buffers requested from V4L2
    pub const STREAM_BUFFERS: u32 = 4;

    /// Poll timeout of a blocking V4L2 read, bounds how long stop waits
    pub const READ_TIMEOUT_MS: u64 = 250;

    /// Nice value for the capture thread (negative raises priority)
    pub const CAPTURE_THREAD_NICE: i32 = -5;

    /// Name of the capture worker thread
    pub const CAPTURE_THREAD_NAME: &str = "camera-capture";
}
