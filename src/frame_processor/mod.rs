// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame image pipeline
//!
//! Every captured frame passes through [`FrameProcessor::process`], which
//! picks an [`ExecutionPath`] once for the frame:
//!
//! - **Software**: digital zoom, then tone (exposure, gain, white balance,
//!   saturation, brightness, contrast), then the named filter.
//! - **Hardware**: the frame is uploaded to the GPU, copied on the device and
//!   read back. No transform runs on the GPU, so this path is a pass-through.
//!
//! A GPU failure while processing falls back to software for that frame.

pub mod adjustments;
pub mod filters;
pub mod tone;
pub mod white_balance;
pub mod zoom;

pub use adjustments::{FilterType, ImageAdjustments};
pub use white_balance::{ChannelGains, WhiteBalance};

use crate::backends::camera::types::Frame;
use crate::gpu::{self, GpuContext};
use std::sync::Arc;
use tracing::warn;
use tone::ToneParams;

/// How a frame is processed, chosen once per frame
#[derive(Debug, Clone)]
pub enum ExecutionPath {
    Software,
    Hardware(Arc<GpuContext>),
}

impl ExecutionPath {
    pub fn is_hardware(&self) -> bool {
        matches!(self, ExecutionPath::Hardware(_))
    }
}

/// Result of processing one raw frame
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Frame handed to consumers
    pub output: Frame,
    /// Frame before tone and filter, used to re-apply other adjustments
    pub source: Frame,
}

/// Applies zoom, tone and filters to captured frames
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    gpu_enabled: bool,
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProcessor {
    /// Processor that uses the GPU when adjustments request it
    pub fn new() -> Self {
        Self { gpu_enabled: true }
    }

    /// Processor that never touches the GPU
    pub fn software_only() -> Self {
        Self { gpu_enabled: false }
    }

    /// Pick the execution path for a frame with these adjustments
    pub fn select_path(&self, adjustments: &ImageAdjustments) -> ExecutionPath {
        if !adjustments.use_hardware() || !self.gpu_enabled {
            return ExecutionPath::Software;
        }
        match gpu::shared_context() {
            Some(context) => ExecutionPath::Hardware(context),
            None => ExecutionPath::Software,
        }
    }

    /// Run the full pipeline on a raw frame
    pub fn process(
        &self,
        raw: Frame,
        zoom_level: f32,
        adjustments: &ImageAdjustments,
        white_balance: ChannelGains,
    ) -> ProcessedFrame {
        if let ExecutionPath::Hardware(context) = self.select_path(adjustments) {
            match context.round_trip(&raw) {
                Ok(output) => return ProcessedFrame { output, source: raw },
                Err(e) => {
                    warn!(error = %e, "Hardware processing failed, using software path");
                }
            }
        }

        let source = zoom::apply_zoom(&raw, zoom_level);
        let output = Self::adjust_software(&source, adjustments, white_balance);
        ProcessedFrame { output, source }
    }

    /// Apply tone and filter stages to an already zoomed frame
    ///
    /// Used to render a buffered frame with adjustments other than the
    /// session's own.
    pub fn adjust(
        &self,
        source: &Frame,
        adjustments: &ImageAdjustments,
        white_balance: ChannelGains,
    ) -> Frame {
        if let ExecutionPath::Hardware(context) = self.select_path(adjustments) {
            match context.round_trip(source) {
                Ok(output) => return output,
                Err(e) => {
                    warn!(error = %e, "Hardware processing failed, using software path");
                }
            }
        }
        Self::adjust_software(source, adjustments, white_balance)
    }

    fn adjust_software(
        source: &Frame,
        adjustments: &ImageAdjustments,
        white_balance: ChannelGains,
    ) -> Frame {
        let mut output = source.clone();
        let params = ToneParams::new(adjustments, white_balance);
        tone::apply_tone(&mut output.data, &params);
        filters::apply_filter(&mut output.data, adjustments.filter());
        output
    }
}
