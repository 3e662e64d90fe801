use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::error::{PrepError, Result};

/// Raw decoded video frames, shape = (frames, height, width).
pub type FrameStack = Array3<u8>;

/// Frames after background division, shape = (frames, height, width).
/// A pixel equal to the background is 1.0.
pub type NormalizedStack = Array3<f32>;

/// Final contrast-enhanced frames, values in [0.0, 255.0].
pub type ContrastStack = Array3<f32>;

/// Per-pixel background estimate, shape = (height, width).
///
/// Every element is strictly positive. The plate is immutable once built.
#[derive(Clone, Debug)]
pub struct BackgroundPlate {
    data: Array2<f32>,
}

impl BackgroundPlate {
    pub(crate) fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Mean intensity over all pixels.
    pub fn mean(&self) -> f32 {
        let n = self.data.len().max(1) as f64;
        (self.data.iter().map(|&v| v as f64).sum::<f64>() / n) as f32
    }
}

/// A `(start, count)` selection of frames to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: usize,
    pub count: usize,
}

impl FrameRange {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// The range covering every frame of a video.
    pub fn full(total: usize) -> Self {
        Self { start: 0, count: total }
    }

    /// Resolve an optional requested range against the video length.
    ///
    /// A range running past the end is clamped to `(start, total - start)`
    /// with a warning. A start at or past the end cannot be clamped, and a
    /// range selecting no frames is rejected.
    pub fn resolve(requested: Option<FrameRange>, total: usize) -> Result<FrameRange> {
        let Some(range) = requested else {
            return Ok(Self::full(total));
        };
        if range.count == 0 {
            return Err(PrepError::EmptyRange { start: range.start });
        }
        if range.start >= total {
            return Err(PrepError::InvalidRange {
                start: range.start,
                total,
            });
        }
        // `start < total`, so the subtraction cannot underflow.
        if range.count > total - range.start {
            let clamped = Self::new(range.start, total - range.start);
            warn!(
                requested_start = range.start,
                requested_count = range.count,
                clamped_count = clamped.count,
                total,
                "Frame range exceeds video length, clamping"
            );
            return Ok(clamped);
        }
        Ok(range)
    }

    /// One past the last selected frame, saturating at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.count)
    }

    pub fn covers(&self, total: usize) -> bool {
        self.start == 0 && self.count == total
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Color/Bayer mode of the source data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColorMode {
    Mono,
    BayerRGGB,
    BayerGRBG,
    BayerGBRG,
    BayerBGGR,
    RGB,
    BGR,
}

/// Metadata about the source video.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub filename: PathBuf,
    pub total_frames: usize,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_mode: ColorMode,
}

impl SourceInfo {
    /// Size in bytes of every frame decoded to 8-bit intensity.
    pub fn decoded_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.total_frames
    }
}
