use ndarray::{Array2, ArrayView2, ArrayView3};
use tracing::{info, warn};

use crate::consts::OUTPUT_MAX;
use crate::error::{PrepError, Result};
use crate::frame::ContrastStack;

/// Turns background-normalized frames into the final 8-bit contrast range.
///
/// Per frame: center on the background (`v - 1`), optionally invert,
/// divide by the frame's own maximum, then map `[0, 1]` onto
/// `[cutoff, 255]` and clamp negatives to 0.
#[derive(Clone, Copy, Debug)]
pub struct ContrastAugmenter {
    invert: bool,
    cutoff: u8,
}

impl ContrastAugmenter {
    pub fn new(invert: bool, cutoff: u8) -> Result<Self> {
        if cutoff == u8::MAX {
            return Err(PrepError::InvalidConfig(
                "cutoff must be below 255".into(),
            ));
        }
        Ok(Self { invert, cutoff })
    }

    pub fn invert(&self) -> bool {
        self.invert
    }

    pub fn cutoff(&self) -> u8 {
        self.cutoff
    }

    /// Augment every frame of a normalized stack.
    pub fn augment(&self, frames: ArrayView3<'_, f32>) -> Result<ContrastStack> {
        if self.invert {
            info!("Inverting frames");
        }
        let mut out = ContrastStack::zeros(frames.dim());
        for (index, (frame, mut slot)) in frames.outer_iter().zip(out.outer_iter_mut()).enumerate()
        {
            slot.assign(&self.augment_frame(index, frame)?);
        }
        Ok(out)
    }

    /// Augment a single normalized frame. `index` is only used for reporting.
    pub fn augment_frame(&self, index: usize, frame: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let sign = if self.invert { -1.0 } else { 1.0 };
        let mut centered = frame.mapv(|v| sign * (v - 1.0));

        let max = centered.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        if !max.is_finite() {
            return Err(PrepError::NormalizationInvariant(format!(
                "frame {index} has no finite maximum"
            )));
        }

        if max == 0.0 {
            // Nothing brighter than the background: leave unscaled.
            warn!(frame = index, "Frame has no foreground, skipping max rescale");
        } else {
            centered.mapv_inplace(|v| v / max);
            let rescaled_max = centered.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            if rescaled_max > 1.0 {
                return Err(PrepError::NormalizationInvariant(format!(
                    "frame {index} reaches {rescaled_max} after max rescale. Did you background divide?"
                )));
            }
        }

        let cutoff = self.cutoff as f32;
        centered.mapv_inplace(|v| remap(v, cutoff));
        Ok(centered)
    }
}

/// Map a centered, max-rescaled value onto `[cutoff, 255]`, clamping
/// anything below zero.
pub fn remap(v: f32, cutoff: f32) -> f32 {
    let out = (OUTPUT_MAX - cutoff) * v + cutoff;
    out.clamp(0.0, OUTPUT_MAX)
}
