use ndarray::{Array2, ArrayView2, ArrayView3, Axis, Zip};
use tracing::info;

use crate::error::{PrepError, Result};
use crate::frame::{BackgroundPlate, NormalizedStack};
use crate::pipeline::config::BackgroundMethod;

/// Divides frames by a [`BackgroundPlate`] so that a pixel equal to the
/// background becomes 1.0.
#[derive(Clone, Copy, Debug)]
pub struct Normalizer {
    legacy_scale: bool,
}

impl Normalizer {
    /// Only division is supported; subtraction is rejected up front.
    pub fn new(method: BackgroundMethod, legacy_scale: bool) -> Result<Self> {
        match method {
            BackgroundMethod::Div => Ok(Self { legacy_scale }),
            BackgroundMethod::Sub => Err(PrepError::UnsupportedMethod(
                "background subtraction is not supported, only division".into(),
            )),
        }
    }

    /// Precompute the per-pixel divisor for `plate`.
    ///
    /// With `legacy_scale` both numerator and denominator are first divided
    /// by the plate's mean intensity. The constant cancels, so the result
    /// only differs from the direct ratio by rounding.
    pub fn divisor(&self, plate: &BackgroundPlate) -> Divisor {
        if self.legacy_scale {
            let scale = plate.mean();
            Divisor {
                scale: Some(scale),
                plate: plate.data().mapv(|v| v / scale),
            }
        } else {
            Divisor {
                scale: None,
                plate: plate.data().clone(),
            }
        }
    }

    /// Normalize a whole stack against `plate`.
    pub fn normalize(
        &self,
        frames: ArrayView3<'_, u8>,
        plate: &BackgroundPlate,
    ) -> Result<NormalizedStack> {
        let divisor = self.divisor(plate);
        let (n, h, w) = frames.dim();
        let mut out = NormalizedStack::zeros((n, h, w));
        for (frame, mut slot) in frames.outer_iter().zip(out.outer_iter_mut()) {
            slot.assign(&divisor.apply(frame)?);
        }
        info!(frames = n, "Background removed");
        Ok(out)
    }
}

/// Background divisor bound to one plate.
#[derive(Clone, Debug)]
pub struct Divisor {
    scale: Option<f32>,
    plate: Array2<f32>,
}

impl Divisor {
    pub fn apply(&self, frame: ArrayView2<'_, u8>) -> Result<Array2<f32>> {
        if frame.dim() != self.plate.dim() {
            return Err(PrepError::Decode(format!(
                "frame is {}x{} but background is {}x{}",
                frame.ncols(),
                frame.nrows(),
                self.plate.ncols(),
                self.plate.nrows()
            )));
        }
        let mut out = Array2::<f32>::zeros(frame.dim());
        match self.scale {
            Some(scale) => Zip::from(&mut out)
                .and(&frame)
                .and(&self.plate)
                .for_each(|o, &p, &b| *o = (p as f32 / scale) / b),
            None => Zip::from(&mut out)
                .and(&frame)
                .and(&self.plate)
                .for_each(|o, &p, &b| *o = p as f32 / b),
        }
        Ok(out)
    }
}

/// Cast raw frames to float unchanged, for input that is already
/// background-normalized (1 means "equal to background").
pub fn passthrough(frames: ArrayView3<'_, u8>) -> NormalizedStack {
    info!(frames = frames.len_of(Axis(0)), "Skipping background removal");
    frames.mapv(|v| v as f32)
}
