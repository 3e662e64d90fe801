use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::consts::{BACKGROUND_EPSILON, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{PrepError, Result};
use crate::frame::{BackgroundPlate, FrameRange, FrameStack};
use crate::source::{check_frame_shape, checked_frame_count, decode_at, FrameSource};

/// Builds a [`BackgroundPlate`] from frames sampled at a fixed stride across
/// the whole video.
#[derive(Clone, Copy, Debug)]
pub struct BackgroundEstimator {
    bkg_sep: usize,
}

impl BackgroundEstimator {
    pub fn new(bkg_sep: usize) -> Result<Self> {
        if bkg_sep == 0 {
            return Err(PrepError::InvalidConfig(
                "background sample separation must be at least 1".into(),
            ));
        }
        Ok(Self { bkg_sep })
    }

    pub fn bkg_sep(&self) -> usize {
        self.bkg_sep
    }

    /// Indices of the frames that contribute to the background.
    pub fn sample_indices(&self, total: usize) -> impl Iterator<Item = usize> {
        (0..total).step_by(self.bkg_sep)
    }

    /// Estimate the background for a run whose loaded frames cover `range`.
    ///
    /// When `range` spans the whole video the already loaded `frames` are
    /// sampled; otherwise the source is revisited so the estimate never
    /// depends on the requested crop.
    pub fn estimate(
        &self,
        source: &mut dyn FrameSource,
        frames: &FrameStack,
        range: FrameRange,
        on_sample: impl FnMut(usize),
    ) -> Result<BackgroundPlate> {
        let total = checked_frame_count(source)?;
        if range.covers(total) {
            debug!("All frames resident, sampling background from loaded stack");
            self.from_resident(frames)
        } else {
            self.from_source(source, on_sample)
        }
    }

    /// Sample every `bkg_sep`-th frame of an in-memory stack.
    pub fn from_resident(&self, frames: &FrameStack) -> Result<BackgroundPlate> {
        let samples = frames.slice(s![..;self.bkg_sep as isize, .., ..]);
        let plate = finish_plate(median_plate(samples)?);
        info!(
            samples = samples.len_of(Axis(0)),
            mean = plate.mean(),
            "Background calculated"
        );
        Ok(plate)
    }

    /// Seek and decode every `bkg_sep`-th frame of the whole video.
    ///
    /// `on_sample` is called with the number of samples decoded so far.
    pub fn from_source(
        &self,
        source: &mut dyn FrameSource,
        mut on_sample: impl FnMut(usize),
    ) -> Result<BackgroundPlate> {
        let total = checked_frame_count(source)?;
        let (h, w) = source.dimensions();
        let indices: Vec<usize> = self.sample_indices(total).collect();

        let mut samples = Array3::<u8>::zeros((indices.len(), h, w));
        for (i, (&index, mut slot)) in indices
            .iter()
            .zip(samples.axis_iter_mut(Axis(0)))
            .enumerate()
        {
            let frame = decode_at(source, index)?;
            check_frame_shape(&frame, h, w, index)?;
            slot.assign(&frame);
            on_sample(i + 1);
        }

        let plate = finish_plate(median_plate(samples.view())?);
        info!(
            samples = indices.len(),
            total,
            mean = plate.mean(),
            "Background calculated from full video"
        );
        Ok(plate)
    }
}

fn finish_plate(mut median: Array2<f32>) -> BackgroundPlate {
    median += BACKGROUND_EPSILON;
    BackgroundPlate::new(median)
}

/// Per-pixel median across the first axis of `samples`.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
/// Parallelizes at the row level for images >= 256x256.
pub fn median_plate(samples: ArrayView3<'_, u8>) -> Result<Array2<f32>> {
    let (n, h, w) = samples.dim();
    if n == 0 {
        return Err(PrepError::Decode("no frames sampled for background".into()));
    }

    let median_row = |row: usize| -> Vec<f32> {
        let mut pixel_values = vec![0.0f32; n];
        let mut row_result = vec![0.0f32; w];
        for (col, result) in row_result.iter_mut().enumerate() {
            for (i, value) in pixel_values.iter_mut().enumerate() {
                *value = samples[[i, row, col]] as f32;
            }
            *result = compute_median(&mut pixel_values);
        }
        row_result
    };

    let rows: Vec<Vec<f32>> = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        (0..h).into_par_iter().map(median_row).collect()
    } else {
        (0..h).map(median_row).collect()
    };

    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((h, w), flat)
        .map_err(|e| PrepError::Decode(format!("background shape mismatch: {e}")))
}

/// Median of a non-empty slice; even counts average the two middle values.
fn compute_median(pixel_values: &mut [f32]) -> f32 {
    let n = pixel_values.len();
    if n == 1 {
        pixel_values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *pixel_values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        let mid = n / 2;
        pixel_values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        pixel_values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (pixel_values[mid - 1] + pixel_values[mid]) / 2.0
    }
}
