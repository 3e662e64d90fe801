use tracing::info;

use crate::background::BackgroundEstimator;
use crate::contrast::ContrastAugmenter;
use crate::error::Result;
use crate::frame::FrameRange;
use crate::normalize::Normalizer;
use crate::output::{create_writer, to_output_frame, OutputShape};
use crate::source::{check_frame_shape, checked_frame_count, FrameSource};

use super::config::PrepConfig;
use super::types::{PipelineStage, PrepOutput, ProgressReporter};

/// Two passes over the source: sample the background across the whole
/// video, then decode, normalize, augment and write one frame at a time.
pub(super) fn run_streaming(
    config: &PrepConfig,
    source: &mut dyn FrameSource,
    range: FrameRange,
    reporter: &dyn ProgressReporter,
) -> Result<PrepOutput> {
    let augmenter = ContrastAugmenter::new(config.invert, config.cutoff)?;
    let total = checked_frame_count(source)?;
    let (h, w) = source.dimensions();

    let (divisor, background_mean) = if config.remove_bkg {
        let estimator = BackgroundEstimator::new(config.bkg_sep)?;
        let normalizer = Normalizer::new(config.bkg_method, config.legacy_scale)?;
        let samples = estimator.sample_indices(total).count();
        reporter.begin_stage(PipelineStage::Background, Some(samples));
        let plate = estimator.from_source(source, |done| reporter.advance(done))?;
        reporter.finish_stage();
        (Some(normalizer.divisor(&plate)), Some(plate.mean()))
    } else {
        (None, None)
    };

    let mut writer = create_writer(&config.output, OutputShape::new(range.count, h, w))?;

    reporter.begin_stage(PipelineStage::Streaming, Some(range.count));
    source.seek(range.start)?;
    for (done, index) in range.indices().enumerate() {
        let frame = source.decode_next()?;
        check_frame_shape(&frame, h, w, index)?;
        let normalized = match divisor {
            Some(ref divisor) => divisor.apply(frame.view())?,
            None => frame.mapv(|v| v as f32),
        };
        let contrast = augmenter.augment_frame(done, normalized.view())?;
        writer.write_frame(to_output_frame(contrast.view()).view())?;
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Writing, None);
    writer.finish()?;
    reporter.finish_stage();
    info!(path = %config.output.display(), frames = range.count, "Saved output");

    Ok(PrepOutput {
        output: config.output.clone(),
        total_frames: total,
        range,
        background_mean,
        streamed: true,
        dimensions: (h, w),
    })
}
