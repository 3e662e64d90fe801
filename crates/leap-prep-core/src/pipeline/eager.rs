use tracing::info;

use crate::background::BackgroundEstimator;
use crate::contrast::ContrastAugmenter;
use crate::error::Result;
use crate::frame::{ContrastStack, FrameRange};
use crate::normalize::{passthrough, Normalizer};
use crate::output::write_stack;
use crate::source::{checked_frame_count, load_range, FrameSource};

use super::config::PrepConfig;
use super::types::{PipelineStage, PrepOutput, ProgressReporter};

/// Load the selected frames, then normalize, augment and write them.
pub(super) fn run_eager(
    config: &PrepConfig,
    source: &mut dyn FrameSource,
    range: FrameRange,
    reporter: &dyn ProgressReporter,
) -> Result<PrepOutput> {
    let total = checked_frame_count(source)?;
    let dimensions = source.dimensions();
    let (contrast, background_mean) = prepare_range(config, source, range, reporter)?;

    reporter.begin_stage(PipelineStage::Writing, Some(range.count));
    write_stack(&config.output, &contrast)?;
    reporter.finish_stage();

    Ok(PrepOutput {
        output: config.output.clone(),
        total_frames: total,
        range,
        background_mean,
        streamed: false,
        dimensions,
    })
}

/// Produce the contrast stack for the configured range without writing it.
pub fn prepare_stack(
    config: &PrepConfig,
    source: &mut dyn FrameSource,
    reporter: &dyn ProgressReporter,
) -> Result<ContrastStack> {
    config.validate()?;
    let total = checked_frame_count(source)?;
    let range = FrameRange::resolve(config.frame_range, total)?;
    Ok(prepare_range(config, source, range, reporter)?.0)
}

fn prepare_range(
    config: &PrepConfig,
    source: &mut dyn FrameSource,
    range: FrameRange,
    reporter: &dyn ProgressReporter,
) -> Result<(ContrastStack, Option<f32>)> {
    // Build every stage first so bad settings fail before decoding.
    let augmenter = ContrastAugmenter::new(config.invert, config.cutoff)?;
    let stages = if config.remove_bkg {
        Some((
            BackgroundEstimator::new(config.bkg_sep)?,
            Normalizer::new(config.bkg_method, config.legacy_scale)?,
        ))
    } else {
        None
    };

    reporter.begin_stage(PipelineStage::Reading, Some(range.count));
    let frames = load_range(source, range, |done| reporter.advance(done))?;
    reporter.finish_stage();

    let (normalized, background_mean) = match stages {
        Some((estimator, normalizer)) => {
            let total = checked_frame_count(source)?;
            let samples = estimator.sample_indices(total).count();
            reporter.begin_stage(PipelineStage::Background, Some(samples));
            let plate = estimator.estimate(source, &frames, range, |done| reporter.advance(done))?;
            reporter.finish_stage();

            reporter.begin_stage(PipelineStage::Normalizing, None);
            let normalized = normalizer.normalize(frames.view(), &plate)?;
            reporter.finish_stage();
            (normalized, Some(plate.mean()))
        }
        None => (passthrough(frames.view()), None),
    };
    drop(frames);

    reporter.begin_stage(PipelineStage::Contrast, Some(range.count));
    let contrast = augmenter.augment(normalized.view())?;
    reporter.finish_stage();
    info!(frames = range.count, cutoff = config.cutoff, "Contrast augmented");

    Ok((contrast, background_mean))
}
