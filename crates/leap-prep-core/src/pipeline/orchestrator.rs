use tracing::info;

use crate::consts::LOW_MEMORY_THRESHOLD_BYTES;
use crate::error::Result;
use crate::frame::FrameRange;
use crate::source::{checked_frame_count, open_source, FrameSource};

use super::config::{MemoryStrategy, PrepConfig};
use super::types::{NoOpReporter, PrepOutput, ProgressReporter};

/// Run the full preparation with a progress reporter.
///
/// The configuration is validated before the input is opened.
pub fn run_prep_reported(config: &PrepConfig, reporter: &dyn ProgressReporter) -> Result<PrepOutput> {
    config.validate()?;
    let mut source = open_source(&config.input)?;
    info!(input = %config.input.display(), "Analyzing video");
    run_prep_with_source(config, source.as_mut(), reporter)
}

/// Run the full preparation: background, normalization, contrast, output.
pub fn run_prep(config: &PrepConfig) -> Result<PrepOutput> {
    run_prep_reported(config, &NoOpReporter)
}

/// Run the preparation against an already opened source.
pub fn run_prep_with_source(
    config: &PrepConfig,
    source: &mut dyn FrameSource,
    reporter: &dyn ProgressReporter,
) -> Result<PrepOutput> {
    config.validate()?;
    let total = checked_frame_count(source)?;
    let range = FrameRange::resolve(config.frame_range, total)?;
    let (h, w) = source.dimensions();
    info!(
        total_frames = total,
        start = range.start,
        count = range.count,
        width = w,
        height = h,
        "Video opened"
    );

    if should_use_streaming(config, range, (h, w)) {
        info!("Using low-memory streaming mode");
        super::streaming::run_streaming(config, source, range, reporter)
    } else {
        super::eager::run_eager(config, source, range, reporter)
    }
}

/// Decide whether to use the streaming (low-memory) path.
pub(super) fn should_use_streaming(
    config: &PrepConfig,
    range: FrameRange,
    (height, width): (usize, usize),
) -> bool {
    match config.memory {
        MemoryStrategy::Eager => false,
        MemoryStrategy::Streaming => true,
        MemoryStrategy::Auto => {
            let decoded = range.count * height * width * std::mem::size_of::<f32>();
            decoded > LOW_MEMORY_THRESHOLD_BYTES
        }
    }
}
