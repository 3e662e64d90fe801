use std::path::PathBuf;

use crate::frame::FrameRange;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Reading,
    Background,
    Normalizing,
    Contrast,
    Streaming,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reading => write!(f, "Reading frames"),
            Self::Background => write!(f, "Estimating background"),
            Self::Normalizing => write!(f, "Removing background"),
            Self::Contrast => write!(f, "Augmenting contrast"),
            Self::Streaming => write!(f, "Processing frames"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// What a finished run did.
#[derive(Clone, Debug)]
pub struct PrepOutput {
    pub output: PathBuf,
    pub total_frames: usize,
    /// The range actually emitted, after clamping.
    pub range: FrameRange,
    /// Mean intensity of the background plate, when one was estimated.
    pub background_mean: Option<f32>,
    pub streamed: bool,
    pub dimensions: (usize, usize),
}

/// Progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` work items within the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_prep` delegates.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
