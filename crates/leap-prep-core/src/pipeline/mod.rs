pub mod config;
mod eager;
mod orchestrator;
mod streaming;
mod types;

pub use eager::prepare_stack;
pub use orchestrator::{run_prep, run_prep_reported, run_prep_with_source};
pub use types::{NoOpReporter, PipelineStage, PrepOutput, ProgressReporter};
