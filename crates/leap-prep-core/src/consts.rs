/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Added to every background pixel so normalization never divides by zero.
pub const BACKGROUND_EPSILON: f32 = 1e-6;

/// Dataset key the output tensor is stored under.
pub const OUTPUT_DATASET_KEY: &str = "box";

/// Decoded stack size (in bytes) above which `MemoryStrategy::Auto` switches
/// to the two-pass streaming mode. Default: 1 GiB.
pub const LOW_MEMORY_THRESHOLD_BYTES: usize = 1_073_741_824;

/// Number of frames between progress log lines while loading.
pub const LOAD_LOG_INTERVAL: usize = 100;

/// Default stride between frames sampled for the background.
pub const DEFAULT_BKG_SEP: usize = 50;

/// Default output brightness for pixels equal to the background.
pub const DEFAULT_CUTOFF: u8 = 5;

/// Largest value of the output intensity range.
pub const OUTPUT_MAX: f32 = 255.0;
