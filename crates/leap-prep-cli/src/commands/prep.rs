use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, ValueEnum};
use leap_prep_core::frame::FrameRange;
use leap_prep_core::pipeline::config::{BackgroundMethod, MemoryStrategy, PrepConfig};
use leap_prep_core::pipeline::{run_prep_reported, NoOpReporter};

use crate::progress::BarReporter;
use crate::summary::{print_prep_summary, print_result};

#[derive(Clone, ValueEnum)]
pub enum MemoryArg {
    Auto,
    Eager,
    Streaming,
}

#[derive(Args)]
pub struct PrepArgs {
    /// Input video (.ser, a video container with the `video` feature, or a directory of images)
    #[arg(required = true)]
    pub input: Option<PathBuf>,

    /// Output file: HDF5 (e.g. .h5), or a NumPy archive when it ends in .npz
    #[arg(required = true)]
    pub output: Option<PathBuf>,

    /// Config file (TOML); replaces the options below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print progress while processing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub verbose: bool,

    /// Estimate and divide out the background. If false, the input must
    /// already have 1 where a pixel equals the background
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub remove_bkg: bool,

    /// Subject darker than background (true) or lighter (false)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub invert: bool,

    /// Output brightness where the video equals the background (0-254)
    #[arg(long, default_value_t = 5)]
    pub cutoff: u8,

    /// First frame and number of frames to keep
    #[arg(long, num_args = 2, value_names = ["START", "COUNT"])]
    pub frame_range: Option<Vec<usize>>,

    /// Background removal method; only `div` is supported
    #[arg(long, default_value = "div")]
    pub bkg_method: String,

    /// Separation between frames sampled for the background
    #[arg(long, default_value_t = 50)]
    pub bkg_sep: usize,

    /// Take the direct frame/background ratio instead of the mean-scaled one
    #[arg(long)]
    pub no_legacy_scale: bool,

    /// Hold all frames in memory, stream them, or decide by size
    #[arg(long, value_enum, default_value = "auto")]
    pub memory: MemoryArg,
}

/// Build the run configuration from a TOML file or the command line.
pub fn resolve_config(args: &PrepArgs) -> Result<PrepConfig> {
    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        bail!("an input video and an output path are required");
    };

    if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        let mut config: PrepConfig = toml::from_str(&contents).context("Invalid prep config")?;
        config.input = input.clone();
        config.output = output.clone();
        return Ok(config);
    }

    let frame_range = match args.frame_range.as_deref() {
        Some([start, count]) => Some(FrameRange::new(*start, *count)),
        Some(other) => bail!("--frame-range takes START COUNT, got {} values", other.len()),
        None => None,
    };

    let bkg_method: BackgroundMethod = args.bkg_method.parse()?;

    Ok(PrepConfig {
        input: input.clone(),
        output: output.clone(),
        verbose: args.verbose,
        remove_bkg: args.remove_bkg,
        invert: args.invert,
        cutoff: args.cutoff,
        frame_range,
        bkg_method,
        bkg_sep: args.bkg_sep,
        legacy_scale: !args.no_legacy_scale,
        memory: match args.memory {
            MemoryArg::Auto => MemoryStrategy::Auto,
            MemoryArg::Eager => MemoryStrategy::Eager,
            MemoryArg::Streaming => MemoryStrategy::Streaming,
        },
    })
}

pub fn run(config: &PrepConfig) -> Result<()> {
    config.validate()?;

    if !config.verbose {
        run_prep_reported(config, &NoOpReporter)?;
        return Ok(());
    }

    print_prep_summary(config);
    let reporter = BarReporter::new()?;
    let output = run_prep_reported(config, &reporter)?;
    reporter.finish();
    print_result(&output);
    Ok(())
}
