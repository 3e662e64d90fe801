use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use leap_prep_core::source::open_source;

#[derive(Args)]
pub struct InfoArgs {
    /// Input video (.ser, a video container with the `video` feature, or a directory of images)
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let source = open_source(&args.file)?;
    let info = source.source_info();

    println!("File:        {}", info.filename.display());
    println!("Frames:      {}", info.total_frames);
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Bit depth:   {}", info.bit_depth);
    println!("Color mode:  {:?}", info.color_mode);

    let total_mb = info.decoded_bytes() as f64 / (1024.0 * 1024.0);
    println!("Decoded:     {:.1} MB (8-bit)", total_mb);

    Ok(())
}
