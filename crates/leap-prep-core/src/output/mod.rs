//! Persisting the contrast stack as a `(frames, height, width, 1)` u8
//! tensor under the `"box"` key.

#[cfg(feature = "hdf5")]
pub mod h5;
pub mod npz;

use std::path::{Path, PathBuf};

use ndarray::{Array2, Array4, ArrayView2, ArrayView3, Axis};
use tracing::info;

use crate::error::{PrepError, Result};
use crate::frame::ContrastStack;

pub use npz::NpzWriter;

/// Logical shape of the persisted tensor; the channel axis is always 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputShape {
    pub frames: usize,
    pub height: usize,
    pub width: usize,
}

impl OutputShape {
    pub fn new(frames: usize, height: usize, width: usize) -> Self {
        Self {
            frames,
            height,
            width,
        }
    }

    pub fn of(stack: &ContrastStack) -> Self {
        let (frames, height, width) = stack.dim();
        Self::new(frames, height, width)
    }

    /// On-disk axis order: frame, height, width, channel.
    pub fn dims(&self) -> [usize; 4] {
        [self.frames, self.height, self.width, 1]
    }

    pub fn frame_len(&self) -> usize {
        self.height * self.width
    }
}

/// Sink for output frames, written in order.
///
/// The destination is only valid once `finish` returns; a writer dropped
/// earlier leaves no output behind.
pub trait StackWriter {
    fn write_frame(&mut self, frame: ArrayView2<'_, u8>) -> Result<()>;

    fn finish(self: Box<Self>) -> Result<()>;
}

/// Container format chosen from the output path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Npz,
    Hdf5,
}

impl OutputFormat {
    /// `.npz` selects the NumPy archive; every other path is written as HDF5.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("npz") => Self::Npz,
            _ => Self::Hdf5,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Npz => write!(f, "NumPy archive (.npz)"),
            Self::Hdf5 => write!(f, "HDF5"),
        }
    }
}

/// Open a writer for `path`, overwriting any existing file.
pub fn create_writer(path: &Path, shape: OutputShape) -> Result<Box<dyn StackWriter>> {
    match OutputFormat::from_path(path) {
        OutputFormat::Npz => Ok(Box::new(NpzWriter::create(path, shape)?)),
        #[cfg(feature = "hdf5")]
        OutputFormat::Hdf5 => Ok(Box::new(h5::Hdf5Writer::create(path, shape))),
        #[cfg(not(feature = "hdf5"))]
        OutputFormat::Hdf5 => Err(PrepError::Output(format!(
            "{}: built without HDF5 support, rebuild with the `hdf5` feature or save as .npz",
            path.display()
        ))),
    }
}

/// Convert contrast values to u8, truncating toward zero.
pub fn to_output_frame(frame: ArrayView2<'_, f32>) -> Array2<u8> {
    frame.mapv(|v| v.clamp(0.0, 255.0) as u8)
}

/// The full output tensor in on-disk axis order.
pub fn to_output_tensor(stack: ArrayView3<'_, f32>) -> Array4<u8> {
    stack
        .mapv(|v| v.clamp(0.0, 255.0) as u8)
        .insert_axis(Axis(3))
}

/// Write a finished contrast stack to `path`.
pub fn write_stack(path: &Path, stack: &ContrastStack) -> Result<()> {
    let shape = OutputShape::of(stack);
    let mut writer = create_writer(path, shape)?;
    for frame in stack.outer_iter() {
        writer.write_frame(to_output_frame(frame).view())?;
    }
    writer.finish()?;
    info!(path = %path.display(), frames = shape.frames, "Saved output");
    Ok(())
}

/// Sibling path written to until the output is complete.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

pub(crate) fn check_frame(shape: &OutputShape, frame: &ArrayView2<'_, u8>, written: usize) -> Result<()> {
    if written >= shape.frames {
        return Err(PrepError::Output(format!(
            "more than the declared {} frames written",
            shape.frames
        )));
    }
    if frame.dim() != (shape.height, shape.width) {
        return Err(PrepError::Output(format!(
            "frame is {}x{}, output expects {}x{}",
            frame.ncols(),
            frame.nrows(),
            shape.width,
            shape.height
        )));
    }
    Ok(())
}
