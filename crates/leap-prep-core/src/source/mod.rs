//! Random-access frame decoding.
//!
//! Everything downstream of decoding only needs four capabilities from a
//! video: its length, its frame size, seeking, and decoding the frame at the
//! cursor. [`FrameSource`] captures exactly that so the background sampler
//! can revisit the whole video regardless of the output range.

pub mod image_dir;
pub mod memory;
pub mod ser;
#[cfg(feature = "video")]
pub mod video;

use std::path::Path;

use ndarray::{Array2, Array3, Axis};
use tracing::{debug, info};

use crate::consts::LOAD_LOG_INTERVAL;
use crate::error::{PrepError, Result};
use crate::frame::{FrameRange, FrameStack, SourceInfo};

pub use image_dir::ImageDirSource;
pub use memory::MemorySource;
pub use ser::{SerReader, SerSource};
#[cfg(feature = "video")]
pub use video::VideoCaptureSource;

/// Container extensions decoded through OpenCV.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "m4v", "wmv", "webm", "mpg", "mpeg",
];

/// A seekable video decoder producing 8-bit single-channel frames.
pub trait FrameSource {
    /// Total number of frames the container reports.
    fn frame_count(&self) -> usize;

    /// Frame size as `(height, width)`.
    fn dimensions(&self) -> (usize, usize);

    /// Move the cursor so the next `decode_next` returns frame `index`.
    fn seek(&mut self, index: usize) -> Result<()>;

    /// Decode the frame under the cursor and advance by one.
    fn decode_next(&mut self) -> Result<Array2<u8>>;

    /// Descriptive metadata for summaries.
    fn source_info(&self) -> SourceInfo;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn frame_count(&self) -> usize {
        (**self).frame_count()
    }

    fn dimensions(&self) -> (usize, usize) {
        (**self).dimensions()
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        (**self).seek(index)
    }

    fn decode_next(&mut self) -> Result<Array2<u8>> {
        (**self).decode_next()
    }

    fn source_info(&self) -> SourceInfo {
        (**self).source_info()
    }
}

/// Open a video by path: `.ser` files, common video containers, or a
/// directory of still images.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        return Ok(Box::new(ImageDirSource::open(path)?));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("ser") => Ok(Box::new(SerSource::open(path)?)),
        Some(e) if VIDEO_EXTENSIONS.contains(&e) => open_video(path),
        _ => Err(PrepError::Decode(format!(
            "unsupported input format: {}",
            path.display()
        ))),
    }
}

#[cfg(feature = "video")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(VideoCaptureSource::open(path)?))
}

#[cfg(not(feature = "video"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Err(PrepError::Decode(format!(
        "{}: built without video container support, rebuild with the `video` feature",
        path.display()
    )))
}

/// Total frame count, failing when the container cannot report one.
pub fn checked_frame_count(source: &dyn FrameSource) -> Result<usize> {
    let total = source.frame_count();
    if total == 0 {
        return Err(PrepError::Decode("cannot read number of frames".into()));
    }
    Ok(total)
}

/// Seek to `index` and decode that single frame.
pub fn decode_at(source: &mut dyn FrameSource, index: usize) -> Result<Array2<u8>> {
    source.seek(index)?;
    source.decode_next()
}

/// Decode a contiguous range of frames into one stack.
///
/// `on_frame` is called with the number of frames decoded so far.
pub fn load_range<F>(
    source: &mut dyn FrameSource,
    range: FrameRange,
    mut on_frame: F,
) -> Result<FrameStack>
where
    F: FnMut(usize),
{
    let (h, w) = source.dimensions();
    let mut frames = Array3::<u8>::zeros((range.count, h, w));

    source.seek(range.start)?;
    for (kk, mut slot) in frames.axis_iter_mut(Axis(0)).enumerate() {
        let frame = source.decode_next()?;
        check_frame_shape(&frame, h, w, range.start + kk)?;
        slot.assign(&frame);
        if kk % LOAD_LOG_INTERVAL == 0 {
            debug!(frame = range.start + kk, "Loading frames");
        }
        on_frame(kk + 1);
    }

    info!(start = range.start, count = range.count, "Frames loaded");
    Ok(frames)
}

pub(crate) fn check_frame_shape(
    frame: &Array2<u8>,
    height: usize,
    width: usize,
    index: usize,
) -> Result<()> {
    if frame.dim() != (height, width) {
        return Err(PrepError::Decode(format!(
            "frame {} is {}x{}, expected {}x{}",
            index,
            frame.ncols(),
            frame.nrows(),
            width,
            height
        )));
    }
    Ok(())
}
