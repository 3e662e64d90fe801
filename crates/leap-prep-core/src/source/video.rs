use std::path::{Path, PathBuf};

use ndarray::Array2;
use opencv::core::{self, Mat};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use tracing::debug;

use crate::error::{PrepError, Result};
use crate::frame::{ColorMode, SourceInfo};

use super::FrameSource;

/// An ordinary video container decoded through OpenCV.
///
/// Frame count and size come from the container properties. Color frames
/// contribute their first channel.
pub struct VideoCaptureSource {
    capture: VideoCapture,
    path: PathBuf,
    frame_count: usize,
    height: usize,
    width: usize,
}

impl VideoCaptureSource {
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .to_str()
            .ok_or_else(|| PrepError::Decode(format!("non UTF-8 path: {}", path.display())))?;
        let capture = VideoCapture::from_file(name, videoio::CAP_ANY).map_err(cv_err)?;
        if !capture.is_opened().map_err(cv_err)? {
            return Err(PrepError::Decode(format!("cannot open video {}", path.display())));
        }

        let prop = |id: i32| -> Result<usize> {
            let value = capture.get(id).map_err(cv_err)?;
            Ok(if value.is_finite() && value > 0.0 { value as usize } else { 0 })
        };
        let frame_count = prop(videoio::CAP_PROP_FRAME_COUNT)?;
        let width = prop(videoio::CAP_PROP_FRAME_WIDTH)?;
        let height = prop(videoio::CAP_PROP_FRAME_HEIGHT)?;
        debug!(frame_count, width, height, path = %path.display(), "Video container opened");

        Ok(Self {
            capture,
            path: path.to_path_buf(),
            frame_count,
            height,
            width,
        })
    }
}

fn cv_err(e: opencv::Error) -> PrepError {
    PrepError::Decode(e.to_string())
}

impl FrameSource for VideoCaptureSource {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        let total = self.frame_count;
        if index >= total {
            return Err(PrepError::FrameIndexOutOfRange { index, total });
        }
        self.capture
            .set(videoio::CAP_PROP_POS_FRAMES, index as f64)
            .map_err(cv_err)?;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Array2<u8>> {
        let mut frame = Mat::default();
        let read = self.capture.read(&mut frame).map_err(cv_err)?;
        if !read || frame.empty() {
            return Err(PrepError::Decode(format!(
                "cannot load frame from {}",
                self.path.display()
            )));
        }
        if frame.depth() != core::CV_8U {
            return Err(PrepError::Decode(format!(
                "{}: only 8-bit video is supported",
                self.path.display()
            )));
        }

        let plane = if frame.channels() == 1 {
            frame
        } else {
            let mut first = Mat::default();
            core::extract_channel(&frame, &mut first, 0).map_err(cv_err)?;
            first
        };
        let plane = if plane.is_continuous() {
            plane
        } else {
            plane.try_clone().map_err(cv_err)?
        };

        let (rows, cols) = (plane.rows() as usize, plane.cols() as usize);
        let bytes = plane.data_bytes().map_err(cv_err)?.to_vec();
        Array2::from_shape_vec((rows, cols), bytes)
            .map_err(|e| PrepError::Decode(format!("{}: {e}", self.path.display())))
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            filename: self.path.clone(),
            total_frames: self.frame_count,
            width: self.width as u32,
            height: self.height as u32,
            bit_depth: 8,
            color_mode: ColorMode::BGR,
        }
    }
}
