use std::path::PathBuf;

use ndarray::{Array2, Axis};

use crate::error::{PrepError, Result};
use crate::frame::{ColorMode, FrameStack, SourceInfo};

use super::FrameSource;

/// Frames already resident in memory, e.g. decoded by another library.
pub struct MemorySource {
    frames: FrameStack,
    position: usize,
}

impl MemorySource {
    pub fn new(frames: FrameStack) -> Self {
        Self {
            frames,
            position: 0,
        }
    }

    pub fn into_inner(self) -> FrameStack {
        self.frames
    }
}

impl FrameSource for MemorySource {
    fn frame_count(&self) -> usize {
        self.frames.len_of(Axis(0))
    }

    fn dimensions(&self) -> (usize, usize) {
        let (_, h, w) = self.frames.dim();
        (h, w)
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        let total = self.frame_count();
        if index >= total {
            return Err(PrepError::FrameIndexOutOfRange { index, total });
        }
        self.position = index;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Array2<u8>> {
        if self.position >= self.frame_count() {
            return Err(PrepError::Decode(format!(
                "cannot load frame {}: end of video",
                self.position
            )));
        }
        let frame = self.frames.index_axis(Axis(0), self.position).to_owned();
        self.position += 1;
        Ok(frame)
    }

    fn source_info(&self) -> SourceInfo {
        let (h, w) = self.dimensions();
        SourceInfo {
            filename: PathBuf::from("<memory>"),
            total_frames: self.frame_count(),
            width: w as u32,
            height: h as u32,
            bit_depth: 8,
            color_mode: ColorMode::Mono,
        }
    }
}
