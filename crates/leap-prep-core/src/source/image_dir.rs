use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::error::{PrepError, Result};
use crate::frame::{ColorMode, SourceInfo};

use super::FrameSource;

const IMAGE_EXTENSIONS: &[&str] = &["png", "tif", "tiff", "jpg", "jpeg", "bmp"];

/// A directory of still images treated as a video, one file per frame,
/// ordered by file name.
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    height: usize,
    width: usize,
    position: usize,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        files.sort();

        let (width, height) = match files.first() {
            Some(first) => image::image_dimensions(first)
                .map_err(|e| PrepError::Decode(format!("{}: {e}", first.display())))?,
            None => (0, 0),
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            height: height as usize,
            width: width as usize,
            position: 0,
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        let total = self.files.len();
        if index >= total {
            return Err(PrepError::FrameIndexOutOfRange { index, total });
        }
        self.position = index;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Array2<u8>> {
        let path = self.files.get(self.position).ok_or_else(|| {
            PrepError::Decode(format!("cannot load frame {}: end of video", self.position))
        })?;
        let luma = image::open(path)
            .map_err(|e| PrepError::Decode(format!("{}: {e}", path.display())))?
            .to_luma8();
        let (w, h) = luma.dimensions();
        let frame = Array2::from_shape_vec((h as usize, w as usize), luma.into_raw())
            .map_err(|e| PrepError::Decode(format!("{}: {e}", path.display())))?;
        self.position += 1;
        Ok(frame)
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            filename: self.dir.clone(),
            total_frames: self.files.len(),
            width: self.width as u32,
            height: self.height as u32,
            bit_depth: 8,
            color_mode: ColorMode::Mono,
        }
    }
}
