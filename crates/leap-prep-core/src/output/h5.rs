use std::path::{Path, PathBuf};

use ndarray::ArrayView2;

use crate::consts::OUTPUT_DATASET_KEY;
use crate::error::{PrepError, Result};

use super::{check_frame, OutputShape, StackWriter};

/// Writes an HDF5 file with a single `u8` dataset named `box`.
///
/// Frames are buffered and the file is only created by `finish`.
pub struct Hdf5Writer {
    path: PathBuf,
    shape: OutputShape,
    buffer: Vec<u8>,
    frames_written: usize,
}

impl Hdf5Writer {
    pub fn create(path: &Path, shape: OutputShape) -> Self {
        Self {
            path: path.to_path_buf(),
            shape,
            buffer: Vec::with_capacity(shape.frames * shape.frame_len()),
            frames_written: 0,
        }
    }
}

impl StackWriter for Hdf5Writer {
    fn write_frame(&mut self, frame: ArrayView2<'_, u8>) -> Result<()> {
        check_frame(&self.shape, &frame, self.frames_written)?;
        self.buffer.extend(frame.iter().copied());
        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        if self.frames_written != self.shape.frames {
            return Err(PrepError::Output(format!(
                "wrote {} of {} frames",
                self.frames_written, self.shape.frames
            )));
        }
        let file = hdf5::File::create(&self.path)?;
        let dataset = file
            .new_dataset::<u8>()
            .shape(self.shape.dims().to_vec())
            .create(OUTPUT_DATASET_KEY)?;
        dataset.write_raw(self.buffer.as_slice())?;
        file.close()?;
        Ok(())
    }
}
