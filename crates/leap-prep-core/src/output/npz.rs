use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use ndarray::ArrayView2;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::consts::OUTPUT_DATASET_KEY;
use crate::error::{PrepError, Result};

use super::{check_frame, partial_path, OutputShape, StackWriter};

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
const NPY_ALIGNMENT: usize = 64;

/// Writes a NumPy `.npz` archive holding a single `u8` array named `box`.
///
/// Frames stream into `<path>.partial`, which is renamed over `path` by
/// `finish`.
pub struct NpzWriter {
    zip: Option<ZipWriter<BufWriter<File>>>,
    path: PathBuf,
    partial: PathBuf,
    shape: OutputShape,
    frames_written: usize,
}

impl NpzWriter {
    pub fn create(path: &Path, shape: OutputShape) -> Result<Self> {
        let partial = partial_path(path);
        let file = File::create(&partial)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(true);
        zip.start_file(format!("{OUTPUT_DATASET_KEY}.npy"), options)?;
        zip.write_all(&npy_header(&shape)?)?;

        Ok(Self {
            zip: Some(zip),
            path: path.to_path_buf(),
            partial,
            shape,
            frames_written: 0,
        })
    }
}

impl StackWriter for NpzWriter {
    fn write_frame(&mut self, frame: ArrayView2<'_, u8>) -> Result<()> {
        check_frame(&self.shape, &frame, self.frames_written)?;
        let zip = self
            .zip
            .as_mut()
            .ok_or_else(|| PrepError::Output("archive already closed".into()))?;
        match frame.as_slice() {
            Some(bytes) => zip.write_all(bytes)?,
            None => {
                for row in frame.rows() {
                    zip.write_all(&row.to_vec())?;
                }
            }
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        if self.frames_written != self.shape.frames {
            return Err(PrepError::Output(format!(
                "wrote {} of {} frames",
                self.frames_written, self.shape.frames
            )));
        }
        let zip = self
            .zip
            .take()
            .ok_or_else(|| PrepError::Output("archive already closed".into()))?;
        let mut inner = zip.finish()?;
        inner.flush()?;
        drop(inner);
        fs::rename(&self.partial, &self.path)?;
        Ok(())
    }
}

impl Drop for NpzWriter {
    fn drop(&mut self) {
        if let Some(zip) = self.zip.take() {
            drop(zip);
            let _ = fs::remove_file(&self.partial);
        }
    }
}

/// NPY v1.0 header for a C-order `u8` array of the output shape.
fn npy_header(shape: &OutputShape) -> Result<Vec<u8>> {
    let [f, h, w, c] = shape.dims();
    let dict = format!(
        "{{'descr': '|u1', 'fortran_order': False, 'shape': ({f}, {h}, {w}, {c}), }}"
    );

    // magic + version + u16 length, then the dict padded with spaces and
    // terminated by a newline so the data starts on an aligned offset.
    let prefix_len = NPY_MAGIC.len() + 2 + 2;
    let unpadded = prefix_len + dict.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    let header_len = dict.len() + padding + 1;
    let header_len = u16::try_from(header_len)
        .map_err(|_| PrepError::Output("NPY header too long".into()))?;

    let mut buf = Vec::with_capacity(prefix_len + header_len as usize);
    buf.extend_from_slice(NPY_MAGIC);
    buf.push(1);
    buf.push(0);
    buf.write_u16::<LittleEndian>(header_len)?;
    buf.extend_from_slice(dict.as_bytes());
    buf.extend(std::iter::repeat(b' ').take(padding));
    buf.push(b'\n');
    Ok(buf)
}
