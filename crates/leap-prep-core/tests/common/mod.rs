#![allow(dead_code)]

use std::io::Read;
use std::path::Path;

use leap_prep_core::error::{PrepError, Result};
use leap_prep_core::frame::{FrameStack, SourceInfo};
use leap_prep_core::source::ser::SER_HEADER_SIZE;
use leap_prep_core::source::{FrameSource, MemorySource};
use ndarray::{Array2, Array3};

pub const BACKGROUND: u8 = 200;
pub const SUBJECT: u8 = 50;

/// Build a SER file header with configurable bit depth and color mode.
///
/// `color_id`: 0=MONO, 8=BAYER_RGGB, 100=RGB, 101=BGR
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID (4 bytes)
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID (4 bytes)
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC (8 bytes each)
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Serialize a mono 8-bit stack as a SER file.
pub fn build_ser_from_stack(stack: &FrameStack) -> Vec<u8> {
    let (n, h, w) = stack.dim();
    let mut buf = build_ser_header_full(w as u32, h as u32, 8, n, 0);
    buf.extend(stack.iter().copied());
    buf
}

/// Write a SER buffer to a temporary file and return the temp file handle.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::Builder::new()
        .suffix(".ser")
        .tempfile()
        .expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}

/// A bright static background with a dark 2x2 subject sliding along row 2.
pub fn synthetic_video(num_frames: usize, height: usize, width: usize) -> FrameStack {
    let mut stack = Array3::from_elem((num_frames, height, width), BACKGROUND);
    for f in 0..num_frames {
        let col = f % (width - 2);
        for r in 2..4 {
            for c in col..col + 2 {
                stack[[f, r, c]] = SUBJECT;
            }
        }
    }
    stack
}

/// Whether pixel (r, c) of frame `f` of [`synthetic_video`] is the subject.
pub fn is_subject(f: usize, r: usize, c: usize, width: usize) -> bool {
    let col = f % (width - 2);
    (2..4).contains(&r) && (col..col + 2).contains(&c)
}

/// Read the `box` array of an `.npz` file as (shape, data).
pub fn read_npz_box(path: &Path) -> (Vec<usize>, Vec<u8>) {
    let file = std::fs::File::open(path).expect("open npz");
    let mut archive = zip::ZipArchive::new(file).expect("read zip");
    assert_eq!(archive.len(), 1, "expected exactly one array");
    let mut entry = archive.by_name("box.npy").expect("box.npy entry");
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).expect("read entry");

    assert_eq!(&bytes[..6], b"\x93NUMPY");
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let header = std::str::from_utf8(&bytes[10..10 + header_len]).expect("ascii header");
    assert!(header.contains("'descr': '|u1'"), "got: {header}");

    let start = header.find("'shape': (").expect("shape key") + "'shape': (".len();
    let end = start + header[start..].find(')').expect("shape end");
    let shape = header[start..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().expect("shape dim"))
        .collect();

    (shape, bytes[10 + header_len..].to_vec())
}

/// Read the `box` dataset of an HDF5 file as (shape, data).
#[cfg(feature = "hdf5")]
pub fn read_h5_box(path: &Path) -> (Vec<usize>, Vec<u8>) {
    let file = hdf5::File::open(path).expect("open h5");
    let dataset = file.dataset("box").expect("box dataset");
    let shape = dataset.shape();
    let data = dataset.read_raw::<u8>().expect("read box");
    (shape, data)
}

/// A memory source that fails to decode one frame.
pub struct FailingSource {
    inner: MemorySource,
    fail_at: usize,
    position: usize,
}

impl FailingSource {
    pub fn new(frames: FrameStack, fail_at: usize) -> Self {
        Self {
            inner: MemorySource::new(frames),
            fail_at,
            position: 0,
        }
    }
}

impl FrameSource for FailingSource {
    fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    fn dimensions(&self) -> (usize, usize) {
        self.inner.dimensions()
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        self.inner.seek(index)?;
        self.position = index;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Array2<u8>> {
        if self.position == self.fail_at {
            return Err(PrepError::Decode(format!("cannot load frame {}", self.position)));
        }
        self.position += 1;
        self.inner.decode_next()
    }

    fn source_info(&self) -> SourceInfo {
        self.inner.source_info()
    }
}
