use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::warn;

use crate::error::{PrepError, Result};
use crate::frame::{ColorMode, SourceInfo};

use super::FrameSource;

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
}

impl SerHeader {
    /// Bytes per pixel plane (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel_plane(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            100 | 101 => 3,
            _ => 1,
        }
    }

    /// Total bytes per frame.
    pub fn frame_byte_size(&self) -> Result<usize> {
        let pixels = (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or(PrepError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let bytes_per_pixel = self.bytes_per_pixel_plane() * self.planes_per_pixel();
        pixels
            .checked_mul(bytes_per_pixel)
            .ok_or_else(|| PrepError::InvalidSer("frame size calculation overflow".into()))
    }

    pub fn color_mode(&self) -> ColorMode {
        match self.color_id {
            0 => ColorMode::Mono,
            8 => ColorMode::BayerRGGB,
            9 => ColorMode::BayerGRBG,
            10 => ColorMode::BayerGBRG,
            11 => ColorMode::BayerBGGR,
            100 => ColorMode::RGB,
            101 => ColorMode::BGR,
            _ => ColorMode::Mono,
        }
    }
}

/// Memory-mapped SER file reader.
pub struct SerReader {
    mmap: Mmap,
    path: PathBuf,
    frame_bytes: usize,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    ///
    /// A file shorter than its header claims is accepted; reading a frame
    /// past the recorded data fails with a decode error instead.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(PrepError::InvalidSer("File too small for SER header".into()));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(PrepError::InvalidSer("Missing LUCAM-RECORDER magic".into()));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        let frame_bytes = header.frame_byte_size()?;

        let expected_data_size = SER_HEADER_SIZE + frame_bytes * header.frame_count as usize;
        if mmap.len() < expected_data_size {
            warn!(
                expected = expected_data_size,
                actual = mmap.len(),
                "SER file is truncated"
            );
        }

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
            frame_bytes,
            header,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(PrepError::FrameIndexOutOfRange {
                index,
                total: count,
            });
        }
        let offset = SER_HEADER_SIZE + index * self.frame_bytes;
        let end = offset + self.frame_bytes;
        if end > self.mmap.len() {
            return Err(PrepError::Decode(format!(
                "cannot load frame {} of {}",
                index,
                self.path.display()
            )));
        }
        Ok(&self.mmap[offset..end])
    }

    /// Read a single frame as 8-bit intensity.
    ///
    /// Deeper samples keep their 8 most significant bits. Interleaved color
    /// frames contribute their first stored plane.
    pub fn read_frame(&self, index: usize) -> Result<Array2<u8>> {
        let raw = self.frame_raw(index)?;
        let h = self.header.height as usize;
        let w = self.header.width as usize;
        Ok(decode_plane(
            raw,
            h,
            w,
            self.header.bytes_per_pixel_plane(),
            self.header.planes_per_pixel(),
            self.header.pixel_depth,
            self.header.little_endian,
        ))
    }

    /// Build SourceInfo from the header.
    pub fn source_info(&self) -> SourceInfo {
        SourceInfo {
            filename: self.path.clone(),
            total_frames: self.frame_count(),
            width: self.header.width,
            height: self.header.height,
            bit_depth: self.header.pixel_depth as u8,
            color_mode: self.header.color_mode(),
        }
    }
}

/// A [`SerReader`] with a decode cursor.
pub struct SerSource {
    reader: SerReader,
    position: usize,
}

impl SerSource {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(SerReader::open(path)?))
    }

    pub fn new(reader: SerReader) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    pub fn reader(&self) -> &SerReader {
        &self.reader
    }
}

impl FrameSource for SerSource {
    fn frame_count(&self) -> usize {
        self.reader.frame_count()
    }

    fn dimensions(&self) -> (usize, usize) {
        (
            self.reader.header.height as usize,
            self.reader.header.width as usize,
        )
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
        let frame = self.reader.read_frame(self.position).map_err(|e| match e {
            PrepError::FrameIndexOutOfRange { index, .. } => {
                PrepError::Decode(format!("cannot load frame {index}: end of video"))
            }
            other => other,
        })?;
        self.position += 1;
        Ok(frame)
    }

    fn source_info(&self) -> SourceInfo {
        self.reader.source_info()
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()?.max(0) as u32;

    if width == 0 || height == 0 {
        return Err(PrepError::InvalidDimensions { width, height });
    }
    if pixel_depth == 0 || pixel_depth > 16 {
        return Err(PrepError::InvalidSer(format!(
            "unsupported pixel depth {pixel_depth}"
        )));
    }

    // Treat 0 as little-endian, as most capture software writes it that way.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
    })
}

fn decode_plane(
    raw: &[u8],
    height: usize,
    width: usize,
    bytes_per_sample: usize,
    planes: usize,
    bit_depth: u32,
    little_endian: bool,
) -> Array2<u8> {
    let shift = bit_depth.saturating_sub(8);
    let stride = planes * bytes_per_sample;

    Array2::from_shape_fn((height, width), |(row, col)| {
        let idx = (row * width + col) * stride;
        if bytes_per_sample == 1 {
            raw[idx]
        } else {
            let pair = [raw[idx], raw[idx + 1]];
            let val = if little_endian {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            };
            (val >> shift).min(u8::MAX as u16) as u8
        }
    })
}
