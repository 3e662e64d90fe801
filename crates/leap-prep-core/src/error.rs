use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec issue: {0}")]
    Decode(String),

    #[error("Unsupported background method: {0}")]
    UnsupportedMethod(String),

    #[error("Error in normalized image: {0}")]
    NormalizationInvariant(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame range starts at {start} but the video has only {total} frames")]
    InvalidRange { start: usize, total: usize },

    #[error("Frame range starting at {start} selects no frames")]
    EmptyRange { start: usize },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("Output error: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, PrepError>;
