use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_BKG_SEP, DEFAULT_CUTOFF};
use crate::error::{PrepError, Result};
use crate::frame::FrameRange;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Emit progress output. Has no effect on the written data.
    pub verbose: bool,
    /// Estimate and divide out the background. When false the input must
    /// already be normalized so that 1 means "equal to background".
    pub remove_bkg: bool,
    /// Set when the subject is darker than the background.
    pub invert: bool,
    /// Output brightness of pixels equal to the background.
    pub cutoff: u8,
    pub frame_range: Option<FrameRange>,
    pub bkg_method: BackgroundMethod,
    /// Stride between frames sampled for the background.
    pub bkg_sep: usize,
    /// Divide frames and background by the background's mean intensity
    /// before taking their ratio.
    pub legacy_scale: bool,
    pub memory: MemoryStrategy,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            verbose: true,
            remove_bkg: true,
            invert: true,
            cutoff: DEFAULT_CUTOFF,
            frame_range: None,
            bkg_method: BackgroundMethod::Div,
            bkg_sep: DEFAULT_BKG_SEP,
            legacy_scale: true,
            memory: MemoryStrategy::Auto,
        }
    }
}

impl PrepConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    /// Reject configurations that would fail later, before any decoding.
    pub fn validate(&self) -> Result<()> {
        if self.remove_bkg && self.bkg_method != BackgroundMethod::Div {
            return Err(PrepError::UnsupportedMethod(format!(
                "'{}' is not supported, only division ('div')",
                self.bkg_method
            )));
        }
        if self.bkg_sep == 0 {
            return Err(PrepError::InvalidConfig(
                "bkg_sep must be at least 1".into(),
            ));
        }
        if self.cutoff == u8::MAX {
            return Err(PrepError::InvalidConfig("cutoff must be below 255".into()));
        }
        Ok(())
    }
}

/// How the background is removed from each frame.
///
/// Only the exact names `div` and `sub` are recognized, from the command
/// line and from TOML alike.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum BackgroundMethod {
    #[default]
    Div,
    Sub,
}

impl std::fmt::Display for BackgroundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Div => write!(f, "div"),
            Self::Sub => write!(f, "sub"),
        }
    }
}

impl FromStr for BackgroundMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "div" => Ok(Self::Div),
            "sub" => Ok(Self::Sub),
            other => Err(PrepError::UnsupportedMethod(format!(
                "'{other}' not recognized, use div"
            ))),
        }
    }
}

impl TryFrom<String> for BackgroundMethod {
    type Error = PrepError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Whether the selected frames are held in memory at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStrategy {
    /// Stream when the decoded selection exceeds the low-memory threshold.
    #[default]
    Auto,
    /// Load the whole selection, then process it.
    Eager,
    /// Sample the background first, then process and write one frame at a time.
    Streaming,
}

impl std::fmt::Display for MemoryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "Auto"),
            Self::Eager => write!(f, "Eager"),
            Self::Streaming => write!(f, "Streaming"),
        }
    }
}
