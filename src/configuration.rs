//! Extraction options.
//!
//! [`ExtractOptions`] is a builder carrying where and how frames are
//! written, plus operational settings such as decoder draining and progress
//! reporting. A default-constructed value writes the first five frames as
//! `frame1.ppm` … `frame5.ppm` into the current directory.
//!
//! # Example
//!
//! ```no_run
//! use framegrab::{ExtractOptions, ImageFormat};
//!
//! let options = ExtractOptions::new()
//!     .with_output_directory("frames")
//!     .with_file_prefix("shot")
//!     .with_image_format(ImageFormat::Png);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use crate::progress::{NoOpProgress, ProgressCallback};

/// Default number of frames written per run.
pub const DEFAULT_MAX_FRAMES: u64 = 5;

/// Default output file name prefix.
pub const DEFAULT_FILE_PREFIX: &str = "frame";

/// Encoding of the output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Binary PPM (P6): text header then raw RGB bytes. The default.
    #[default]
    Ppm,
    /// PNG, encoded by the `image` crate.
    Png,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Ppm => "ppm",
            ImageFormat::Png => "png",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ppm" | "p6" => Ok(ImageFormat::Ppm),
            "png" => Ok(ImageFormat::Png),
            other => Err(format!("unsupported image format: {other}")),
        }
    }
}

/// Options for one extraction run.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) output_directory: PathBuf,
    pub(crate) file_prefix: String,
    pub(crate) max_frames: u64,
    pub(crate) image_format: ImageFormat,
    pub(crate) drain_decoder: bool,
    pub(crate) format_dump: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("output_directory", &self.output_directory)
            .field("file_prefix", &self.file_prefix)
            .field("max_frames", &self.max_frames)
            .field("image_format", &self.image_format)
            .field("drain_decoder", &self.drain_decoder)
            .field("format_dump", &self.format_dump)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Options with default settings.
    pub fn new() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            max_frames: DEFAULT_MAX_FRAMES,
            image_format: ImageFormat::Ppm,
            drain_decoder: true,
            format_dump: false,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Directory the output files are written into. It must already exist.
    #[must_use]
    pub fn with_output_directory<P: AsRef<Path>>(mut self, directory: P) -> Self {
        self.output_directory = directory.as_ref().to_path_buf();
        self
    }

    /// File name prefix; the 1-based frame number and extension follow it.
    #[must_use]
    pub fn with_file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Maximum number of files to write. Frames past the limit are still
    /// decoded and converted.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Output encoding.
    #[must_use]
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Whether to flush the decoder at end of stream and keep the frames it
    /// was still holding back. Defaults to `true`.
    #[must_use]
    pub fn with_drain_decoder(mut self, drain: bool) -> Self {
        self.drain_decoder = drain;
        self
    }

    /// Print FFmpeg's container description to stderr before decoding.
    #[must_use]
    pub fn with_format_dump(mut self, dump: bool) -> Self {
        self.format_dump = dump;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Output directory.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Maximum number of files written.
    pub fn max_frames(&self) -> u64 {
        self.max_frames
    }

    /// Output encoding.
    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    /// Path of the `frame_number`-th output file (1-based).
    pub fn output_path(&self, frame_number: u64) -> PathBuf {
        self.output_directory.join(format!(
            "{}{}.{}",
            self.file_prefix,
            frame_number,
            self.image_format.extension(),
        ))
    }
}
