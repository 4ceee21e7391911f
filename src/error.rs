//! Error types for the `framegrab` crate.
//!
//! [`FrameGrabError`] is the single error type returned by every fallible
//! operation. Setup failures (opening, probing, stream selection, decoder and
//! converter setup, buffer allocation) abort a run; write and conversion
//! failures are reported per frame and the run continues.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framegrab` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameGrabError {
    /// The container could not be opened or is not a recognisable format.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path passed to [`Container::open`](crate::Container::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// Per-stream codec parameters could not be resolved.
    #[error("Failed to read stream information from {path}: {reason}")]
    StreamInfo {
        /// Path of the container being probed.
        path: PathBuf,
        /// Underlying reason probing failed.
        reason: String,
    },

    /// The container has no stream of video type.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// No decoder implementation matches the stream's codec.
    #[error("Unsupported codec '{codec}' in stream {stream_index}")]
    UnsupportedCodec {
        /// Index of the selected video stream.
        stream_index: usize,
        /// Codec name as reported by FFmpeg.
        codec: String,
    },

    /// A decoder was found but could not be initialised.
    #[error("Failed to open decoder for stream {stream_index}: {reason}")]
    DecoderOpen {
        /// Index of the selected video stream.
        stream_index: usize,
        /// Underlying reason the decoder failed to open.
        reason: String,
    },

    /// The fixed-size conversion buffer could not be allocated.
    #[error("Failed to allocate {bytes} byte conversion buffer: {reason}")]
    Allocation {
        /// Requested buffer size (0 when the size itself overflowed).
        bytes: usize,
        /// Why the allocation failed.
        reason: String,
    },

    /// The pixel-format conversion context could not be built.
    #[error("Failed to set up colour conversion: {0}")]
    ConverterSetup(String),

    /// An output image could not be created or fully written.
    #[error("Failed to write frame {frame_number} to {path}: {source}")]
    Write {
        /// 1-based sequence number of the frame.
        frame_number: u64,
        /// Destination path.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: IoError,
    },

    /// A decoded frame could not be converted to the output layout.
    #[error("Failed to convert frame: {0}")]
    Conversion(String),

    /// The decoder rejected a packet.
    #[error("Failed to decode packet: {0}")]
    Decode(String),

    /// The decoder accepted its input but could not produce a frame.
    #[error("Failed to decode frame: {0}")]
    FrameDecode(String),

    /// The output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectory {
        /// Directory that was requested.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: IoError,
    },

    /// An error from the `image` crate while encoding a non-PPM output.
    #[error("Image encoding error: {0}")]
    ImageEncode(#[from] ImageError),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error outside of frame writing.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for FrameGrabError {
    fn from(error: FfmpegError) -> Self {
        FrameGrabError::FfmpegError(error.to_string())
    }
}

impl FrameGrabError {
    /// Process exit code for this error.
    ///
    /// Every fatal condition has its own code so scripts can tell them
    /// apart. Codes start at 10 to stay clear of the usage-error code used by
    /// argument parsing.
    pub fn exit_code(&self) -> i32 {
        match self {
            FrameGrabError::FileOpen { .. } => 10,
            FrameGrabError::StreamInfo { .. } => 11,
            FrameGrabError::NoVideoStream => 12,
            FrameGrabError::UnsupportedCodec { .. } => 13,
            FrameGrabError::DecoderOpen { .. } => 14,
            FrameGrabError::Allocation { .. } => 15,
            FrameGrabError::Write { .. }
            | FrameGrabError::OutputDirectory { .. }
            | FrameGrabError::ImageEncode(_) => 16,
            FrameGrabError::ConverterSetup(_) => 17,
            _ => 1,
        }
    }

    /// Returns `true` for errors raised before the read loop starts.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            FrameGrabError::FileOpen { .. }
                | FrameGrabError::StreamInfo { .. }
                | FrameGrabError::NoVideoStream
                | FrameGrabError::UnsupportedCodec { .. }
                | FrameGrabError::DecoderOpen { .. }
                | FrameGrabError::Allocation { .. }
                | FrameGrabError::ConverterSetup(_)
        )
    }
}
