//! # framegrab
//!
//! Grab the first frames of a video as still images.
//!
//! `framegrab` opens a media container, selects its first video stream,
//! decodes it packet by packet and writes the first few decoded frames as
//! packed RGB images (binary PPM by default, PNG optionally). Demuxing,
//! decoding and pixel-format conversion are done by FFmpeg through the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framegrab::{ExtractOptions, extract_frames};
//!
//! // Writes ./frame1.ppm … ./frame5.ppm
//! let report = extract_frames("input.mp4", ExtractOptions::new())?;
//! for path in &report.written {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), framegrab::FrameGrabError>(())
//! ```
//!
//! ### Inspect a Container
//!
//! ```no_run
//! use framegrab::ContainerSummary;
//!
//! let summary = ContainerSummary::probe("input.mkv")?;
//! print!("{summary}");
//! # Ok::<(), framegrab::FrameGrabError>(())
//! ```
//!
//! ### Step Through the Pipeline
//!
//! The building blocks are public, so the loop that
//! [`FrameExtractor`] runs can also be written by hand:
//!
//! ```no_run
//! use framegrab::{ColorConverter, Container, FrameDecoder, stream::select_video_stream};
//!
//! let mut container = Container::open_probed("input.mp4")?;
//! let index = select_video_stream(&container)?;
//! let mut decoder = FrameDecoder::configure(&container, index)?;
//! let mut converter = ColorConverter::for_decoder(&decoder)?;
//! let mut image = converter.allocate_output()?;
//!
//! while let Some(packet) = container.read_packet()? {
//!     if let Some(frame) = decoder.decode(&packet)? {
//!         converter.convert(frame, &mut image)?;
//!         break;
//!     }
//! }
//! # Ok::<(), framegrab::FrameGrabError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
pub mod container;
pub mod conversion;
pub mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod stream;
mod utilities;
pub mod writer;

pub use configuration::{DEFAULT_FILE_PREFIX, DEFAULT_MAX_FRAMES, ExtractOptions, ImageFormat};
pub use container::Container;
pub use conversion::{ColorConverter, ConvertedImage};
pub use decoder::FrameDecoder;
pub use error::FrameGrabError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use metadata::ContainerSummary;
pub use pipeline::{ExtractionReport, FrameExtractor, FrameFailure, PipelineState, extract_frames};
pub use progress::{ProgressCallback, ProgressInfo};
pub use stream::StreamInfo;
pub use writer::FrameWriter;
