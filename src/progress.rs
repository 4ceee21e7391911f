//! Progress reporting.
//!
//! Implement [`ProgressCallback`] and attach it with
//! [`ExtractOptions::with_progress`](crate::ExtractOptions::with_progress) to
//! observe a run. Callbacks are fired after every decoded frame and once
//! when the packet sequence is exhausted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegrab::{ExtractOptions, FrameExtractor, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{} decoded, {} written", info.frames_decoded, info.frames_written);
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! FrameExtractor::open("input.mp4", options)?.run()?;
//! # Ok::<(), framegrab::FrameGrabError>(())
//! ```

use std::time::Duration;

use crate::pipeline::PipelineState;

/// Snapshot of a running extraction.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Packets read from the container so far, all streams.
    pub packets_read: u64,
    /// Frames the decoder has produced.
    pub frames_decoded: u64,
    /// Output files written successfully.
    pub frames_written: u64,
    /// Maximum number of files the run will write.
    pub frame_limit: u64,
    /// Presentation time of the latest decoded frame, if known.
    pub current_timestamp: Option<Duration>,
    /// Wall-clock time since the read loop started.
    pub elapsed: Duration,
    /// `true` for the final notification.
    pub finished: bool,
    /// Pipeline state at the time of the notification.
    pub state: PipelineState,
}

/// Receives progress updates. Callbacks observe only; they cannot stop a
/// run.
pub trait ProgressCallback: Send + Sync {
    /// Called after each decoded frame and once at the end.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Default callback that discards every notification.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}
