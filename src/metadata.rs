//! Container metadata summaries.
//!
//! [`ContainerSummary`] is an owned description of a container: its format,
//! duration and streams. It is what `framegrab --probe` prints, and it is
//! logged at debug level before a run starts.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    time::Duration,
};

use crate::{container::Container, error::FrameGrabError, stream::StreamInfo};

/// Format, duration and stream list of an opened container.
///
/// # Example
///
/// ```no_run
/// use framegrab::ContainerSummary;
///
/// let summary = ContainerSummary::probe("input.mp4")?;
/// println!("Format {}, duration {:?}", summary.format_long_name, summary.duration);
/// # Ok::<(), framegrab::FrameGrabError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct ContainerSummary {
    /// Short format name.
    pub format: String,
    /// Human-readable format name.
    pub format_long_name: String,
    /// Container duration; zero when unknown.
    pub duration: Duration,
    /// Every stream, in index order.
    pub streams: Vec<StreamInfo>,
}

impl ContainerSummary {
    /// Open and probe a file, summarise it, and close it again.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::FileOpen`] or [`FrameGrabError::StreamInfo`].
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self, FrameGrabError> {
        let container = Container::open_probed(path)?;
        Ok(container.summary())
    }

    /// Number of video streams.
    pub fn video_stream_count(&self) -> usize {
        self.streams.iter().filter(|stream| stream.is_video()).count()
    }
}

impl Display for ContainerSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(
            f,
            "Format {} ({}), duration {} us",
            self.format_long_name,
            self.format,
            self.duration.as_micros(),
        )?;
        for stream in &self.streams {
            write!(
                f,
                "  Stream #{}: {} [{}]",
                stream.index,
                stream.medium_name(),
                stream.codec_name(),
            )?;
            if stream.is_video() {
                write!(f, " {}x{}", stream.width, stream.height)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
