//! Stream inventory and video stream selection.
//!
//! [`StreamInfo`] is an owned snapshot of one elementary stream's codec
//! parameters. [`select_video_stream`] scans a container's streams in index
//! order and picks the first video stream; any further video streams are
//! ignored.

use ffmpeg_next::{codec::Id, format::stream::Stream, media::Type};

use crate::{container::Container, error::FrameGrabError};

/// Owned view of one stream's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct StreamInfo {
    /// Position of the stream in the container.
    pub index: usize,
    /// Media type (video, audio, subtitle, ...).
    pub medium: Type,
    /// Codec identifier from the container.
    pub codec_id: Id,
    /// Width in pixels; zero for non-video streams.
    pub width: u32,
    /// Height in pixels; zero for non-video streams.
    pub height: u32,
}

impl StreamInfo {
    pub(crate) fn from_stream(stream: &Stream) -> Self {
        let parameters = stream.parameters();
        let medium = parameters.medium();
        let (width, height) = if medium == Type::Video {
            let (width, height) = unsafe {
                let raw = parameters.as_ptr();
                ((*raw).width, (*raw).height)
            };
            (width.max(0) as u32, height.max(0) as u32)
        } else {
            (0, 0)
        };

        Self {
            index: stream.index(),
            medium,
            codec_id: parameters.id(),
            width,
            height,
        }
    }

    /// Returns `true` if this is a video stream.
    pub fn is_video(&self) -> bool {
        self.medium == Type::Video
    }

    /// Short codec name (e.g. `"h264"`, `"ppm"`).
    pub fn codec_name(&self) -> &'static str {
        self.codec_id.name()
    }

    /// Lower-case media type label used in diagnostics.
    pub fn medium_name(&self) -> &'static str {
        match self.medium {
            Type::Video => "video",
            Type::Audio => "audio",
            Type::Subtitle => "subtitle",
            Type::Data => "data",
            Type::Attachment => "attachment",
            Type::Unknown => "unknown",
        }
    }
}

/// Index of the first video stream, scanning every stream in ascending
/// index order.
pub fn first_video_stream(streams: &[StreamInfo]) -> Option<usize> {
    let mut ordered: Vec<&StreamInfo> = streams.iter().collect();
    ordered.sort_by_key(|stream| stream.index);
    ordered
        .into_iter()
        .find(|stream| stream.is_video())
        .map(|stream| stream.index)
}

/// Select the stream to decode.
///
/// # Errors
///
/// Returns [`FrameGrabError::NoVideoStream`] if no stream of the container
/// is a video stream.
pub fn select_video_stream(container: &Container) -> Result<usize, FrameGrabError> {
    let streams = container.streams();
    let selected = first_video_stream(&streams).ok_or(FrameGrabError::NoVideoStream)?;

    let video_count = streams.iter().filter(|stream| stream.is_video()).count();
    if video_count > 1 {
        log::debug!("{video_count} video streams present, using stream {selected}");
    } else {
        log::debug!("Selected video stream {selected}");
    }

    Ok(selected)
}
