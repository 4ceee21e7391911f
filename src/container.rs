//! Container demultiplexing.
//!
//! [`Container`] owns an FFmpeg demuxer context. Opening and probing are
//! separate steps so that an unreadable file and a file whose streams cannot
//! be resolved surface as different errors. The demuxer is closed when the
//! `Container` is dropped, on every exit path.

use std::{
    ffi::CString,
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    ptr,
    time::Duration,
};

use ffmpeg_next::{Error as FfmpegError, Packet, format::context::Input};
use ffmpeg_sys_next::{avformat_find_stream_info, avformat_open_input};

use crate::{error::FrameGrabError, metadata::ContainerSummary, stream::StreamInfo};

/// An opened media container.
///
/// The packet sequence is read once, front to back; it cannot be restarted
/// without opening the file again.
pub struct Container {
    input: Input,
    path: PathBuf,
    probed: bool,
    exhausted: bool,
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("format", &self.format_name())
            .field("probed", &self.probed)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Open a media file and parse its container header.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::FileOpen`] if the file cannot be accessed or
    /// is not a recognisable container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FrameGrabError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening container: {}", path.display());

        let open_error = |reason: String| FrameGrabError::FileOpen {
            path: path.clone(),
            reason,
        };

        crate::ffmpeg::initialize()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let url = path
            .to_str()
            .ok_or_else(|| open_error("path is not valid UTF-8".to_string()))?;
        let url = CString::new(url)
            .map_err(|_| open_error("path contains an interior NUL byte".to_string()))?;

        let input = unsafe {
            let mut context = ptr::null_mut();
            let status =
                avformat_open_input(&mut context, url.as_ptr(), ptr::null(), ptr::null_mut());
            if status != 0 {
                return Err(open_error(FfmpegError::from(status).to_string()));
            }
            Input::wrap(context)
        };

        Ok(Self {
            input,
            path,
            probed: false,
            exhausted: false,
        })
    }

    /// Open and probe in one step.
    ///
    /// # Errors
    ///
    /// See [`open`](Container::open) and [`probe`](Container::probe).
    pub fn open_probed<P: AsRef<Path>>(path: P) -> Result<Self, FrameGrabError> {
        let mut container = Self::open(path)?;
        container.probe()?;
        Ok(container)
    }

    /// Resolve per-stream codec parameters the header alone does not carry.
    ///
    /// Probing may read packets ahead; FFmpeg buffers them and
    /// [`read_packet`](Container::read_packet) still returns them in order.
    /// Calling this more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::StreamInfo`] if probing fails.
    pub fn probe(&mut self) -> Result<(), FrameGrabError> {
        if self.probed {
            return Ok(());
        }

        let status = unsafe { avformat_find_stream_info(self.input.as_mut_ptr(), ptr::null_mut()) };
        if status < 0 {
            return Err(FrameGrabError::StreamInfo {
                path: self.path.clone(),
                reason: FfmpegError::from(status).to_string(),
            });
        }

        self.probed = true;
        log::debug!(
            "Probed {}: format={}, streams={}",
            self.path.display(),
            self.format_name(),
            self.input.nb_streams(),
        );
        Ok(())
    }

    /// Read the next packet in container order.
    ///
    /// Returns `Ok(None)` once the sequence is exhausted; every later call
    /// also returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::FfmpegError`] on a read failure other than
    /// end of file. The sequence is treated as exhausted afterwards.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, FrameGrabError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some(packet)),
            Err(FfmpegError::Eof) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(error) => {
                self.exhausted = true;
                Err(FrameGrabError::from(error))
            }
        }
    }

    /// Snapshot of every stream, in index order.
    pub fn streams(&self) -> Vec<StreamInfo> {
        self.input
            .streams()
            .map(|stream| StreamInfo::from_stream(&stream))
            .collect()
    }

    /// Container format short name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub fn format_name(&self) -> String {
        self.input.format().name().to_string()
    }

    /// Container format long name (e.g. `"QuickTime / MOV"`).
    pub fn format_long_name(&self) -> String {
        self.input.format().description().to_string()
    }

    /// Container-level duration, or zero when unknown.
    pub fn duration(&self) -> Duration {
        let microseconds = self.input.duration();
        if microseconds > 0 {
            Duration::from_micros(microseconds as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Path the container was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`probe`](Container::probe) has completed.
    pub fn is_probed(&self) -> bool {
        self.probed
    }

    /// Owned summary of the container and its streams.
    pub fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            format: self.format_name(),
            format_long_name: self.format_long_name(),
            duration: self.duration(),
            streams: self.streams(),
        }
    }

    /// Print FFmpeg's human-readable description of the container to stderr.
    ///
    /// Informational only.
    pub fn dump_format(&self) {
        let url = self.path.to_string_lossy();
        ffmpeg_next::format::context::input::dump(&self.input, 0, Some(url.as_ref()));
    }

    pub(crate) fn input(&self) -> &Input {
        &self.input
    }
}
