//! Video decoding.
//!
//! [`FrameDecoder`] owns one codec's decode state and the frame it decodes
//! into. Decoders buffer internally (reference and reordered frames), so a
//! packet may produce no frame at all. [`decode`](FrameDecoder::decode)
//! therefore returns `Option`, and the returned frame borrows the decoder:
//! it must be consumed before the next packet is fed in.
//!
//! Packets are queued inside the decoder and sent only when the codec asks
//! for input, so a codec with frames still waiting to be received never
//! causes a packet to be dropped.

use std::{
    collections::VecDeque,
    fmt::{Debug, Formatter, Result as FmtResult},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::Pixel,
    frame::Video as VideoFrame,
    util::error::EAGAIN,
};

use crate::{container::Container, error::FrameGrabError};

/// Decode state for the selected video stream.
pub struct FrameDecoder {
    decoder: VideoDecoder,
    frame: VideoFrame,
    stream_index: usize,
    pending: VecDeque<Packet>,
    drain_requested: bool,
    eof_sent: bool,
}

impl Debug for FrameDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameDecoder")
            .field("stream_index", &self.stream_index)
            .field("width", &self.decoder.width())
            .field("height", &self.decoder.height())
            .field("format", &self.decoder.format())
            .field("queued_packets", &self.pending.len())
            .field("eof_sent", &self.eof_sent)
            .finish_non_exhaustive()
    }
}

impl FrameDecoder {
    /// Build and open a decoder for one of the container's streams.
    ///
    /// The stream's codec parameters are copied into a fresh codec context;
    /// the container's own parameters are left untouched.
    ///
    /// # Errors
    ///
    /// - [`FrameGrabError::UnsupportedCodec`] if no decoder is registered
    ///   for the stream's codec.
    /// - [`FrameGrabError::DecoderOpen`] if the parameters cannot be copied
    ///   or the decoder fails to initialise.
    pub fn configure(container: &Container, stream_index: usize) -> Result<Self, FrameGrabError> {
        let stream = container
            .input()
            .stream(stream_index)
            .ok_or(FrameGrabError::NoVideoStream)?;

        let decoder_open_error = |error: FfmpegError| FrameGrabError::DecoderOpen {
            stream_index,
            reason: error.to_string(),
        };

        let context =
            CodecContext::from_parameters(stream.parameters()).map_err(decoder_open_error)?;
        let codec_id = context.id();
        let codec = ffmpeg_next::decoder::find(codec_id).ok_or_else(|| {
            FrameGrabError::UnsupportedCodec {
                stream_index,
                codec: codec_id.name().to_string(),
            }
        })?;

        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(decoder_open_error)?;

        log::debug!(
            "Opened {} decoder for stream {stream_index}: {}x{} {:?}",
            codec_id.name(),
            decoder.width(),
            decoder.height(),
            decoder.format(),
        );

        Ok(Self {
            decoder,
            frame: VideoFrame::empty(),
            stream_index,
            pending: VecDeque::new(),
            drain_requested: false,
            eof_sent: false,
        })
    }

    /// Feed one packet and return a frame if one became ready.
    ///
    /// Returns `Ok(None)` while the decoder is still buffering. A single
    /// packet can release more than one frame; collect the rest with
    /// [`receive`](FrameDecoder::receive) before decoding the next packet.
    ///
    /// The packet is queued before anything is sent, so it is never lost:
    /// when the decoder still holds frames from earlier packets, those are
    /// returned first and the packet is sent once they have been received.
    ///
    /// Packets from other streams are ignored.
    ///
    /// # Errors
    ///
    /// - [`FrameGrabError::Decode`] if the decoder rejects a queued packet,
    ///   or if the decoder has already been flushed.
    /// - [`FrameGrabError::FrameDecode`] if the decoder accepted its input
    ///   but failed while producing a frame. Queued packets are kept and
    ///   the next call carries on with them.
    pub fn decode(&mut self, packet: &Packet) -> Result<Option<&VideoFrame>, FrameGrabError> {
        if packet.stream() != self.stream_index {
            return Ok(None);
        }
        if self.drain_requested {
            return Err(FrameGrabError::Decode(
                "decoder was already flushed".to_string(),
            ));
        }

        self.pending.push_back(packet.clone());
        self.receive()
    }

    /// Pull the next frame the decoder can produce.
    ///
    /// Queued packets are sent as the decoder asks for more input, and the
    /// end-of-stream signal follows the last of them once
    /// [`drain`](FrameDecoder::drain) was requested. `Ok(None)` means the
    /// decoder needs another packet, or has been fully flushed.
    ///
    /// # Errors
    ///
    /// - [`FrameGrabError::Decode`] if the decoder rejects a queued packet.
    ///   The packet is discarded; calling again continues with the next one.
    /// - [`FrameGrabError::FrameDecode`] if producing a frame failed.
    pub fn receive(&mut self) -> Result<Option<&VideoFrame>, FrameGrabError> {
        loop {
            match self.decoder.receive_frame(&mut self.frame) {
                Ok(()) => return Ok(Some(&self.frame)),
                Err(FfmpegError::Eof) => return Ok(None),
                Err(FfmpegError::Other { errno }) if errno == EAGAIN => {}
                Err(error) => return Err(FrameGrabError::FrameDecode(error.to_string())),
            }

            // The decoder wants input.
            if let Some(packet) = self.pending.pop_front() {
                match self.decoder.send_packet(&packet) {
                    Ok(()) => {}
                    Err(FfmpegError::Other { errno }) if errno == EAGAIN => {
                        self.pending.push_front(packet);
                        return Ok(None);
                    }
                    Err(error) => return Err(FrameGrabError::Decode(error.to_string())),
                }
            } else if self.drain_requested && !self.eof_sent {
                self.send_eof()?;
            } else {
                return Ok(None);
            }
        }
    }

    /// Signal end of stream so the decoder releases the frames it holds.
    ///
    /// Packets still queued are sent first. Follow with repeated
    /// [`receive`](FrameDecoder::receive) calls until it returns `Ok(None)`.
    /// Calling this twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::Decode`] if the decoder refuses the flush.
    pub fn drain(&mut self) -> Result<(), FrameGrabError> {
        self.drain_requested = true;
        if self.pending.is_empty() && !self.eof_sent {
            self.send_eof()?;
        }
        Ok(())
    }

    /// Number of packets accepted by [`decode`](FrameDecoder::decode) but
    /// not yet sent to the codec.
    pub fn queued_packets(&self) -> usize {
        self.pending.len()
    }

    fn send_eof(&mut self) -> Result<(), FrameGrabError> {
        self.eof_sent = true;
        self.decoder
            .send_eof()
            .map_err(|error| FrameGrabError::Decode(error.to_string()))
    }

    /// Index of the stream this decoder consumes.
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Decoded frame width.
    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    /// Decoded frame height.
    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /// Native pixel format of decoded frames.
    pub fn format(&self) -> Pixel {
        self.decoder.format()
    }
}
