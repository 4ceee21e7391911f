//! The extraction pipeline.
//!
//! [`FrameExtractor`] drives one run end to end: it opens and probes the
//! container, selects the first video stream, opens a decoder and a colour
//! converter, then reads packets in container order. Every decoded frame is
//! converted into a single reused RGB buffer; the first
//! [`max_frames`](crate::ExtractOptions::with_max_frames) of them are
//! written to disk.
//!
//! Setup happens in [`FrameExtractor::open`]. Each acquired resource is owned
//! by a local until the extractor is assembled, so any setup failure drops
//! (and closes) everything acquired so far and no output file is created.
//!
//! # Example
//!
//! ```no_run
//! use framegrab::{ExtractOptions, FrameExtractor};
//!
//! let options = ExtractOptions::new().with_output_directory("frames");
//! let report = FrameExtractor::open("input.mp4", options)?.run()?;
//! println!("wrote {} files", report.written.len());
//! # Ok::<(), framegrab::FrameGrabError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

use crate::{
    configuration::ExtractOptions,
    container::Container,
    conversion::{ColorConverter, ConvertedImage},
    decoder::FrameDecoder,
    error::FrameGrabError,
    metadata::ContainerSummary,
    progress::ProgressInfo,
    stream::select_video_stream,
    utilities::pts_to_seconds,
    writer::FrameWriter,
};

/// Lifecycle of a run. Transitions only move forward; any setup failure
/// jumps straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Nothing acquired yet.
    #[default]
    Init,
    /// Container opened and probed.
    Opened,
    /// Video stream chosen.
    StreamSelected,
    /// Decoder, converter and output buffer ready.
    DecoderReady,
    /// Reading packets.
    Running,
    /// All resources released.
    Closed,
}

/// A frame that was decoded but not saved.
#[derive(Debug)]
pub struct FrameFailure {
    /// 1-based decode order of the frame.
    pub frame_number: u64,
    /// Why it was not saved.
    pub error: FrameGrabError,
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
#[must_use]
pub struct ExtractionReport {
    /// Packets read from the container, all streams.
    pub packets_read: u64,
    /// Packets of the selected stream handed to the decoder.
    pub packets_decoded: u64,
    /// Packets the decoder rejected; decoding continued with the next one.
    pub rejected_packets: u64,
    /// Times the decoder failed while producing a frame from accepted input.
    pub frame_errors: u64,
    /// Frames the decoder produced.
    pub frames_decoded: u64,
    /// Of `frames_decoded`, frames released by the end-of-stream flush.
    pub frames_drained: u64,
    /// Files written, in frame order.
    pub written: Vec<PathBuf>,
    /// Frames that could not be converted or written.
    pub failures: Vec<FrameFailure>,
    /// Read error that ended the packet sequence early, if any.
    pub read_error: Option<String>,
    /// State the run ended in; [`PipelineState::Closed`] once `run` returns.
    pub state: PipelineState,
}

impl ExtractionReport {
    /// Returns `true` if every frame within the limit was saved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Exit code of the first recorded failure, if any.
    pub fn first_failure_exit_code(&self) -> Option<i32> {
        self.failures.first().map(|failure| failure.error.exit_code())
    }
}

/// Conversion and output state owned by the read loop.
struct FrameOutput {
    converter: ColorConverter,
    image: ConvertedImage,
    writer: FrameWriter,
    options: ExtractOptions,
    time_base: Rational,
    started: Instant,
    current_timestamp: Option<Duration>,
}

impl FrameOutput {
    fn accept(&mut self, frame: &VideoFrame, report: &mut ExtractionReport) {
        report.frames_decoded += 1;
        let frame_number = report.frames_decoded;

        self.current_timestamp = frame.timestamp().or(frame.pts()).map(|pts| {
            Duration::from_secs_f64(pts_to_seconds(pts, self.time_base).max(0.0))
        });

        // Frames past the limit are still converted.
        match self.converter.convert(frame, &mut self.image) {
            Ok(()) if frame_number <= self.options.max_frames => {
                let path = self.options.output_path(frame_number);
                match self.writer.write(&self.image, &path, frame_number) {
                    Ok(()) => report.written.push(path),
                    Err(error) => {
                        log::warn!("Frame {frame_number} was not saved: {error}");
                        report.failures.push(FrameFailure {
                            frame_number,
                            error,
                        });
                    }
                }
            }
            Ok(()) => {
                log::trace!("Frame {frame_number} converted, output limit reached");
            }
            Err(error) => {
                log::warn!("Frame {frame_number} could not be converted: {error}");
                if frame_number <= self.options.max_frames {
                    report.failures.push(FrameFailure {
                        frame_number,
                        error,
                    });
                }
            }
        }

        self.notify(report, false);
    }

    fn notify(&self, report: &ExtractionReport, finished: bool) {
        self.options.progress.on_progress(&ProgressInfo {
            packets_read: report.packets_read,
            frames_decoded: report.frames_decoded,
            frames_written: report.written.len() as u64,
            frame_limit: self.options.max_frames,
            current_timestamp: self.current_timestamp,
            elapsed: self.started.elapsed(),
            finished,
            state: PipelineState::Running,
        });
    }
}

/// One extraction run over one media file.
pub struct FrameExtractor {
    container: Container,
    decoder: FrameDecoder,
    output: FrameOutput,
    summary: ContainerSummary,
    state: PipelineState,
}

impl std::fmt::Debug for FrameExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameExtractor")
            .field("container", &self.container)
            .field("decoder", &self.decoder)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl FrameExtractor {
    /// Run every setup step and return an extractor ready to read.
    ///
    /// # Errors
    ///
    /// Returns the first setup failure:
    /// [`FileOpen`](FrameGrabError::FileOpen),
    /// [`StreamInfo`](FrameGrabError::StreamInfo),
    /// [`NoVideoStream`](FrameGrabError::NoVideoStream),
    /// [`UnsupportedCodec`](FrameGrabError::UnsupportedCodec),
    /// [`DecoderOpen`](FrameGrabError::DecoderOpen),
    /// [`ConverterSetup`](FrameGrabError::ConverterSetup) or
    /// [`Allocation`](FrameGrabError::Allocation).
    pub fn open<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self, FrameGrabError> {
        let mut state = PipelineState::Init;
        let result = Self::set_up(path.as_ref(), options, &mut state);
        if let Err(error) = &result {
            log::debug!("Setup failed in state {state:?}: {error}");
            log::debug!("Pipeline state: {state:?} -> {:?}", PipelineState::Closed);
        }
        result
    }

    fn set_up(
        path: &Path,
        options: ExtractOptions,
        state: &mut PipelineState,
    ) -> Result<Self, FrameGrabError> {
        let container = Container::open_probed(path)?;
        advance(state, PipelineState::Opened);

        let summary = container.summary();
        log::debug!("{}", summary.to_string().trim_end());
        if options.format_dump {
            container.dump_format();
        }

        let stream_index = select_video_stream(&container)?;
        advance(state, PipelineState::StreamSelected);

        let decoder = FrameDecoder::configure(&container, stream_index)?;
        let converter = ColorConverter::for_decoder(&decoder)?;
        let image = converter.allocate_output()?;
        advance(state, PipelineState::DecoderReady);

        let time_base = container
            .input()
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .unwrap_or(Rational::new(1, 90_000));

        let output = FrameOutput {
            converter,
            image,
            writer: FrameWriter::new(options.image_format),
            options,
            time_base,
            started: Instant::now(),
            current_timestamp: None,
        };

        Ok(Self {
            container,
            decoder,
            output,
            summary,
            state: *state,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Index of the stream being decoded.
    pub fn stream_index(&self) -> usize {
        self.decoder.stream_index()
    }

    /// Output frame dimensions as `(width, height)`.
    pub fn frame_dimensions(&self) -> (u32, u32) {
        self.output.converter.output_dimensions()
    }

    /// Summary of the opened container.
    pub fn summary(&self) -> &ContainerSummary {
        &self.summary
    }

    /// Read the container to the end, decoding the selected stream.
    ///
    /// Per-frame conversion and write failures are logged, recorded in the
    /// report and do not stop the run. Every resource is released when this
    /// returns.
    ///
    /// # Errors
    ///
    /// This method currently has no fatal error path once setup succeeded;
    /// the `Result` leaves room for one.
    pub fn run(self) -> Result<ExtractionReport, FrameGrabError> {
        let FrameExtractor {
            mut container,
            mut decoder,
            mut output,
            state: mut current_state,
            ..
        } = self;
        let state = &mut current_state;
        advance(state, PipelineState::Running);

        let stream_index = decoder.stream_index();
        let mut report = ExtractionReport::default();
        output.started = Instant::now();

        loop {
            let packet = match container.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(error) => {
                    log::warn!("Stopped reading after {} packets: {error}", report.packets_read);
                    report.read_error = Some(error.to_string());
                    break;
                }
            };
            report.packets_read += 1;

            if packet.stream() != stream_index {
                continue;
            }
            report.packets_decoded += 1;

            match decoder.decode(&packet) {
                Ok(Some(frame)) => output.accept(frame, &mut report),
                Ok(None) => {}
                Err(error) => record_decode_error(error, &mut report),
            }
            receive_pending(&mut decoder, &mut output, &mut report);
        }

        // Send whatever a frame failure left queued, for as long as that
        // makes progress.
        while decoder.queued_packets() > 0 {
            let queued = decoder.queued_packets();
            receive_pending(&mut decoder, &mut output, &mut report);
            if decoder.queued_packets() == queued {
                log::warn!("{queued} packets could not be sent to the decoder");
                break;
            }
        }

        if output.options.drain_decoder {
            let before = report.frames_decoded;
            match decoder.drain() {
                Ok(()) => receive_pending(&mut decoder, &mut output, &mut report),
                Err(error) => log::warn!("Decoder flush failed: {error}"),
            }
            report.frames_drained = report.frames_decoded - before;
        }

        output.notify(&report, true);

        drop(decoder);
        drop(container);
        advance(state, PipelineState::Closed);
        report.state = *state;

        log::info!(
            "Decoded {} frames from {} packets, wrote {} files",
            report.frames_decoded,
            report.packets_read,
            report.written.len(),
        );
        Ok(report)
    }
}

/// Open `path` and run the whole pipeline.
///
/// # Errors
///
/// See [`FrameExtractor::open`] and [`FrameExtractor::run`].
pub fn extract_frames<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<ExtractionReport, FrameGrabError> {
    FrameExtractor::open(path, options)?.run()
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    log::debug!("Pipeline state: {state:?} -> {next:?}");
    *state = next;
}

fn receive_pending(
    decoder: &mut FrameDecoder,
    output: &mut FrameOutput,
    report: &mut ExtractionReport,
) {
    loop {
        match decoder.receive() {
            Ok(Some(frame)) => output.accept(frame, report),
            Ok(None) => break,
            Err(error) => {
                // A rejected packet has left the queue, so carrying on makes
                // progress. After a frame failure queued packets stay queued
                // for the next call.
                let rejected = matches!(error, FrameGrabError::Decode(_));
                record_decode_error(error, report);
                if !rejected {
                    break;
                }
            }
        }
    }
}

fn record_decode_error(error: FrameGrabError, report: &mut ExtractionReport) {
    match error {
        FrameGrabError::Decode(_) => {
            log::warn!("Packet rejected after {} packets: {error}", report.packets_read);
            report.rejected_packets += 1;
        }
        other => {
            log::warn!("Decoder failed while producing a frame: {other}");
            report.frame_errors += 1;
        }
    }
}
