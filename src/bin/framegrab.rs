use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use clap::Parser;
use colored::Colorize;
use framegrab::{
    ContainerSummary, DEFAULT_FILE_PREFIX, DEFAULT_MAX_FRAMES, ExtractOptions, FfmpegLogLevel,
    FrameExtractor, FrameGrabError, ImageFormat, ProgressCallback, ProgressInfo,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framegrab input.mp4\n  framegrab input.mkv --out frames --max-frames 10 --format png --progress\n  framegrab input.mp4 --probe --json\n\nExit codes:\n  10 open  11 stream info  12 no video stream  13 unsupported codec\n  14 decoder open  15 allocation  16 write  17 converter setup  1 other";

#[derive(Debug, Parser)]
#[command(
    name = "framegrab",
    version,
    about = "Save the first frames of a video as still images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input media path.
    input: PathBuf,

    /// Output directory; created if missing.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Output file name prefix.
    #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
    prefix: String,

    /// Number of frames to save.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAMES)]
    max_frames: u64,

    /// Output image format (ppm, png).
    #[arg(long, default_value = "ppm")]
    format: ImageFormat,

    /// Skip flushing the decoder at end of stream.
    #[arg(long)]
    no_drain: bool,

    /// Print container information and exit.
    #[arg(long)]
    probe: bool,

    /// With --probe, print JSON.
    #[arg(long, requires = "probe")]
    json: bool,

    /// Print FFmpeg's container dump before decoding.
    #[arg(long)]
    dump: bool,

    /// Show a progress spinner.
    #[arg(long)]
    progress: bool,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<FfmpegLogLevel>,
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {msg}",
        )?);
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let position = info
            .current_timestamp
            .map(|timestamp| format!(" @ {:.2}s", timestamp.as_secs_f64()))
            .unwrap_or_default();
        self.bar.set_message(format!(
            "{} packets, {} frames decoded, {}/{} written{position}",
            info.packets_read, info.frames_decoded, info.frames_written, info.frame_limit,
        ));
        self.bar.tick();
        if info.finished {
            self.bar.finish_and_clear();
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn print_summary(
    summary: &ContainerSummary,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "format": summary.format,
            "format_long_name": summary.format_long_name,
            "duration_seconds": summary.duration.as_secs_f64(),
            "streams": summary.streams.iter().map(|stream| json!({
                "index": stream.index,
                "type": stream.medium_name(),
                "codec": stream.codec_name(),
                "width": stream.is_video().then_some(stream.width),
                "height": stream.is_video().then_some(stream.height),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

/// Returns the process exit code for a run that got past argument parsing.
fn run(cli: Cli) -> Result<u8, Box<dyn std::error::Error>> {
    if let Some(level) = cli.log_level {
        framegrab::set_ffmpeg_log_level(level);
    }

    if cli.probe {
        let summary = ContainerSummary::probe(&cli.input)?;
        print_summary(&summary, cli.json)?;
        return Ok(0);
    }

    let mut options = ExtractOptions::new()
        .with_output_directory(&cli.out)
        .with_file_prefix(cli.prefix)
        .with_max_frames(cli.max_frames)
        .with_image_format(cli.format)
        .with_drain_decoder(!cli.no_drain)
        .with_format_dump(cli.dump);
    if cli.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()?));
    }

    // Nothing touches the disk until setup has succeeded.
    let extractor = FrameExtractor::open(&cli.input, options)?;
    create_output_directory(&cli.out)?;
    let report = extractor.run()?;

    for path in &report.written {
        println!("{} {}", "saved".green().bold(), path.display());
    }
    for failure in &report.failures {
        eprintln!(
            "{} frame {}: {}",
            "failed".red().bold(),
            failure.frame_number,
            failure.error,
        );
    }
    if cli.verbose {
        eprintln!(
            "{} {} packets read, {} decoded into {} frames ({} after flush), {} rejected",
            "summary".cyan().bold(),
            report.packets_read,
            report.packets_decoded,
            report.frames_decoded,
            report.frames_drained,
            report.rejected_packets,
        );
    }

    Ok(report
        .first_failure_exit_code()
        .map(exit_status)
        .unwrap_or(0))
}

fn create_output_directory(path: &Path) -> Result<(), FrameGrabError> {
    fs::create_dir_all(path).map_err(|source| FrameGrabError::OutputDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            let code = error
                .downcast_ref::<FrameGrabError>()
                .map(FrameGrabError::exit_code)
                .unwrap_or(1);
            ExitCode::from(exit_status(code))
        }
    }
}
