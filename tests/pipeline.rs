//! End-to-end extraction tests over a synthesised image-sequence container.

mod common;

use std::{
    fs,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use framegrab::{
    ExtractOptions, FrameExtractor, FrameGrabError, ImageFormat, PipelineState,
    ProgressCallback, ProgressInfo, extract_frames,
};

use common::{
    FRAME_HEIGHT, FRAME_WIDTH, files_with_prefix, frame_pixels, sized_frame_pixels,
    write_ppm_sequence, write_reordered_clip, write_sized_ppm_sequence,
};

fn expected_ppm(index: u32) -> Vec<u8> {
    let mut bytes = format!("P6\n{FRAME_WIDTH} {FRAME_HEIGHT}\n255\n").into_bytes();
    bytes.extend(frame_pixels(index));
    bytes
}

#[test]
fn ten_frame_input_writes_exactly_five_files() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 10);

    let options = ExtractOptions::new().with_output_directory(output_directory.path());
    let report = extract_frames(&input, options).expect("Extraction failed");

    assert_eq!(report.frames_decoded, 10);
    assert!(report.is_complete());
    assert_eq!(report.written.len(), 5);

    let files = files_with_prefix(output_directory.path(), "frame");
    let names: Vec<String> = files
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        ["frame1.ppm", "frame2.ppm", "frame3.ppm", "frame4.ppm", "frame5.ppm"],
    );

    for index in 1..=5 {
        let written = fs::read(output_directory.path().join(format!("frame{index}.ppm")))
            .expect("Failed to read output");
        assert_eq!(written, expected_ppm(index), "frame {index} differs from its source");
    }
}

#[test]
fn four_by_two_input_writes_exact_ppm_bytes() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_sized_ppm_sequence(input_directory.path(), 10, 4, 2);

    let options = ExtractOptions::new().with_output_directory(output_directory.path());
    let report = extract_frames(&input, options).expect("Extraction failed");

    assert_eq!(report.frames_decoded, 10);
    assert_eq!(files_with_prefix(output_directory.path(), "frame").len(), 5);
    for index in 1..=5 {
        let written = fs::read(output_directory.path().join(format!("frame{index}.ppm")))
            .expect("Failed to read output");
        let (header, pixels) = written.split_at(11);
        assert_eq!(header, b"P6\n4 2\n255\n");
        assert_eq!(pixels.len(), 24);
        assert_eq!(pixels, sized_frame_pixels(index, 4, 2).as_slice());
    }
}

#[test]
fn corrupt_packet_does_not_swallow_the_next_one() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 6);
    fs::write(input_directory.path().join("input3.ppm"), b"not a ppm image")
        .expect("Failed to corrupt input");

    let options = ExtractOptions::new().with_output_directory(output_directory.path());
    let report = extract_frames(&input, options).expect("Run should complete");

    assert_eq!(report.packets_decoded, 6);
    assert_eq!(report.rejected_packets + report.frame_errors, 1);
    assert_eq!(report.frames_decoded, 5);
    assert_eq!(report.written.len(), 5);

    // Frames 1 and 2 come from the first two inputs, the rest are shifted
    // past the corrupt one.
    let sources = [1, 2, 4, 5, 6];
    for (number, source) in (1..=5).zip(sources) {
        let written = fs::read(output_directory.path().join(format!("frame{number}.ppm")))
            .expect("Failed to read output");
        assert_eq!(written, expected_ppm(source), "frame {number} is not input {source}");
    }
}

#[test]
fn flushing_releases_frames_held_by_a_reordering_decoder() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let clip = directory.path().join("clip.mpg");
    write_reordered_clip(&clip, 10);

    let drained_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let options = ExtractOptions::new()
        .with_output_directory(drained_directory.path())
        .with_max_frames(10);
    let drained = extract_frames(&clip, options).expect("Extraction failed");

    assert_eq!(drained.frames_decoded, 10);
    assert!(drained.frames_drained >= 1);
    assert_eq!(drained.written.len(), 10);

    let undrained_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let options = ExtractOptions::new()
        .with_output_directory(undrained_directory.path())
        .with_max_frames(10)
        .with_drain_decoder(false);
    let undrained = extract_frames(&clip, options).expect("Extraction failed");

    assert_eq!(undrained.frames_drained, 0);
    assert!(undrained.frames_decoded < 10);
    assert_eq!(undrained.written.len() as u64, undrained.frames_decoded);
}

#[test]
fn short_input_writes_one_file_per_frame() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 3);

    let options = ExtractOptions::new().with_output_directory(input_directory.path());
    let report = extract_frames(&input, options).expect("Extraction failed");

    assert_eq!(report.frames_decoded, 3);
    assert_eq!(report.written.len(), 3);
    assert_eq!(files_with_prefix(input_directory.path(), "frame").len(), 3);
    assert!(!input_directory.path().join("frame4.ppm").exists());
}

#[test]
fn repeated_runs_produce_identical_files() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 6);

    let mut runs = Vec::new();
    for _ in 0..2 {
        let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let options = ExtractOptions::new().with_output_directory(output_directory.path());
        let _report = extract_frames(&input, options).expect("Extraction failed");

        let contents: Vec<Vec<u8>> = files_with_prefix(output_directory.path(), "frame")
            .iter()
            .map(|path| fs::read(path).expect("Failed to read output"))
            .collect();
        runs.push(contents);
    }

    assert_eq!(runs[0].len(), 5);
    assert_eq!(runs[0], runs[1]);
}

#[test]
fn write_failures_are_reported_and_decoding_continues() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 8);
    let missing = input_directory.path().join("does-not-exist");

    let options = ExtractOptions::new().with_output_directory(&missing);
    let report = extract_frames(&input, options).expect("Run should complete");

    assert_eq!(report.frames_decoded, 8);
    assert!(report.written.is_empty());
    assert_eq!(report.failures.len(), 5);
    let numbers: Vec<u64> = report.failures.iter().map(|failure| failure.frame_number).collect();
    assert_eq!(numbers, [1, 2, 3, 4, 5]);
    assert!(
        report
            .failures
            .iter()
            .all(|failure| matches!(failure.error, FrameGrabError::Write { .. }))
    );
    assert_eq!(report.first_failure_exit_code(), Some(16));
    assert!(!missing.exists());
}

#[test]
fn frame_limit_and_prefix_are_configurable() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 6);

    let options = ExtractOptions::new()
        .with_output_directory(output_directory.path())
        .with_file_prefix("still_")
        .with_max_frames(2);
    let report = extract_frames(&input, options).expect("Extraction failed");

    assert_eq!(report.frames_decoded, 6);
    assert_eq!(
        report.written,
        [
            output_directory.path().join("still_1.ppm"),
            output_directory.path().join("still_2.ppm"),
        ],
    );
}

#[test]
fn zero_frame_limit_decodes_without_writing() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 4);

    let options = ExtractOptions::new()
        .with_output_directory(output_directory.path())
        .with_max_frames(0);
    let report = extract_frames(&input, options).expect("Extraction failed");

    assert_eq!(report.frames_decoded, 4);
    assert!(report.written.is_empty());
    assert!(files_with_prefix(output_directory.path(), "").is_empty());
}

#[test]
fn png_output_carries_the_same_pixels() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 2);

    let options = ExtractOptions::new()
        .with_output_directory(output_directory.path())
        .with_image_format(ImageFormat::Png);
    let report = extract_frames(&input, options).expect("Extraction failed");
    assert_eq!(report.written.len(), 2);

    let decoded = image::open(output_directory.path().join("frame2.png"))
        .expect("Failed to open PNG")
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
    assert_eq!(decoded.into_raw(), frame_pixels(2));
}

#[test]
fn extractor_reports_setup_state() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 2);

    let options = ExtractOptions::new().with_output_directory(input_directory.path());
    let extractor = FrameExtractor::open(&input, options).expect("Setup failed");

    assert_eq!(extractor.state(), PipelineState::DecoderReady);
    assert_eq!(extractor.stream_index(), 0);
    assert_eq!(extractor.frame_dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
    assert_eq!(extractor.summary().video_stream_count(), 1);

    let report = extractor.run().expect("Run failed");
    assert_eq!(report.state, PipelineState::Closed);
    assert_eq!(report.packets_read, report.packets_decoded);
    assert_eq!(report.rejected_packets, 0);
    assert!(report.read_error.is_none());
}

#[test]
fn disabling_the_flush_never_adds_frames() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 3);

    let options = ExtractOptions::new()
        .with_output_directory(output_directory.path())
        .with_drain_decoder(false);
    let report = extract_frames(&input, options).expect("Extraction failed");

    assert_eq!(report.frames_drained, 0);
    assert!(report.frames_decoded <= 3);
    assert_eq!(report.written.len() as u64, report.frames_decoded.min(5));
}

#[derive(Default)]
struct RecordingProgress {
    calls: AtomicU64,
    last: Mutex<Option<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(info.clone());
    }
}

#[test]
fn progress_fires_per_frame_and_once_at_the_end() {
    let input_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_ppm_sequence(input_directory.path(), 7);
    let progress = Arc::new(RecordingProgress::default());

    let options = ExtractOptions::new()
        .with_output_directory(output_directory.path())
        .with_progress(progress.clone());
    let report = extract_frames(&input, options).expect("Extraction failed");

    assert_eq!(progress.calls.load(Ordering::SeqCst), report.frames_decoded + 1);
    let last = progress.last.lock().unwrap().clone().expect("No progress recorded");
    assert!(last.finished);
    assert_eq!(last.state, PipelineState::Running);
    assert_eq!(last.frames_decoded, 7);
    assert_eq!(last.frames_written, 5);
    assert_eq!(last.frame_limit, 5);
}
