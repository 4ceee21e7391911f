//! Media fixtures synthesised at test time.

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Packet, Rational, codec::Id, codec::context::Context as CodecContext, format::Pixel,
    frame::Video as VideoFrame,
};

pub const FRAME_WIDTH: u32 = 16;
pub const FRAME_HEIGHT: u32 = 8;
pub const FRAME_BYTES: usize = (FRAME_WIDTH * FRAME_HEIGHT * 3) as usize;

/// Deterministic RGB content for the `index`-th frame (1-based). Every frame
/// differs from its neighbours.
pub fn frame_pixels(index: u32) -> Vec<u8> {
    sized_frame_pixels(index, FRAME_WIDTH, FRAME_HEIGHT)
}

/// [`frame_pixels`] for an arbitrary frame size.
pub fn sized_frame_pixels(index: u32, width: u32, height: u32) -> Vec<u8> {
    (0..(width * height * 3) as usize)
        .map(|offset| ((offset as u32 * 7 + index * 31) % 256) as u8)
        .collect()
}

/// Write `count` P6 images `input1.ppm ..= input<count>.ppm` into `directory`
/// and return the sequence pattern FFmpeg's image2 demuxer opens as a
/// single-video-stream container.
pub fn write_ppm_sequence(directory: &Path, count: u32) -> PathBuf {
    write_sized_ppm_sequence(directory, count, FRAME_WIDTH, FRAME_HEIGHT)
}

/// [`write_ppm_sequence`] for an arbitrary frame size.
pub fn write_sized_ppm_sequence(directory: &Path, count: u32, width: u32, height: u32) -> PathBuf {
    for index in 1..=count {
        let mut bytes = format!("P6\n{width} {height}\n255\n").into_bytes();
        bytes.extend(sized_frame_pixels(index, width, height));
        fs::write(directory.join(format!("input{index}.ppm")), bytes)
            .expect("Failed to write input frame");
    }
    directory.join("input%d.ppm")
}

/// Encode `count` frames of MPEG-2 video with B-frames into an MPEG program
/// stream. The decoder reorders such a stream, so it holds the last frame
/// back until it is flushed.
pub fn write_reordered_clip(path: &Path, count: u32) {
    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 48;
    const FPS: i32 = 25;

    ffmpeg_next::init().expect("Failed to initialise FFmpeg");
    let time_base = Rational::new(1, FPS);

    let mut output = ffmpeg_next::format::output(path).expect("Failed to create output");
    let codec = ffmpeg_next::encoder::find(Id::MPEG2VIDEO).expect("MPEG-2 encoder missing");
    let mut stream = output.add_stream(codec).expect("Failed to add stream");
    let stream_index = stream.index();

    let mut encoder = CodecContext::from_parameters(stream.parameters())
        .expect("Failed to create codec context")
        .encoder()
        .video()
        .expect("Failed to create video encoder");
    encoder.set_width(WIDTH);
    encoder.set_height(HEIGHT);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(time_base);
    encoder.set_frame_rate(Some(Rational::new(FPS, 1)));
    encoder.set_gop(6);
    encoder.set_max_b_frames(2);

    let mut encoder = encoder.open_as(codec).expect("Failed to open encoder");
    stream.set_parameters(&encoder);
    output.write_header().expect("Failed to write header");
    let stream_time_base = output
        .stream(stream_index)
        .expect("Stream vanished")
        .time_base();

    let mut packet = Packet::empty();
    for index in 0..count {
        let mut frame = VideoFrame::new(Pixel::YUV420P, WIDTH, HEIGHT);
        frame.data_mut(0).fill((40 + (index * 15) % 180) as u8);
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        frame.set_pts(Some(i64::from(index)));
        encoder.send_frame(&frame).expect("Failed to send frame");

        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(stream_index);
            packet.rescale_ts(time_base, stream_time_base);
            packet
                .write_interleaved(&mut output)
                .expect("Failed to write packet");
        }
    }

    encoder.send_eof().expect("Failed to flush encoder");
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(time_base, stream_time_base);
        packet
            .write_interleaved(&mut output)
            .expect("Failed to write flushed packet");
    }
    output.write_trailer().expect("Failed to write trailer");
}

/// Write a short 16-bit mono PCM WAV file: a container with an audio stream
/// and no video.
pub fn write_wav(path: &Path) {
    let sample_rate: u32 = 8_000;
    let samples: Vec<i16> = (0..800).map(|n| ((n % 40) as i16 - 20) * 500).collect();
    let data_len = (samples.len() * 2) as u32;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    fs::write(path, bytes).expect("Failed to write WAV file");
}

/// Files in `directory` whose name starts with `prefix`, sorted.
pub fn files_with_prefix(directory: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(directory)
        .expect("Failed to list output directory")
        .map(|entry| entry.expect("Failed to read entry").path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect();
    files.sort();
    files
}
