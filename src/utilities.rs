//! Internal helpers shared by the conversion and decode stages.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of `frame` into a tightly packed buffer.
///
/// FFmpeg rows are padded to an alignment boundary (stride ≥ width × bpp);
/// `destination` receives exactly `row_bytes` per row, top row first.
/// `destination.len()` must equal `row_bytes * rows`.
pub(crate) fn copy_packed_rows(
    frame: &VideoFrame,
    row_bytes: usize,
    rows: usize,
    destination: &mut [u8],
) {
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        destination.copy_from_slice(&data[..row_bytes * rows]);
        return;
    }

    for (row, chunk) in destination.chunks_exact_mut(row_bytes).take(rows).enumerate() {
        let start = row * stride;
        chunk.copy_from_slice(&data[start..start + row_bytes]);
    }
}

/// Rescale a PTS value from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64
}
