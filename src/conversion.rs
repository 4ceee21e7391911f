//! Pixel-format conversion to packed RGB.
//!
//! [`ColorConverter`] wraps an FFmpeg software scaling context that turns
//! decoded frames of any native layout into packed 8-bit RGB.
//! [`ConvertedImage`] is the contiguous destination buffer; it is allocated
//! once per run and overwritten for every frame.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{decoder::FrameDecoder, error::FrameGrabError, utilities::copy_packed_rows};

/// Pixel format of every converted image.
pub const OUTPUT_PIXEL_FORMAT: Pixel = Pixel::RGB24;

/// Bytes per pixel of [`OUTPUT_PIXEL_FORMAT`].
pub const BYTES_PER_PIXEL: usize = 3;

/// A packed RGB image: `width * height * 3` bytes, row-major, top row first,
/// no padding.
#[derive(Clone)]
#[must_use]
pub struct ConvertedImage {
    image: RgbImage,
}

impl Debug for ConvertedImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ConvertedImage")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish_non_exhaustive()
    }
}

impl ConvertedImage {
    /// Allocate a zeroed buffer for a `width` × `height` image.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::Allocation`] if the size overflows or the
    /// memory cannot be reserved.
    pub fn allocate(width: u32, height: u32) -> Result<Self, FrameGrabError> {
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| FrameGrabError::Allocation {
                bytes: 0,
                reason: format!("{width}x{height} image size overflows"),
            })?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(bytes)
            .map_err(|error| FrameGrabError::Allocation {
                bytes,
                reason: error.to_string(),
            })?;
        buffer.resize(bytes, 0);

        let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            FrameGrabError::Allocation {
                bytes,
                reason: "buffer does not match image dimensions".to_string(),
            }
        })?;

        Ok(Self { image })
    }

    /// Wrap already packed RGB bytes.
    ///
    /// Returns `None` if `pixels.len() != width * height * 3`.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, pixels).map(|image| Self { image })
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The raw RGB bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Borrow as an [`image::RgbImage`].
    pub fn as_rgb_image(&self) -> &RgbImage {
        &self.image
    }

    /// Bytes in one row.
    pub fn row_bytes(&self) -> usize {
        self.image.width() as usize * BYTES_PER_PIXEL
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }
}

/// Converts decoded frames to [`OUTPUT_PIXEL_FORMAT`].
///
/// Conversion is deterministic for a given context. The source frame is
/// only borrowed for the duration of [`convert`](ColorConverter::convert).
pub struct ColorConverter {
    scaler: ScalingContext,
    staging: VideoFrame,
    source_width: u32,
    source_height: u32,
    source_format: Pixel,
    output_width: u32,
    output_height: u32,
}

impl Debug for ColorConverter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ColorConverter")
            .field("source_width", &self.source_width)
            .field("source_height", &self.source_height)
            .field("source_format", &self.source_format)
            .field("output_width", &self.output_width)
            .field("output_height", &self.output_height)
            .finish_non_exhaustive()
    }
}

impl ColorConverter {
    /// Build a conversion context.
    ///
    /// The underlying transform can also resize; the extraction pipeline
    /// always passes identical source and output dimensions.
    ///
    /// # Errors
    ///
    /// - [`FrameGrabError::ConverterSetup`] if the source format is unknown
    ///   or FFmpeg cannot build the context.
    /// - [`FrameGrabError::Allocation`] if the staging frame cannot be
    ///   allocated.
    pub fn new(
        source_width: u32,
        source_height: u32,
        source_format: Pixel,
        output_width: u32,
        output_height: u32,
    ) -> Result<Self, FrameGrabError> {
        if source_format == Pixel::None {
            return Err(FrameGrabError::ConverterSetup(
                "source pixel format is unknown".to_string(),
            ));
        }
        if source_width == 0 || source_height == 0 || output_width == 0 || output_height == 0 {
            return Err(FrameGrabError::ConverterSetup(format!(
                "invalid dimensions {source_width}x{source_height} -> {output_width}x{output_height}"
            )));
        }

        let scaler = ScalingContext::get(
            source_format,
            source_width,
            source_height,
            OUTPUT_PIXEL_FORMAT,
            output_width,
            output_height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| {
            FrameGrabError::ConverterSetup(format!(
                "{source_format:?} {source_width}x{source_height} -> RGB24: {error}"
            ))
        })?;

        let staging = VideoFrame::new(OUTPUT_PIXEL_FORMAT, output_width, output_height);
        if staging.planes() == 0 {
            return Err(FrameGrabError::Allocation {
                bytes: output_width as usize * output_height as usize * BYTES_PER_PIXEL,
                reason: "FFmpeg could not allocate the staging frame".to_string(),
            });
        }

        Ok(Self {
            scaler,
            staging,
            source_width,
            source_height,
            source_format,
            output_width,
            output_height,
        })
    }

    /// Build a non-resizing converter for the frames `decoder` produces.
    ///
    /// # Errors
    ///
    /// See [`new`](ColorConverter::new).
    pub fn for_decoder(decoder: &FrameDecoder) -> Result<Self, FrameGrabError> {
        Self::new(
            decoder.width(),
            decoder.height(),
            decoder.format(),
            decoder.width(),
            decoder.height(),
        )
    }

    /// Allocate an output buffer that fits this converter.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::Allocation`] on failure.
    pub fn allocate_output(&self) -> Result<ConvertedImage, FrameGrabError> {
        ConvertedImage::allocate(self.output_width, self.output_height)
    }

    /// Convert `frame` into `output`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameGrabError::Conversion`] if the frame's format or size
    /// differs from the one the context was built for, or if `output` has
    /// the wrong dimensions.
    pub fn convert(
        &mut self,
        frame: &VideoFrame,
        output: &mut ConvertedImage,
    ) -> Result<(), FrameGrabError> {
        if output.width() != self.output_width || output.height() != self.output_height {
            return Err(FrameGrabError::Conversion(format!(
                "output buffer is {}x{}, converter produces {}x{}",
                output.width(),
                output.height(),
                self.output_width,
                self.output_height,
            )));
        }

        self.scaler.run(frame, &mut self.staging).map_err(|error| {
            FrameGrabError::Conversion(format!(
                "{:?} {}x{} frame: {error}",
                frame.format(),
                frame.width(),
                frame.height(),
            ))
        })?;

        let row_bytes = output.row_bytes();
        let rows = output.height() as usize;
        copy_packed_rows(&self.staging, row_bytes, rows, output.pixels_mut());
        Ok(())
    }

    /// Source pixel format this context accepts.
    pub fn source_format(&self) -> Pixel {
        self.source_format
    }

    /// Output dimensions as `(width, height)`.
    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }
}
