//! Serialising converted frames to disk.
//!
//! The default output is binary PPM: the ASCII header
//! `"P6\n<width> <height>\n255\n"` followed by exactly `width * height * 3`
//! bytes of RGB data, row-major, top row first, no padding and nothing
//! after the last row.

use std::{
    fs::{self, File},
    io::{BufWriter, Error as IoError, Write},
    path::Path,
};

use image::{ImageError, ImageFormat as EncodedFormat};

use crate::{configuration::ImageFormat, conversion::ConvertedImage, error::FrameGrabError};

/// Maximum sample value written into PPM headers.
pub const PPM_MAX_VALUE: u32 = 255;

/// The P6 header for a `width` × `height` image.
pub fn ppm_header(width: u32, height: u32) -> String {
    format!("P6\n{width} {height}\n{PPM_MAX_VALUE}\n")
}

/// Write `image` as P6 to any byte sink.
///
/// # Errors
///
/// Propagates any I/O error from `sink`.
pub fn write_ppm<W: Write>(image: &ConvertedImage, sink: &mut W) -> Result<(), IoError> {
    sink.write_all(ppm_header(image.width(), image.height()).as_bytes())?;
    sink.write_all(image.as_bytes())?;
    Ok(())
}

/// Writes converted frames to files, one file per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameWriter {
    format: ImageFormat,
}

impl FrameWriter {
    /// A writer producing files in `format`.
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }

    /// Output encoding.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Write `image` to `path`. `frame_number` is only used for error
    /// context. A partially written file is removed again.
    ///
    /// # Errors
    ///
    /// - [`FrameGrabError::Write`] if the file cannot be created or written.
    /// - [`FrameGrabError::ImageEncode`] if PNG encoding itself fails.
    pub fn write(
        &self,
        image: &ConvertedImage,
        path: &Path,
        frame_number: u64,
    ) -> Result<(), FrameGrabError> {
        let write_error = |source: IoError| FrameGrabError::Write {
            frame_number,
            path: path.to_path_buf(),
            source,
        };

        match self.format {
            ImageFormat::Ppm => {
                let file = File::create(path).map_err(write_error)?;
                let mut sink = BufWriter::new(file);
                let result = write_ppm(image, &mut sink).and_then(|()| sink.flush());
                if let Err(error) = result {
                    drop(sink);
                    let _ = fs::remove_file(path);
                    return Err(write_error(error));
                }
            }
            ImageFormat::Png => {
                let result = image
                    .as_rgb_image()
                    .save_with_format(path, EncodedFormat::Png);
                if let Err(error) = result {
                    let _ = fs::remove_file(path);
                    return Err(match error {
                        ImageError::IoError(source) => write_error(source),
                        other => FrameGrabError::ImageEncode(other),
                    });
                }
            }
        }

        log::info!("Wrote frame {frame_number} to {}", path.display());
        Ok(())
    }
}
