//! # carta-io
//!
//! Image codecs for the carta runtime.
//!
//! This crate turns files and byte strings into [`RgbaBuffer`]s and back:
//!
//! - **PNG** - every color type on read; RGBA, RGB and indexed on write
//! - **JPEG** - gray, RGB and CMYK on read; baseline RGB on write
//!
//! # Reading
//!
//! Readers are created from a path plus a format name, or from raw bytes
//! (format detected from the magic number). A reader knows its geometry
//! before any pixels are copied:
//!
//! ```rust,ignore
//! use carta_io::{get_image_reader, type_from_filename};
//! use carta_core::RgbaBuffer;
//!
//! let format = type_from_filename("tile.png").unwrap();
//! let mut reader = get_image_reader("tile.png", format)?;
//! let mut buffer = RgbaBuffer::new(reader.width(), reader.height())?;
//! reader.read(0, 0, &mut buffer)?;
//! ```
//!
//! # Writing
//!
//! Writers are chosen by format string, see [`OutputFormat`]:
//!
//! ```rust,ignore
//! use carta_io::{save_to_file, save_to_string};
//!
//! let bytes = save_to_string(&buffer, "png", None)?;
//! save_to_file(&buffer, "out.jpg", "jpeg80", None)?;
//! ```
//!
//! # Feature Flags
//!
//! - `png` - PNG support (default)
//! - `jpeg` - JPEG support (default)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod detect;
mod error;
mod traits;
mod writer;

#[cfg(feature = "png")]
pub mod png;

#[cfg(feature = "jpeg")]
pub mod jpeg;

pub use detect::{guess_type, type_from_filename, Format, UNKNOWN_TYPE};
pub use error::{IoError, IoResult};
pub use traits::ImageReader;
pub use writer::OutputFormat;

use carta_core::{Palette, RgbaBuffer};
use std::path::Path;

/// Encodes a buffer to bytes using a format string.
///
/// The palette, when given, forces indexed output for PNG formats and is
/// ignored by JPEG.
pub fn save_to_string(buffer: &RgbaBuffer, format: &str, palette: Option<&Palette>) -> IoResult<Vec<u8>> {
    let output = OutputFormat::parse(format)?;
    tracing::debug!(
        format,
        width = buffer.width(),
        height = buffer.height(),
        indexed = palette.is_some(),
        "encoding"
    );

    match output {
        #[cfg(feature = "png")]
        OutputFormat::Png(variant) => png::encode(buffer, variant, palette),
        #[cfg(feature = "jpeg")]
        OutputFormat::Jpeg { quality } => jpeg::encode(buffer, quality),
    }
}

/// Encodes a buffer and writes the result to `path`.
///
/// Nothing is written when encoding fails.
pub fn save_to_file<P: AsRef<Path>>(
    buffer: &RgbaBuffer,
    path: P,
    format: &str,
    palette: Option<&Palette>,
) -> IoResult<()> {
    let bytes = save_to_string(buffer, format, palette)?;
    std::fs::write(path.as_ref(), bytes)?;
    tracing::debug!(path = %path.as_ref().display(), format, "saved");
    Ok(())
}

/// Opens a reader for `path` using the named format.
///
/// `format` is a name as returned by [`type_from_filename`]; the file's
/// contents are decoded eagerly.
pub fn get_image_reader<P: AsRef<Path>>(path: P, format: &str) -> IoResult<Box<dyn ImageReader>> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), format, "opening reader");

    match Format::from_name(format) {
        #[cfg(feature = "png")]
        Format::Png => Ok(Box::new(png::open(path)?)),
        #[cfg(feature = "jpeg")]
        Format::Jpeg => Ok(Box::new(jpeg::open(path)?)),
        _ => Err(IoError::UnsupportedFormat(format.to_string())),
    }
}

/// Opens a reader over encoded bytes, detecting the format from the magic
/// number.
pub fn get_image_reader_from_bytes(bytes: &[u8]) -> IoResult<Box<dyn ImageReader>> {
    let format = Format::from_bytes(bytes);
    tracing::debug!(len = bytes.len(), format = format.name(), "opening reader from bytes");

    match format {
        #[cfg(feature = "png")]
        Format::Png => Ok(Box::new(png::open_bytes(bytes)?)),
        #[cfg(feature = "jpeg")]
        Format::Jpeg => Ok(Box::new(jpeg::open_bytes(bytes)?)),
        other => Err(IoError::UnsupportedFormat(other.name().to_string())),
    }
}
