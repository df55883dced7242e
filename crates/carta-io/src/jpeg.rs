//! JPEG format support.
//!
//! Decoded JPEGs are always opaque; encoding drops the alpha channel.

use crate::traits::DecodedReader;
use crate::{IoError, IoResult};
use carta_core::RgbaBuffer;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Quality used when the format string carries none.
pub const DEFAULT_QUALITY: u8 = 85;

/// Opens and decodes a JPEG file.
pub(crate) fn open<P: AsRef<Path>>(path: P) -> IoResult<DecodedReader> {
    let file = File::open(path.as_ref())?;
    decode(file)
}

/// Decodes JPEG bytes.
pub(crate) fn open_bytes(bytes: &[u8]) -> IoResult<DecodedReader> {
    decode(bytes)
}

fn decode<R: Read>(input: R) -> IoResult<DecodedReader> {
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(input));
    let pixels = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

    let rgba: Vec<u8> = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        // 16-bit grayscale, high byte first
        jpeg_decoder::PixelFormat::L16 => pixels
            .chunks_exact(2)
            .flat_map(|l| [l[0], l[0], l[0], 255])
            .collect(),
        jpeg_decoder::PixelFormat::CMYK32 => pixels
            .chunks_exact(4)
            .flat_map(|cmyk| {
                let k = 1.0 - cmyk[3] as f32 / 255.0;
                let ch = |v: u8| ((1.0 - v as f32 / 255.0) * k * 255.0) as u8;
                [ch(cmyk[0]), ch(cmyk[1]), ch(cmyk[2]), 255]
            })
            .collect(),
    };

    tracing::trace!(width = info.width, height = info.height, format = ?info.pixel_format, "decoded jpeg");
    Ok(DecodedReader::new(info.width as u32, info.height as u32, rgba))
}

/// Encodes a buffer as baseline JPEG at `quality` (1-100).
pub fn encode(buffer: &RgbaBuffer, quality: u8) -> IoResult<Vec<u8>> {
    use jpeg_encoder::{ColorType, Encoder};

    let too_big = |v: u32| v > u16::MAX as u32;
    if too_big(buffer.width()) || too_big(buffer.height()) {
        return Err(IoError::EncodeError(format!(
            "{}x{} exceeds the JPEG size limit",
            buffer.width(),
            buffer.height()
        )));
    }

    let mut out = Vec::new();
    let encoder = Encoder::new(&mut out, quality.clamp(1, 100));
    encoder
        .encode(
            &buffer.to_rgba8(),
            buffer.width() as u16,
            buffer.height() as u16,
            ColorType::Rgba,
        )
        .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
    Ok(out)
}
