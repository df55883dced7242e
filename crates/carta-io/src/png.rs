//! PNG format support.
//!
//! Reading expands every PNG color type and bit depth to 8-bit RGBA.
//! Writing supports RGBA (`png`, `png32`), RGB (`png24`) and palette-indexed
//! output (`png8`, or any PNG variant when a [`Palette`] is supplied).

use crate::traits::DecodedReader;
use crate::{IoError, IoResult};
use carta_core::{Color, Palette, RgbaBuffer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

/// PNG pixel layout to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngVariant {
    /// 8-bit RGBA.
    Rgba,
    /// 8-bit RGB, alpha dropped.
    Rgb,
    /// 8-bit palette indices.
    Indexed,
}

/// Opens and decodes a PNG file.
pub(crate) fn open<P: AsRef<Path>>(path: P) -> IoResult<DecodedReader> {
    let file = File::open(path.as_ref())?;
    decode(BufReader::new(file))
}

/// Decodes PNG bytes.
pub(crate) fn open_bytes(bytes: &[u8]) -> IoResult<DecodedReader> {
    decode(Cursor::new(bytes))
}

fn decode<R: BufRead + Seek>(input: R) -> IoResult<DecodedReader> {
    let mut decoder = png::Decoder::new(input);
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let samples = match info.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => {
            return Err(IoError::DecodeError("palette was not expanded".into()));
        }
    };
    // 16-bit samples are big-endian; keep the high byte.
    let sample_bytes = match info.bit_depth {
        png::BitDepth::Eight => 1,
        png::BitDepth::Sixteen => 2,
        depth => {
            return Err(IoError::DecodeError(format!("unexpected bit depth {:?}", depth)));
        }
    };

    let data = &buf[..info.buffer_size()];
    let rgba = data
        .chunks_exact(samples * sample_bytes)
        .flat_map(|px| {
            let s = |i: usize| px[i * sample_bytes];
            match samples {
                1 => [s(0), s(0), s(0), 255],
                2 => [s(0), s(0), s(0), s(1)],
                3 => [s(0), s(1), s(2), 255],
                _ => [s(0), s(1), s(2), s(3)],
            }
        })
        .collect();

    tracing::trace!(width = info.width, height = info.height, color_type = ?info.color_type, "decoded png");
    Ok(DecodedReader::new(info.width, info.height, rgba))
}

/// Encodes a buffer as PNG.
///
/// A palette forces indexed output; [`PngVariant::Indexed`] without a
/// palette is rejected because palette construction is not performed here.
pub fn encode(buffer: &RgbaBuffer, variant: PngVariant, palette: Option<&Palette>) -> IoResult<Vec<u8>> {
    match (variant, palette) {
        (_, Some(palette)) => encode_indexed(buffer, palette),
        (PngVariant::Indexed, None) => Err(IoError::EncodeError(
            "indexed png output requires a palette".into(),
        )),
        (PngVariant::Rgba, None) => {
            write_png(buffer, png::ColorType::Rgba, &buffer.to_rgba8(), None)
        }
        (PngVariant::Rgb, None) => {
            let rgb: Vec<u8> = buffer
                .data()
                .iter()
                .flat_map(|w| {
                    let [r, g, b, _] = w.to_le_bytes();
                    [r, g, b]
                })
                .collect();
            write_png(buffer, png::ColorType::Rgb, &rgb, None)
        }
    }
}

fn encode_indexed(buffer: &RgbaBuffer, palette: &Palette) -> IoResult<Vec<u8>> {
    let mut cache: HashMap<u32, u8> = HashMap::new();
    let indices: Vec<u8> = buffer
        .data()
        .iter()
        .map(|&w| *cache.entry(w).or_insert_with(|| palette.nearest(Color::from_word(w))))
        .collect();
    write_png(buffer, png::ColorType::Indexed, &indices, Some(palette))
}

fn write_png(
    buffer: &RgbaBuffer,
    color_type: png::ColorType,
    data: &[u8],
    palette: Option<&Palette>,
) -> IoResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, buffer.width(), buffer.height());
        encoder.set_color(color_type);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::default());

        if let Some(palette) = palette {
            let plte: Vec<u8> = palette
                .entries()
                .iter()
                .flat_map(|c| [c.r, c.g, c.b])
                .collect();
            encoder.set_palette(plte);
            if palette.has_alpha() {
                let trns: Vec<u8> = palette.entries().iter().map(|c| c.a).collect();
                encoder.set_trns(trns);
            }
        }

        let mut writer = encoder
            .write_header()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        writer
            .write_image_data(data)
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
    }
    Ok(out)
}
