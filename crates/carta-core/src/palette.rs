//! Fixed color palettes used for indexed (8-bit) encoding.
//!
//! Building a palette from image content is not done here; a palette is
//! supplied by the caller as raw `rgb` or `rgba` bytes and consumed by the
//! PNG writer, which maps every pixel to its nearest entry.

use crate::{Color, Error, Result};

/// Maximum number of entries an indexed PNG can address.
pub const MAX_PALETTE_ENTRIES: usize = 256;

/// Byte layout of a raw palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteFormat {
    /// Four bytes per entry.
    #[default]
    Rgba,
    /// Three bytes per entry, all entries opaque.
    Rgb,
}

impl PaletteFormat {
    fn stride(self) -> usize {
        match self {
            Self::Rgba => 4,
            Self::Rgb => 3,
        }
    }
}

/// An immutable list of up to 256 colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<Color>,
}

impl Palette {
    /// Creates a palette from colors.
    ///
    /// # Errors
    ///
    /// Fails when `entries` is empty or longer than [`MAX_PALETTE_ENTRIES`].
    pub fn new(entries: Vec<Color>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::InvalidPalette("palette is empty".into()));
        }
        if entries.len() > MAX_PALETTE_ENTRIES {
            return Err(Error::InvalidPalette(format!(
                "{} entries exceed the maximum of {}",
                entries.len(),
                MAX_PALETTE_ENTRIES
            )));
        }
        Ok(Self { entries })
    }

    /// Parses raw palette bytes.
    ///
    /// ```rust
    /// use carta_core::{Palette, PaletteFormat};
    ///
    /// let p = Palette::from_bytes(&[255, 0, 0, 0, 0, 255], PaletteFormat::Rgb).unwrap();
    /// assert_eq!(p.len(), 2);
    /// ```
    pub fn from_bytes(bytes: &[u8], format: PaletteFormat) -> Result<Self> {
        let stride = format.stride();
        if bytes.len() % stride != 0 {
            return Err(Error::InvalidPalette(format!(
                "{} bytes is not a multiple of {}",
                bytes.len(),
                stride
            )));
        }
        let entries = bytes
            .chunks_exact(stride)
            .map(|c| match format {
                PaletteFormat::Rgba => Color::new(c[0], c[1], c[2], c[3]),
                PaletteFormat::Rgb => Color::rgb(c[0], c[1], c[2]),
            })
            .collect();
        Self::new(entries)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; palettes hold at least one entry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Palette entries in index order.
    #[inline]
    pub fn entries(&self) -> &[Color] {
        &self.entries
    }

    /// Returns `true` if any entry is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        self.entries.iter().any(|c| c.a != 255)
    }

    /// Index of the entry closest to `color` (squared RGBA distance).
    pub fn nearest(&self, color: Color) -> u8 {
        let dist = |e: &Color| {
            let d = |a: u8, b: u8| (a as i32 - b as i32).pow(2);
            d(e.r, color.r) + d(e.g, color.g) + d(e.b, color.b) + d(e.a, color.a)
        };
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| dist(e))
            .map(|(i, _)| i as u8)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_bytes() {
        assert!(Palette::from_bytes(&[1, 2, 3, 4, 5], PaletteFormat::Rgba).is_err());
        assert!(Palette::from_bytes(&[], PaletteFormat::Rgb).is_err());
    }

    #[test]
    fn rejects_oversized() {
        let colors = vec![Color::TRANSPARENT; MAX_PALETTE_ENTRIES + 1];
        assert!(Palette::new(colors).is_err());
    }

    #[test]
    fn nearest_entry() {
        let p = Palette::new(vec![
            Color::rgb(0, 0, 0),
            Color::rgb(255, 255, 255),
            Color::new(0, 0, 0, 0),
        ])
        .unwrap();
        assert_eq!(p.nearest(Color::rgb(10, 10, 10)), 0);
        assert_eq!(p.nearest(Color::rgb(200, 210, 220)), 1);
        assert_eq!(p.nearest(Color::new(5, 5, 5, 3)), 2);
        assert!(p.has_alpha());
    }
}
