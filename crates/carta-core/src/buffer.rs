//! The 32-bit RGBA pixel buffer.
//!
//! [`RgbaBuffer`] is a rectangular array of packed `0xAABBGGRR` pixel words
//! stored row-major, top to bottom:
//!
//! ```text
//! Memory: [P(0,0) P(1,0) ... P(w-1,0)]  <- Row 0
//!         [P(0,1) P(1,1) ... P(w-1,1)]  <- Row 1
//!         ...
//! ```
//!
//! Besides pixel storage the buffer carries an optional background color
//! (used by [`RgbaBuffer::clear`]) and a `painted` flag that rendering code
//! sets once it has drawn anything.
//!
//! # Usage
//!
//! ```rust
//! use carta_core::{Color, RgbaBuffer};
//!
//! let mut img = RgbaBuffer::new(4, 4).unwrap();
//! img.set_background(Color::rgb(255, 255, 255));
//! img.clear();
//! assert_eq!(img.row(0), &[0xFFFFFFFF; 4]);
//! ```

use crate::{Color, Error, Result};
use rayon::prelude::*;

/// Rows per parallel work item for whole-buffer pixel passes.
const PAR_MIN_ROWS: usize = 16;

/// Width × height buffer of packed RGBA pixel words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    width: u32,
    height: u32,
    data: Vec<u32>,
    background: Option<Color>,
    painted: bool,
}

impl RgbaBuffer {
    /// Allocates a cleared (fully transparent) buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] when `width * height * 4`
    /// overflows or the allocator cannot reserve the memory.
    ///
    /// # Example
    ///
    /// ```rust
    /// use carta_core::RgbaBuffer;
    ///
    /// let img = RgbaBuffer::new(256, 128).unwrap();
    /// assert_eq!(img.width(), 256);
    /// assert_eq!(img.height(), 128);
    /// assert!(!img.painted());
    /// ```
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let count = Self::word_count(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(count)
            .map_err(|e| Error::allocation_failed(count * 4, e.to_string()))?;
        data.resize(count, 0);
        Ok(Self {
            width,
            height,
            data,
            background: None,
            painted: false,
        })
    }

    /// Adopts existing pixel words.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `data.len() != width * height`.
    pub fn from_words(width: u32, height: u32, data: Vec<u32>) -> Result<Self> {
        let expected = Self::word_count(width, height)?;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} pixels, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
            background: None,
            painted: false,
        })
    }

    fn word_count(width: u32, height: u32) -> Result<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .filter(|n| n.checked_mul(4).is_some_and(|b| b <= isize::MAX as usize))
            .ok_or_else(|| {
                Error::allocation_failed(usize::MAX, format!("{}x{} image is too large", width, height))
            })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `width * height * 4`, the size of the pixel storage in bytes.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.data.len() * 4
    }

    /// Returns `true` once rendering has touched the buffer.
    #[inline]
    pub fn painted(&self) -> bool {
        self.painted
    }

    /// Sets the painted flag. Called by rendering paths.
    #[inline]
    pub fn set_painted(&mut self, painted: bool) {
        self.painted = painted;
    }

    /// Background color used by [`clear`](Self::clear), if any.
    #[inline]
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Sets the background color. Pixels are not touched until the next clear.
    #[inline]
    pub fn set_background(&mut self, color: Color) {
        self.background = Some(color);
    }

    /// All pixel words, row-major.
    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// Mutable access to all pixel words.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    /// Returns row `y`: exactly `width` pixel words.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[u32] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }

    /// Mutable row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u32] {
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.data[start..start + w]
    }

    /// Pixel word at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Result<u32> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        Ok(self.data[y as usize * self.width as usize + x as usize])
    }

    /// Writes the pixel word at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, word: u32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        self.data[y as usize * self.width as usize + x as usize] = word;
        Ok(())
    }

    /// Pixel data as interleaved RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.data.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Resets every pixel to the background color, or transparent if unset.
    pub fn clear(&mut self) {
        let word = self.background.map_or(0, Color::to_word);
        self.data.fill(word);
    }

    /// Fills every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        self.data.fill(color.to_word());
    }

    /// Multiplies RGB by alpha, rounding to nearest.
    pub fn premultiply(&mut self) {
        self.for_each_pixel(premultiply_word);
    }

    /// Divides RGB by alpha, rounding to nearest; fully transparent pixels
    /// are left untouched.
    pub fn demultiply(&mut self) {
        self.for_each_pixel(demultiply_word);
    }

    /// Moves each pixel's luminance into its alpha channel, keeping RGB.
    pub fn set_grayscale_to_alpha(&mut self) {
        self.for_each_pixel(|word| (luminance(word) << 24) | (word & 0x00FF_FFFF));
    }

    /// Moves each pixel's luminance into its alpha channel and replaces RGB
    /// with `color`.
    ///
    /// ```rust
    /// use carta_core::{Color, RgbaBuffer};
    ///
    /// let mut img = RgbaBuffer::from_words(1, 1, vec![0xFFFFFFFF]).unwrap();
    /// img.set_grayscale_to_alpha_with(Color::rgb(255, 0, 0));
    /// assert_eq!(img.data(), &[0xFF0000FF]);
    /// ```
    pub fn set_grayscale_to_alpha_with(&mut self, color: Color) {
        let rgb = color.to_word() & 0x00FF_FFFF;
        for y in 0..self.height {
            for word in self.row_mut(y) {
                *word = (luminance(*word) << 24) | rgb;
            }
        }
    }

    fn for_each_pixel(&mut self, f: impl Fn(u32) -> u32 + Sync) {
        let w = (self.width as usize).max(1);
        self.data
            .par_chunks_mut(w)
            .with_min_len(PAR_MIN_ROWS)
            .for_each(|row| row.iter_mut().for_each(|p| *p = f(*p)));
    }
}

/// Truncated luminance `0.3R + 0.59G + 0.11B` of a pixel word.
///
/// Computed in integer arithmetic so the truncation is exact.
#[inline]
pub fn luminance(word: u32) -> u32 {
    let r = word & 0xff;
    let g = (word >> 8) & 0xff;
    let b = (word >> 16) & 0xff;
    (r * 30 + g * 59 + b * 11) / 100
}

#[inline]
fn premultiply_word(word: u32) -> u32 {
    let [r, g, b, a] = word.to_le_bytes();
    if a == 255 {
        return word;
    }
    let m = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
    u32::from_le_bytes([m(r), m(g), m(b), a])
}

#[inline]
fn demultiply_word(word: u32) -> u32 {
    let [r, g, b, a] = word.to_le_bytes();
    if a == 0 || a == 255 {
        return word;
    }
    let a32 = a as u32;
    let d = |c: u8| ((c as u32 * 255 + a32 / 2) / a32).min(255) as u8;
    u32::from_le_bytes([d(r), d(g), d(b), a])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_transparent_and_unpainted() {
        let img = RgbaBuffer::new(2, 2).unwrap();
        assert_eq!(img.data(), &[0u32; 4]);
        assert!(!img.painted());
        assert_eq!(img.background(), None);
    }

    #[test]
    fn zero_sized() {
        let img = RgbaBuffer::new(0, 7).unwrap();
        assert_eq!(img.width(), 0);
        assert_eq!(img.height(), 7);
        assert!(img.data().is_empty());
    }

    #[test]
    fn too_large_fails() {
        let err = RgbaBuffer::new(u32::MAX, u32::MAX).unwrap_err();
        assert!(err.is_allocation_error());
    }

    #[test]
    fn rows_have_width_words() {
        let img = RgbaBuffer::new(5, 3).unwrap();
        assert_eq!(img.byte_size(), 60);
        for y in 0..3 {
            assert_eq!(img.row(y).len(), 5);
        }
    }

    #[test]
    fn from_words_checks_length() {
        assert!(RgbaBuffer::from_words(2, 2, vec![0; 3]).is_err());
        assert!(RgbaBuffer::from_words(2, 2, vec![0; 4]).is_ok());
    }

    #[test]
    fn clear_uses_background() {
        let mut img = RgbaBuffer::from_words(2, 1, vec![0x12345678; 2]).unwrap();
        img.clear();
        assert_eq!(img.data(), &[0, 0]);
        img.set_background(Color::new(1, 2, 3, 4));
        img.clear();
        assert_eq!(img.data(), &[0x04030201, 0x04030201]);
    }

    #[test]
    fn premultiply_demultiply_within_one() {
        let mut words = Vec::new();
        for a in [255u8, 200, 128] {
            for c in (0..=255u8).step_by(7) {
                words.push(Color::new(c, 255 - c, c / 2, a).to_word());
            }
        }
        let original = words.clone();
        let mut img = RgbaBuffer::from_words(words.len() as u32, 1, words).unwrap();
        img.premultiply();
        img.demultiply();
        for (before, after) in original.iter().zip(img.data()) {
            let b = Color::from_word(*before);
            let a = Color::from_word(*after);
            assert_eq!(b.a, a.a);
            assert!((b.r as i32 - a.r as i32).abs() <= 1);
            assert!((b.g as i32 - a.g as i32).abs() <= 1);
            assert!((b.b as i32 - a.b as i32).abs() <= 1);
        }
    }

    #[test]
    fn premultiply_half_alpha() {
        let mut img = RgbaBuffer::from_words(1, 1, vec![Color::new(255, 100, 0, 128).to_word()]).unwrap();
        img.premultiply();
        assert_eq!(Color::from_word(img.data()[0]), Color::new(128, 50, 0, 128));
    }

    #[test]
    fn grayscale_to_alpha_keeps_rgb() {
        let mut img = RgbaBuffer::new(2, 2).unwrap();
        img.set_grayscale_to_alpha();
        assert_eq!(img.data(), &[0u32; 4]);

        let mut img = RgbaBuffer::from_words(1, 1, vec![Color::new(100, 50, 200, 7).to_word()]).unwrap();
        img.set_grayscale_to_alpha();
        // 0.3*100 + 0.59*50 + 0.11*200 = 81.5
        assert_eq!(Color::from_word(img.data()[0]), Color::new(100, 50, 200, 81));
    }

    #[test]
    fn grayscale_to_alpha_with_color() {
        let mut img = RgbaBuffer::from_words(2, 2, vec![0xFFFFFFFF; 4]).unwrap();
        img.set_grayscale_to_alpha_with(Color::rgb(255, 0, 0));
        assert_eq!(img.data(), &[0xFF0000FF; 4]);
    }

    #[test]
    fn luminance_truncates() {
        assert_eq!(luminance(0xFFFFFFFF), 255);
        assert_eq!(luminance(Color::rgb(1, 1, 1).to_word()), 1);
        assert_eq!(luminance(Color::rgb(3, 0, 0).to_word()), 0);
    }

    #[test]
    fn pixel_bounds() {
        let mut img = RgbaBuffer::new(2, 2).unwrap();
        img.set_pixel(1, 1, 42).unwrap();
        assert_eq!(img.pixel(1, 1).unwrap(), 42);
        assert!(img.pixel(2, 0).is_err());
        assert!(img.set_pixel(0, 2, 1).is_err());
    }
}
