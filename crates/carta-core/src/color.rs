//! 8-bit RGBA color values and the packed pixel word layout.
//!
//! Pixels are stored as `u32` words in little-endian RGBA order:
//!
//! ```text
//! byte 0 = red, byte 1 = green, byte 2 = blue, byte 3 = alpha
//! word   = 0xAABBGGRR
//! ```

use std::fmt;

/// An 8-bit straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    /// Creates a color from its four channels.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Packs the color into a `0xAABBGGRR` pixel word.
    ///
    /// ```rust
    /// use carta_core::Color;
    ///
    /// assert_eq!(Color::rgb(255, 0, 0).to_word(), 0xFF0000FF);
    /// ```
    #[inline]
    pub const fn to_word(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Unpacks a `0xAABBGGRR` pixel word.
    #[inline]
    pub const fn from_word(word: u32) -> Self {
        let [r, g, b, a] = word.to_le_bytes();
        Self { r, g, b, a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a as f32 / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_layout_is_little_endian_rgba() {
        let c = Color::new(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c.to_word(), 0x44332211);
        assert_eq!(Color::from_word(0x44332211), c);
    }

    #[test]
    fn display() {
        assert_eq!(Color::rgb(1, 2, 3).to_string(), "rgba(1,2,3,1.000)");
    }
}
