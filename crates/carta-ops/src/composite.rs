//! Compositing of one RGBA buffer onto another.
//!
//! Pixels are treated as premultiplied. Each source pixel is scaled by the
//! requested opacity and combined with the destination pixel under it using
//! one of the [`CompositeMode`]s:
//!
//! - Porter-Duff operators (`clear` through `xor`)
//! - arithmetic operators (`plus`, `minus`)
//! - separable blend modes (`multiply` through `exclusion`), which follow
//!   `Da' = Sa + Da - Sa·Da` and
//!   `Dca' = Sca·(1 - Da) + Dca·(1 - Sa) + Sa·Da·B(Sca/Sa, Dca/Da)`
//!
//! # Example
//!
//! ```rust
//! use carta_core::{Color, RgbaBuffer};
//! use carta_ops::{composite, CompositeMode};
//!
//! let mut dst = RgbaBuffer::new(4, 4).unwrap();
//! let mut src = RgbaBuffer::new(2, 2).unwrap();
//! src.fill(Color::new(255, 0, 0, 255));
//!
//! composite(&mut dst, &src, CompositeMode::SrcOver, 1.0, 1, 1).unwrap();
//! assert_eq!(dst.pixel(1, 1).unwrap(), 0xFF0000FF);
//! assert_eq!(dst.pixel(0, 0).unwrap(), 0);
//! ```

use crate::{OpsError, OpsResult};
use carta_core::RgbaBuffer;
use rayon::prelude::*;
use tracing::debug;

/// Composite operator.
///
/// Discriminants are the integer values accepted by `comp_op` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompositeMode {
    /// Clears the covered area.
    Clear = 0,
    /// Source replaces destination.
    Src = 1,
    /// Destination is kept.
    Dst = 2,
    /// Source over destination.
    #[default]
    SrcOver = 3,
    /// Destination over source.
    DstOver = 4,
    /// Source inside destination.
    SrcIn = 5,
    /// Destination inside source.
    DstIn = 6,
    /// Source outside destination.
    SrcOut = 7,
    /// Destination outside source.
    DstOut = 8,
    /// Source atop destination.
    SrcAtop = 9,
    /// Destination atop source.
    DstAtop = 10,
    /// Source or destination, but not both.
    Xor = 11,
    /// Saturating sum.
    Plus = 12,
    /// Destination minus source.
    Minus = 13,
    /// Multiply.
    Multiply = 14,
    /// Screen.
    Screen = 15,
    /// Overlay.
    Overlay = 16,
    /// Darken.
    Darken = 17,
    /// Lighten.
    Lighten = 18,
    /// Color dodge.
    ColorDodge = 19,
    /// Color burn.
    ColorBurn = 20,
    /// Hard light.
    HardLight = 21,
    /// Soft light.
    SoftLight = 22,
    /// Difference.
    Difference = 23,
    /// Exclusion.
    Exclusion = 24,
}

impl CompositeMode {
    /// Every mode, ordered by value.
    pub const ALL: [CompositeMode; 25] = [
        Self::Clear,
        Self::Src,
        Self::Dst,
        Self::SrcOver,
        Self::DstOver,
        Self::SrcIn,
        Self::DstIn,
        Self::SrcOut,
        Self::DstOut,
        Self::SrcAtop,
        Self::DstAtop,
        Self::Xor,
        Self::Plus,
        Self::Minus,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::HardLight,
        Self::SoftLight,
        Self::Difference,
        Self::Exclusion,
    ];

    /// Mode for an integer value, if one exists.
    ///
    /// ```rust
    /// use carta_ops::CompositeMode;
    ///
    /// assert_eq!(CompositeMode::from_value(3), Some(CompositeMode::SrcOver));
    /// assert_eq!(CompositeMode::from_value(99), None);
    /// ```
    pub fn from_value(value: i64) -> Option<Self> {
        usize::try_from(value).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Mode for a snake_case name such as `"src_over"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Integer value of this mode.
    pub fn value(self) -> i64 {
        self as u8 as i64
    }

    /// snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Src => "src",
            Self::Dst => "dst",
            Self::SrcOver => "src_over",
            Self::DstOver => "dst_over",
            Self::SrcIn => "src_in",
            Self::DstIn => "dst_in",
            Self::SrcOut => "src_out",
            Self::DstOut => "dst_out",
            Self::SrcAtop => "src_atop",
            Self::DstAtop => "dst_atop",
            Self::Xor => "xor",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::ColorDodge => "color_dodge",
            Self::ColorBurn => "color_burn",
            Self::HardLight => "hard_light",
            Self::SoftLight => "soft_light",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
        }
    }
}

impl TryFrom<i64> for CompositeMode {
    type Error = OpsError;

    fn try_from(value: i64) -> OpsResult<Self> {
        Self::from_value(value).ok_or(OpsError::InvalidMode(value))
    }
}

/// Unpacks a pixel word to normalized `[r, g, b, a]`.
#[inline]
pub fn unpack(word: u32) -> [f32; 4] {
    word.to_le_bytes().map(|c| c as f32 / 255.0)
}

/// Packs normalized `[r, g, b, a]` to a pixel word, rounding and clamping.
#[inline]
pub fn pack(px: [f32; 4]) -> u32 {
    u32::from_le_bytes(px.map(|c| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8))
}

/// Separable blend function `B(cs, cb)` on non-premultiplied channels.
#[inline]
fn blend_channel(mode: CompositeMode, cs: f32, cb: f32) -> f32 {
    let multiply = |a: f32, b: f32| a * b;
    let screen = |a: f32, b: f32| a + b - a * b;
    let hard_light = |cs: f32, cb: f32| {
        if cs <= 0.5 {
            multiply(cb, 2.0 * cs)
        } else {
            screen(cb, 2.0 * cs - 1.0)
        }
    };

    match mode {
        CompositeMode::Multiply => multiply(cs, cb),
        CompositeMode::Screen => screen(cs, cb),
        CompositeMode::Overlay => hard_light(cb, cs),
        CompositeMode::Darken => cs.min(cb),
        CompositeMode::Lighten => cs.max(cb),
        CompositeMode::ColorDodge => {
            if cb <= 0.0 {
                0.0
            } else if cs >= 1.0 {
                1.0
            } else {
                (cb / (1.0 - cs)).min(1.0)
            }
        }
        CompositeMode::ColorBurn => {
            if cb >= 1.0 {
                1.0
            } else if cs <= 0.0 {
                0.0
            } else {
                1.0 - ((1.0 - cb) / cs).min(1.0)
            }
        }
        CompositeMode::HardLight => hard_light(cs, cb),
        CompositeMode::SoftLight => {
            if cs <= 0.5 {
                cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
            } else {
                let d = if cb <= 0.25 {
                    ((16.0 * cb - 12.0) * cb + 4.0) * cb
                } else {
                    cb.sqrt()
                };
                cb + (2.0 * cs - 1.0) * (d - cb)
            }
        }
        CompositeMode::Difference => (cs - cb).abs(),
        CompositeMode::Exclusion => cs + cb - 2.0 * cs * cb,
        _ => cs,
    }
}

/// Combines one premultiplied source pixel with one premultiplied
/// destination pixel.
///
/// ```rust
/// use carta_ops::{composite_pixel, CompositeMode};
///
/// let s = [0.5, 0.0, 0.0, 0.5];
/// let d = [0.0, 0.0, 1.0, 1.0];
/// let out = composite_pixel(s, d, CompositeMode::SrcOver);
/// assert_eq!(out, [0.5, 0.0, 0.5, 1.0]);
/// ```
#[inline]
pub fn composite_pixel(s: [f32; 4], d: [f32; 4], mode: CompositeMode) -> [f32; 4] {
    let (sa, da) = (s[3], d[3]);
    let lerp = |fs: f32, fd: f32| -> [f32; 4] { std::array::from_fn(|i| s[i] * fs + d[i] * fd) };

    match mode {
        CompositeMode::Clear => [0.0; 4],
        CompositeMode::Src => s,
        CompositeMode::Dst => d,
        CompositeMode::SrcOver => lerp(1.0, 1.0 - sa),
        CompositeMode::DstOver => lerp(1.0 - da, 1.0),
        CompositeMode::SrcIn => lerp(da, 0.0),
        CompositeMode::DstIn => lerp(0.0, sa),
        CompositeMode::SrcOut => lerp(1.0 - da, 0.0),
        CompositeMode::DstOut => lerp(0.0, 1.0 - sa),
        CompositeMode::SrcAtop => {
            let mut out = lerp(da, 1.0 - sa);
            out[3] = da;
            out
        }
        CompositeMode::DstAtop => {
            let mut out = lerp(1.0 - da, sa);
            out[3] = sa;
            out
        }
        CompositeMode::Xor => lerp(1.0 - da, 1.0 - sa),
        CompositeMode::Plus => std::array::from_fn(|i| (s[i] + d[i]).min(1.0)),
        CompositeMode::Minus => {
            let mut out: [f32; 4] = std::array::from_fn(|i| (d[i] - s[i]).max(0.0));
            out[3] = sa + da - sa * da;
            out
        }
        blend => {
            let sada = sa * da;
            let mut out = [0.0; 4];
            for i in 0..3 {
                let cs = if sa > 0.0 { s[i] / sa } else { 0.0 };
                let cb = if da > 0.0 { d[i] / da } else { 0.0 };
                out[i] = s[i] * (1.0 - da) + d[i] * (1.0 - sa) + sada * blend_channel(blend, cs, cb);
            }
            out[3] = sa + da - sada;
            out
        }
    }
}

/// Composites `src` onto `dst` with its top-left corner at `(dx, dy)`.
///
/// Only the overlap of the placed source with the destination is touched.
/// `opacity` scales every source channel. It is clamped to `[0, 1]` and NaN
/// counts as zero.
pub fn composite(
    dst: &mut RgbaBuffer,
    src: &RgbaBuffer,
    mode: CompositeMode,
    opacity: f32,
    dx: i32,
    dy: i32,
) -> OpsResult<()> {
    let opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };

    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let (dx, dy) = (dx as i64, dy as i64);

    let x0 = dx.max(0);
    let x1 = (dx + sw).min(dw);
    let y0 = dy.max(0);
    let y1 = (dy + sh).min(dh);

    debug!(
        mode = mode.name(),
        opacity,
        dx,
        dy,
        overlap_w = (x1 - x0).max(0),
        overlap_h = (y1 - y0).max(0),
        "composite"
    );

    if x0 >= x1 || y0 >= y1 || mode == CompositeMode::Dst {
        return Ok(());
    }

    let cols = (x0 as usize)..(x1 as usize);
    let src_x0 = (x0 - dx) as usize;

    dst.data_mut()
        .par_chunks_mut(dw as usize)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(y, row)| {
            let src_row = src.row((y as i64 - dy) as u32);
            let src_px = &src_row[src_x0..src_x0 + cols.len()];
            for (d, &s) in row[cols.clone()].iter_mut().zip(src_px) {
                if s == 0 && mode == CompositeMode::SrcOver {
                    continue;
                }
                let s = unpack(s).map(|c| c * opacity);
                *d = pack(composite_pixel(s, unpack(*d), mode));
            }
        });

    Ok(())
}
