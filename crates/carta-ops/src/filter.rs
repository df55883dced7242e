//! Image filters and the `image_filters` list syntax.
//!
//! A filter list is a sequence of filter names separated by whitespace or
//! commas. `agg-stack-blur` optionally takes one or two radii:
//!
//! ```text
//! blur sharpen, agg-stack-blur(2,4) invert
//! ```
//!
//! | Name | Effect |
//! |------|--------|
//! | `blur` | 3×3 gaussian |
//! | `emboss` | 3×3 emboss |
//! | `sharpen` | 3×3 sharpen |
//! | `edge-detect` | 3×3 laplacian |
//! | `sobel` | sobel gradient magnitude |
//! | `gray` | luminance in every color channel |
//! | `x-gradient`, `y-gradient` | central differences |
//! | `invert` | color inversion, alpha kept |
//! | `agg-stack-blur(rx[,ry])` | separable box blur with radii `rx`, `ry` |
//!
//! Filters operate on premultiplied pixels; color results are clamped to
//! the pixel's alpha.
//!
//! # Example
//!
//! ```rust
//! use carta_core::RgbaBuffer;
//! use carta_ops::{apply_filters, parse_image_filters};
//!
//! let filters = parse_image_filters("gray, agg-stack-blur(1)").unwrap();
//! let mut img = RgbaBuffer::new(8, 8).unwrap();
//! apply_filters(&mut img, &filters).unwrap();
//! ```

use crate::{OpsError, OpsResult};
use carta_core::{luminance, RgbaBuffer};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Largest radius accepted by `agg-stack-blur`.
pub const MAX_BLUR_RADIUS: u32 = 254;

/// One parsed filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    /// 3×3 gaussian blur.
    Blur,
    /// Emboss.
    Emboss,
    /// Sharpen.
    Sharpen,
    /// Laplacian edge detection.
    EdgeDetect,
    /// Sobel gradient magnitude.
    Sobel,
    /// Grayscale.
    Gray,
    /// Horizontal gradient.
    XGradient,
    /// Vertical gradient.
    YGradient,
    /// Color inversion.
    Invert,
    /// Box blur with separate horizontal and vertical radii.
    StackBlur {
        /// Horizontal radius.
        rx: u32,
        /// Vertical radius.
        ry: u32,
    },
}

impl ImageFilter {
    /// Name as written in a filter list.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blur => "blur",
            Self::Emboss => "emboss",
            Self::Sharpen => "sharpen",
            Self::EdgeDetect => "edge-detect",
            Self::Sobel => "sobel",
            Self::Gray => "gray",
            Self::XGradient => "x-gradient",
            Self::YGradient => "y-gradient",
            Self::Invert => "invert",
            Self::StackBlur { .. } => "agg-stack-blur",
        }
    }

    fn kernel(&self) -> Option<Kernel> {
        match self {
            Self::Blur => Some(Kernel::new([1, 2, 1, 2, 4, 2, 1, 2, 1], 16)),
            Self::Emboss => Some(Kernel::new([-2, -1, 0, -1, 1, 1, 0, 1, 2], 1)),
            Self::Sharpen => Some(Kernel::new([0, -1, 0, -1, 5, -1, 0, -1, 0], 1)),
            Self::EdgeDetect => Some(Kernel::new([0, 1, 0, 1, -4, 1, 0, 1, 0], 1)),
            Self::XGradient => Some(Kernel::new([0, 0, 0, -1, 0, 1, 0, 0, 0], 1)),
            Self::YGradient => Some(Kernel::new([0, -1, 0, 0, 0, 0, 0, 1, 0], 1)),
            _ => None,
        }
    }
}

/// Integer 3×3 convolution kernel, row-major.
#[derive(Debug, Clone, Copy)]
struct Kernel {
    weights: [i32; 9],
    divisor: i32,
}

impl Kernel {
    const fn new(weights: [i32; 9], divisor: i32) -> Self {
        Self { weights, divisor }
    }

    const SOBEL_X: Kernel = Kernel::new([-1, 0, 1, -2, 0, 2, -1, 0, 1], 1);
    const SOBEL_Y: Kernel = Kernel::new([-1, -2, -1, 0, 0, 0, 1, 2, 1], 1);

    /// Raw weighted sum of the 3×3 neighborhood for each color channel.
    #[inline]
    fn sum(&self, src: &RgbaBuffer, x: u32, y: u32) -> [i32; 3] {
        let mut acc = [0i32; 3];
        let max_x = src.width() - 1;
        let max_y = src.height() - 1;
        for (k, &w) in self.weights.iter().enumerate() {
            if w == 0 {
                continue;
            }
            let sx = (x + (k % 3) as u32).saturating_sub(1).min(max_x);
            let sy = (y + (k / 3) as u32).saturating_sub(1).min(max_y);
            let px = src.row(sy)[sx as usize].to_le_bytes();
            for c in 0..3 {
                acc[c] += w * px[c] as i32;
            }
        }
        acc
    }
}

/// Parses an `image_filters` list.
///
/// An empty or blank string yields no filters.
///
/// ```rust
/// use carta_ops::{parse_image_filters, ImageFilter};
///
/// let filters = parse_image_filters("invert agg-stack-blur(3)").unwrap();
/// assert_eq!(filters, vec![ImageFilter::Invert, ImageFilter::StackBlur { rx: 3, ry: 3 }]);
/// assert!(parse_image_filters("not-a-filter").is_err());
/// ```
pub fn parse_image_filters(input: &str) -> OpsResult<Vec<ImageFilter>> {
    let is_sep = |c: char| c.is_whitespace() || c == ',';
    let mut filters = Vec::new();
    let mut rest = input.trim_start_matches(is_sep);

    while !rest.is_empty() {
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        let (name, tail) = rest.split_at(name_len);

        let (args, tail) = match tail.strip_prefix('(') {
            Some(inner) => {
                let close = inner
                    .find(')')
                    .ok_or_else(|| OpsError::FilterParse(format!("unclosed '(' after '{}'", name)))?;
                (Some(&inner[..close]), &inner[close + 1..])
            }
            None => (None, tail),
        };

        if !tail.is_empty() && !tail.starts_with(is_sep) {
            return Err(OpsError::FilterParse(format!("unexpected input at '{}'", tail)));
        }

        filters.push(parse_one(name, args)?);
        rest = tail.trim_start_matches(is_sep);
    }

    trace!(input, count = filters.len(), "parsed image filters");
    Ok(filters)
}

fn parse_one(name: &str, args: Option<&str>) -> OpsResult<ImageFilter> {
    let simple = match name {
        "blur" => Some(ImageFilter::Blur),
        "emboss" => Some(ImageFilter::Emboss),
        "sharpen" => Some(ImageFilter::Sharpen),
        "edge-detect" => Some(ImageFilter::EdgeDetect),
        "sobel" => Some(ImageFilter::Sobel),
        "gray" => Some(ImageFilter::Gray),
        "x-gradient" => Some(ImageFilter::XGradient),
        "y-gradient" => Some(ImageFilter::YGradient),
        "invert" => Some(ImageFilter::Invert),
        "agg-stack-blur" => None,
        "" => return Err(OpsError::FilterParse("expected a filter name".into())),
        other => return Err(OpsError::FilterParse(format!("unknown filter '{}'", other))),
    };

    if let Some(filter) = simple {
        return match args {
            None => Ok(filter),
            Some(_) => Err(OpsError::FilterParse(format!("'{}' takes no arguments", name))),
        };
    }

    let radii = match args {
        None => vec![1],
        Some(args) => args
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .ok()
                    .filter(|r| *r <= MAX_BLUR_RADIUS)
                    .ok_or_else(|| OpsError::FilterParse(format!("invalid blur radius '{}'", s)))
            })
            .collect::<OpsResult<Vec<_>>>()?,
    };

    match radii.as_slice() {
        [r] => Ok(ImageFilter::StackBlur { rx: *r, ry: *r }),
        [rx, ry] => Ok(ImageFilter::StackBlur { rx: *rx, ry: *ry }),
        _ => Err(OpsError::FilterParse(
            "agg-stack-blur takes one or two radii".into(),
        )),
    }
}

/// Applies filters to a buffer in list order.
pub fn apply_filters(buffer: &mut RgbaBuffer, filters: &[ImageFilter]) -> OpsResult<()> {
    if buffer.width() == 0 || buffer.height() == 0 {
        return Ok(());
    }
    for filter in filters {
        debug!(filter = filter.name(), width = buffer.width(), height = buffer.height(), "apply filter");
        apply_one(buffer, filter)?;
    }
    Ok(())
}

fn apply_one(buffer: &mut RgbaBuffer, filter: &ImageFilter) -> OpsResult<()> {
    match filter {
        ImageFilter::Gray => {
            per_pixel(buffer, |w| {
                let l = luminance(w);
                (w & 0xFF00_0000) | (l << 16) | (l << 8) | l
            });
            Ok(())
        }
        ImageFilter::Invert => {
            per_pixel(buffer, |w| {
                let [r, g, b, a] = w.to_le_bytes();
                let inv = |c: u8| a.saturating_sub(c);
                u32::from_le_bytes([inv(r), inv(g), inv(b), a])
            });
            Ok(())
        }
        ImageFilter::Sobel => {
            let src = buffer.clone();
            convolve_with(buffer, |x, y| {
                let gx = Kernel::SOBEL_X.sum(&src, x, y);
                let gy = Kernel::SOBEL_Y.sum(&src, x, y);
                std::array::from_fn(|c| {
                    let (fx, fy) = (gx[c] as f32, gy[c] as f32);
                    (fx * fx + fy * fy).sqrt() as i32
                })
            });
            Ok(())
        }
        ImageFilter::StackBlur { rx, ry } => box_blur(buffer, *rx as usize, *ry as usize),
        other => {
            let Some(kernel) = other.kernel() else {
                return Err(OpsError::InvalidParameter(format!("no kernel for {}", other.name())));
            };
            let src = buffer.clone();
            convolve_with(buffer, |x, y| kernel.sum(&src, x, y).map(|v| v / kernel.divisor));
            Ok(())
        }
    }
}

fn per_pixel(buffer: &mut RgbaBuffer, f: impl Fn(u32) -> u32 + Sync) {
    buffer
        .data_mut()
        .par_iter_mut()
        .with_min_len(4096)
        .for_each(|w| *w = f(*w));
}

/// Replaces every pixel's color with `f(x, y)`, clamped to `[0, alpha]`.
fn convolve_with(buffer: &mut RgbaBuffer, f: impl Fn(u32, u32) -> [i32; 3] + Sync) {
    let width = buffer.width() as usize;
    buffer
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, w) in row.iter_mut().enumerate() {
                let a = (*w >> 24) as i32;
                let rgb = f(x as u32, y as u32).map(|v| v.clamp(0, a) as u8);
                *w = u32::from_le_bytes([rgb[0], rgb[1], rgb[2], a as u8]);
            }
        });
}

/// Separable box blur over all four channels with edge clamping.
fn box_blur(buffer: &mut RgbaBuffer, rx: usize, ry: usize) -> OpsResult<()> {
    let (w, h) = (buffer.width() as usize, buffer.height() as usize);

    if rx > 0 {
        buffer
            .data_mut()
            .par_chunks_mut(w)
            .for_each(|row| blur_line(row, rx));
    }

    if ry > 0 {
        let mut transposed = RgbaBuffer::new(h as u32, w as u32)?;
        transpose(buffer.data(), transposed.data_mut(), w, h);
        transposed
            .data_mut()
            .par_chunks_mut(h)
            .for_each(|col| blur_line(col, ry));
        transpose(transposed.data(), buffer.data_mut(), h, w);
    }
    Ok(())
}

fn transpose(src: &[u32], dst: &mut [u32], w: usize, h: usize) {
    dst.par_chunks_mut(h).enumerate().for_each(|(x, out)| {
        for (y, px) in out.iter_mut().enumerate() {
            *px = src[y * w + x];
        }
    });
}

/// Running-sum box blur along one line of pixels.
fn blur_line(line: &mut [u32], radius: usize) {
    let len = line.len();
    let src: Vec<[u32; 4]> = line.iter().map(|w| w.to_le_bytes().map(u32::from)).collect();
    let at = |i: isize| src[i.clamp(0, len as isize - 1) as usize];
    let window = (2 * radius + 1) as u32;
    let r = radius as isize;

    let mut acc = [0u32; 4];
    for i in -r..=r {
        let px = at(i);
        for c in 0..4 {
            acc[c] += px[c];
        }
    }

    for i in 0..len as isize {
        let out = acc.map(|v| ((v + window / 2) / window) as u8);
        line[i as usize] = u32::from_le_bytes(out);
        let (add, sub) = (at(i + r + 1), at(i - r));
        for c in 0..4 {
            acc[c] = acc[c] + add[c] - sub[c];
        }
    }
}
