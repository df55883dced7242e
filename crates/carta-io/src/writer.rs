//! Output format strings.
//!
//! Writers are selected by a short format string:
//!
//! | String | Output |
//! |--------|--------|
//! | `png`, `png32` | 8-bit RGBA PNG |
//! | `png24` | 8-bit RGB PNG |
//! | `png8` | palette-indexed PNG (palette required) |
//! | `jpeg`, `jpg`, `jpegNN` | JPEG at quality NN (default 85) |
//!
//! Anything after a `:` (`png8:m=h`) is a writer tuning hint and is ignored.

use crate::{IoError, IoResult};

#[cfg(feature = "png")]
use crate::png::PngVariant;

/// Parsed output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// PNG with the given pixel layout.
    #[cfg(feature = "png")]
    Png(PngVariant),
    /// JPEG with the given quality.
    #[cfg(feature = "jpeg")]
    Jpeg {
        /// Encoder quality, 1-100.
        quality: u8,
    },
}

impl OutputFormat {
    /// Parses a format string.
    ///
    /// ```rust
    /// use carta_io::OutputFormat;
    ///
    /// assert!(OutputFormat::parse("png").is_ok());
    /// assert!(OutputFormat::parse("jpeg70").is_ok());
    /// assert!(OutputFormat::parse("bmp").is_err());
    /// ```
    pub fn parse(format: &str) -> IoResult<Self> {
        let head = format.split(':').next().unwrap_or_default();
        let unknown = || IoError::UnsupportedFormat(format.to_string());

        #[cfg(feature = "png")]
        match head {
            "png" | "png32" => return Ok(Self::Png(PngVariant::Rgba)),
            "png24" => return Ok(Self::Png(PngVariant::Rgb)),
            "png8" => return Ok(Self::Png(PngVariant::Indexed)),
            _ => {}
        }

        #[cfg(feature = "jpeg")]
        {
            let digits = head
                .strip_prefix("jpeg")
                .or_else(|| head.strip_prefix("jpg"));
            if let Some(digits) = digits {
                if digits.is_empty() {
                    return Ok(Self::Jpeg {
                        quality: crate::jpeg::DEFAULT_QUALITY,
                    });
                }
                return match digits.parse::<u8>() {
                    Ok(q) if (1..=100).contains(&q) => Ok(Self::Jpeg { quality: q }),
                    _ => Err(unknown()),
                };
            }
        }

        Err(unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "png")]
    fn png_variants() {
        assert_eq!(OutputFormat::parse("png").unwrap(), OutputFormat::Png(PngVariant::Rgba));
        assert_eq!(OutputFormat::parse("png32").unwrap(), OutputFormat::Png(PngVariant::Rgba));
        assert_eq!(OutputFormat::parse("png24").unwrap(), OutputFormat::Png(PngVariant::Rgb));
        assert_eq!(
            OutputFormat::parse("png8:m=h").unwrap(),
            OutputFormat::Png(PngVariant::Indexed)
        );
    }

    #[test]
    #[cfg(feature = "jpeg")]
    fn jpeg_quality() {
        assert_eq!(OutputFormat::parse("jpeg").unwrap(), OutputFormat::Jpeg { quality: 85 });
        assert_eq!(OutputFormat::parse("jpeg60").unwrap(), OutputFormat::Jpeg { quality: 60 });
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg { quality: 85 });
        assert!(OutputFormat::parse("jpeg0").is_err());
        assert!(OutputFormat::parse("jpeg101").is_err());
        assert!(OutputFormat::parse("jpegx").is_err());
    }

    #[test]
    fn unknown_names_the_format() {
        let err = OutputFormat::parse("gif").unwrap_err();
        assert_eq!(err.to_string(), "unknown file type: gif");
    }
}
