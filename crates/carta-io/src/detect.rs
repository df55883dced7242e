//! Format detection utilities.
//!
//! Detects image formats from file extensions and magic bytes, and maps
//! filenames onto the format names used by the writers.

use std::path::Path;

/// Sentinel returned by [`guess_type`] for unrecognized extensions.
pub const UNKNOWN_TYPE: &str = "<unknown>";

/// Image formats with a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// Unknown/unsupported format.
    Unknown,
}

impl Format {
    /// Detects format from file extension only.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("png") => Format::Png,
            Some("jpg") | Some("jpeg") => Format::Jpeg,
            _ => Format::Unknown,
        }
    }

    /// Detects format from raw bytes (magic number check).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        // PNG: 0x89 0x50 0x4E 0x47 0x0D 0x0A 0x1A 0x0A
        if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
            return Format::Png;
        }

        // JPEG: 0xFF 0xD8 0xFF
        if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
            return Format::Jpeg;
        }

        Format::Unknown
    }

    /// Parses a format name as returned by [`Format::name`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "png" => Format::Png,
            "jpeg" | "jpg" => Format::Jpeg,
            _ => Format::Unknown,
        }
    }

    /// Canonical format name.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Jpeg => "jpeg",
            Format::Unknown => UNKNOWN_TYPE,
        }
    }

    /// Returns true if a reader for this format is compiled in.
    pub fn is_readable(&self) -> bool {
        match self {
            Format::Png => cfg!(feature = "png"),
            Format::Jpeg => cfg!(feature = "jpeg"),
            Format::Unknown => false,
        }
    }
}

/// Format name for a filename, if a reader for it exists.
///
/// ```rust
/// use carta_io::type_from_filename;
///
/// assert_eq!(type_from_filename("tile.PNG"), Some("png"));
/// assert_eq!(type_from_filename("notes.txt"), None);
/// ```
pub fn type_from_filename(filename: &str) -> Option<&'static str> {
    let format = Format::from_extension(filename);
    format.is_readable().then(|| format.name())
}

/// Output format name for a filename, or [`UNKNOWN_TYPE`].
pub fn guess_type(filename: &str) -> &'static str {
    Format::from_extension(filename).name()
}
