//! # carta-core
//!
//! Core raster types for the carta image runtime.
//!
//! - [`RgbaBuffer`] - Width × height buffer of packed 32-bit RGBA words
//! - [`BufferHandle`] - Shared, thread-safe handle to a buffer
//! - [`Color`] - 8-bit RGBA color and pixel word packing
//! - [`Palette`] - Fixed color table for indexed encoding
//!
//! ## Crate Structure
//!
//! ```text
//! carta-core (this crate)
//!    ^
//!    |
//!    +-- carta-io (codecs, readers, format detection)
//!    +-- carta-ops (compositing, image filters)
//!    +-- carta-host (host-facing image object, async jobs)
//! ```
//!
//! ## Pixel Layout
//!
//! Every pixel is one little-endian `u32`: red in the low byte, alpha in the
//! high byte (`0xAABBGGRR`). Operations that work per channel rely on this.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod color;
pub mod error;
pub mod handle;
pub mod palette;

pub use buffer::{luminance, RgbaBuffer};
pub use color::Color;
pub use error::{Error, Result};
pub use handle::BufferHandle;
pub use palette::{Palette, PaletteFormat, MAX_PALETTE_ENTRIES};
