//! # carta-ops
//!
//! Pixel operations on carta RGBA buffers.
//!
//! # Modules
//!
//! - [`composite`] - Porter-Duff operators and separable blend modes
//! - [`filter`] - `image_filters` parsing and 3×3 / box filters
//!
//! Both modules split work by rows across the rayon global pool.
//!
//! # Example
//!
//! ```rust
//! use carta_core::{Color, RgbaBuffer};
//! use carta_ops::{apply_filters, composite, parse_image_filters, CompositeMode};
//!
//! let mut layer = RgbaBuffer::new(16, 16).unwrap();
//! layer.fill(Color::new(0, 0, 128, 128));
//! apply_filters(&mut layer, &parse_image_filters("blur").unwrap()).unwrap();
//!
//! let mut base = RgbaBuffer::new(32, 32).unwrap();
//! composite(&mut base, &layer, CompositeMode::Multiply, 0.75, 8, 8).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod composite;
pub mod filter;

pub use composite::{composite, composite_pixel, CompositeMode};
pub use error::{OpsError, OpsResult};
pub use filter::{apply_filters, parse_image_filters, ImageFilter};
