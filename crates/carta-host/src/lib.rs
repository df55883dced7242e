//! # carta-host
//!
//! The host-facing image object: a mutable RGBA image exposed to a
//! single-threaded, event-loop host with paired synchronous and asynchronous
//! operations.
//!
//! # Architecture
//!
//! ```text
//!  host thread                              worker pool (rayon)
//!  ───────────                              ───────────────────
//!  Image::encode(env, [fmt, cb])
//!    ├─ args::EncodeRequest::parse     ──▶  work::encode(buffer, fmt)
//!    ├─ pin image                                 │
//!    └─ Env::submit                               ▼
//!                                         completion channel
//!  Env::run ◀─────────────────────────────────────┘
//!    └─ cb(null, bytes), unpin
//! ```
//!
//! - [`Value`] - loosely typed host values passed to every method
//! - [`Image`] - the image object; clones are extra host references
//! - [`ImageView`] - read-only region of an image
//! - [`Env`] - job runner and completion dispatcher
//! - [`ExternalMemory`] - where image sizes are announced
//!
//! # Errors
//!
//! Argument errors ([`ErrorKind::Type`], [`ErrorKind::FilterParse`]) are
//! returned directly from the call and never reach a callback. Failures while
//! a job runs reach the callback as its first argument.
//!
//! # Features
//!
//! - `composite` (default) - [`Image::composite`] and image filters. Without
//!   it, `composite` fails with [`ErrorKind::Unsupported`].

#![warn(missing_docs)]

mod args;
mod env;
mod error;
mod image;
mod memory;
mod value;
mod view;
mod work;

pub use args::{
    split_callback, Arguments, Dimensions, EncodeRequest, FromBytesRequest, GrayscaleRequest, OpenRequest, Options,
    SaveRequest, ViewRequest,
};
#[cfg(feature = "composite")]
pub use args::CompositeRequest;
pub use env::{Env, EnvBuilder, JobId};
pub use error::{Error, ErrorKind, HostResult};
pub use image::Image;
pub use memory::{ExternalMemory, MemoryCounter, MemoryTicket, NoopMemory};
pub use value::{Function, Object, Value};
pub use view::ImageView;

pub use carta_core::{Color, Palette, PaletteFormat};
