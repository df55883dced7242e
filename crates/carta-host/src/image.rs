//! The host-visible image object.
//!
//! [`Image`] binds one shared pixel buffer to the host. It is created from
//! dimensions, by a loader, or by an async loader's completion, and it is
//! destroyed once every host handle and every job pin is gone. Creation
//! announces `width × height × 4` bytes to the environment's memory backend;
//! destruction retracts the same amount.
//!
//! Mutating and I/O operations come in two forms:
//!
//! | Sync | Async (trailing callback) | Callback value |
//! |------|---------------------------|----------------|
//! | [`Image::clear_sync`] | [`Image::clear`] | `(null)` |
//! | [`Image::premultiply_sync`] | [`Image::premultiply`] | `(null, image)` |
//! | [`Image::demultiply_sync`] | [`Image::demultiply`] | `(null, image)` |
//! | [`Image::encode_sync`] | [`Image::encode`] | `(null, buffer)` |
//! | | [`Image::composite`] | `(null, this)` |
//! | [`Image::open_sync`] | [`Image::open`] | `(null, image)` |
//! | [`Image::from_bytes_sync`] | [`Image::from_bytes`] | `(null, image)` |
//!
//! Called without a callback, every async form except `composite` runs its
//! sync sibling and returns its result. Argument errors are always returned
//! directly and never reach a callback.

use crate::args::{
    optional_callback, split_callback, Dimensions, EncodeRequest, FromBytesRequest, GrayscaleRequest,
    OpenRequest, SaveRequest, ViewRequest,
};
use crate::env::{Env, JobOutput};
use crate::memory::MemoryTicket;
use crate::{work, Error, HostResult, ImageView, Value};
use carta_core::{BufferHandle, RgbaBuffer};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

struct ImageInner {
    buffer: BufferHandle,
    width: u32,
    height: u32,
    estimated_size: usize,
    pins: Cell<usize>,
    _ticket: MemoryTicket,
}

impl Drop for ImageInner {
    fn drop(&mut self) {
        trace!(width = self.width, height = self.height, "image released");
    }
}

/// Host handle to an image.
///
/// Clones are additional host references to the same object.
#[derive(Clone)]
pub struct Image(Rc<ImageInner>);

/// Keeps an image alive and counted for the duration of a job.
pub(crate) struct Pin(Image);

impl Pin {
    fn new(image: &Image) -> Self {
        image.0.pins.set(image.0.pins.get() + 1);
        Pin(image.clone())
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        let pins = &self.0 .0.pins;
        pins.set(pins.get() - 1);
    }
}

impl Image {
    /// Constructor: exactly two non-negative integers `(width, height)`.
    ///
    /// ```rust
    /// use carta_host::{Env, Image, Value};
    ///
    /// let env = Env::new().unwrap();
    /// let img = Image::new(&env, &[Value::from(4), Value::from(2)]).unwrap();
    /// assert_eq!((img.width(), img.height()), (4, 2));
    /// assert!(!img.painted());
    ///
    /// assert!(Image::new(&env, &[Value::from(4)]).is_err());
    /// ```
    pub fn new(env: &Env, args: &[Value]) -> HostResult<Self> {
        let dims = Dimensions::parse(args)?;
        Self::with_size(env, dims.width, dims.height)
    }

    /// Allocates a cleared image.
    ///
    /// Allocation failures are [`Error::Internal`].
    pub fn with_size(env: &Env, width: u32, height: u32) -> HostResult<Self> {
        let buffer = RgbaBuffer::new(width, height)?;
        Ok(Self::adopt(env, buffer))
    }

    /// Wraps a buffer built elsewhere.
    pub(crate) fn adopt(env: &Env, buffer: RgbaBuffer) -> Self {
        let (width, height) = (buffer.width(), buffer.height());
        let estimated_size = buffer.byte_size();
        let ticket = MemoryTicket::announce(env.memory().clone(), estimated_size);
        trace!(width, height, estimated_size, "image created");
        Self(Rc::new(ImageInner {
            buffer: BufferHandle::new(buffer),
            width,
            height,
            estimated_size,
            pins: Cell::new(0),
            _ticket: ticket,
        }))
    }

    pub(crate) fn pin(&self) -> Pin {
        Pin::new(self)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.0.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.0.height
    }

    /// Whether rendering has touched the pixels.
    pub fn painted(&self) -> bool {
        self.0.buffer.read().painted()
    }

    /// `width × height × 4`, as announced to the memory backend.
    pub fn estimated_size(&self) -> usize {
        self.0.estimated_size
    }

    /// Number of jobs currently holding this image.
    pub fn pin_count(&self) -> usize {
        self.0.pins.get()
    }

    /// The shared pixel buffer.
    pub fn buffer(&self) -> &BufferHandle {
        &self.0.buffer
    }

    /// Returns `true` if both handles refer to the same image object.
    pub fn ptr_eq(&self, other: &Image) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Background color, or [`Value::Undefined`] when unset.
    pub fn background(&self) -> Value {
        self.0
            .buffer
            .background()
            .map_or(Value::Undefined, Value::Color)
    }

    /// Sets the background color; anything but a color fails with
    /// [`Error::Type`].
    pub fn set_background(&self, value: &Value) -> HostResult<()> {
        let color = value
            .as_color()
            .ok_or_else(|| Error::type_error("Color expected"))?;
        self.0.buffer.write().set_background(color);
        Ok(())
    }

    /// Read-only view of a region, `(x, y, width, height)`.
    ///
    /// Coordinates are not checked against the image here.
    pub fn view(&self, args: &[Value]) -> HostResult<Value> {
        let req = ViewRequest::parse(args)?;
        Ok(Value::View(ImageView::new(self.clone(), req)))
    }

    /// Resets every pixel to the background color, or transparent.
    pub fn clear_sync(&self) -> HostResult<Value> {
        work::clear(&self.0.buffer);
        Ok(Value::Undefined)
    }

    /// Async [`Image::clear_sync`]: `([callback])`.
    pub fn clear(&self, env: &Env, args: &[Value]) -> HostResult<Value> {
        let Some(callback) = optional_callback(args)? else {
            return self.clear_sync();
        };
        let buffer = self.0.buffer.clone();
        env.submit(
            "clear",
            vec![self.pin()],
            callback,
            move || {
                work::clear(&buffer);
                Ok(JobOutput::Unit)
            },
            |_, _| Ok(None),
        );
        Ok(Value::Undefined)
    }

    /// Premultiplies color by alpha.
    pub fn premultiply_sync(&self) -> HostResult<Value> {
        work::premultiply(&self.0.buffer);
        Ok(Value::Undefined)
    }

    /// Async [`Image::premultiply_sync`]: `([callback])`.
    pub fn premultiply(&self, env: &Env, args: &[Value]) -> HostResult<Value> {
        let Some(callback) = optional_callback(args)? else {
            return self.premultiply_sync();
        };
        let buffer = self.0.buffer.clone();
        let this = self.clone();
        env.submit(
            "premultiply",
            vec![self.pin()],
            callback,
            move || {
                work::premultiply(&buffer);
                Ok(JobOutput::Unit)
            },
            move |_, _| Ok(Some(Value::Image(this))),
        );
        Ok(Value::Undefined)
    }

    /// Divides premultiplied color by alpha.
    pub fn demultiply_sync(&self) -> HostResult<Value> {
        work::demultiply(&self.0.buffer);
        Ok(Value::Undefined)
    }

    /// Async [`Image::demultiply_sync`]: `([callback])`.
    pub fn demultiply(&self, env: &Env, args: &[Value]) -> HostResult<Value> {
        let Some(callback) = optional_callback(args)? else {
            return self.demultiply_sync();
        };
        let buffer = self.0.buffer.clone();
        let this = self.clone();
        env.submit(
            "demultiply",
            vec![self.pin()],
            callback,
            move || {
                work::demultiply(&buffer);
                Ok(JobOutput::Unit)
            },
            move |_, _| Ok(Some(Value::Image(this))),
        );
        Ok(Value::Undefined)
    }

    /// Moves luminance into alpha: `([color])`.
    ///
    /// Without a color the RGB channels are kept; with one they are replaced
    /// by the color's RGB.
    pub fn set_grayscale_to_alpha(&self, args: &[Value]) -> HostResult<Value> {
        let req = GrayscaleRequest::parse(args)?;
        let mut buffer = self.0.buffer.write();
        match req.color {
            None => buffer.set_grayscale_to_alpha(),
            Some(color) => buffer.set_grayscale_to_alpha_with(color),
        }
        Ok(Value::Undefined)
    }

    /// Encodes to a byte buffer: `([format][, options])`.
    ///
    /// ```rust
    /// use carta_host::{Env, Image, Value};
    ///
    /// let env = Env::new().unwrap();
    /// let img = Image::with_size(&env, 4, 4).unwrap();
    /// let png = img.encode_sync(&[Value::from("png")]).unwrap();
    /// assert_eq!(&png.as_buffer().unwrap()[..4], b"\x89PNG");
    /// ```
    pub fn encode_sync(&self, args: &[Value]) -> HostResult<Value> {
        let req = EncodeRequest::parse(args)?;
        let bytes = work::encode(&self.0.buffer, &req.format, req.palette.as_deref())?;
        Ok(Value::from(bytes))
    }

    /// Async [`Image::encode_sync`]: `([format][, options][, callback])`.
    pub fn encode(&self, env: &Env, args: &[Value]) -> HostResult<Value> {
        let (positionals, callback) = split_callback(args);
        let Some(callback) = callback else {
            return self.encode_sync(args);
        };
        let req = EncodeRequest::parse(positionals)?;
        let buffer = self.0.buffer.clone();
        env.submit(
            "encode",
            vec![self.pin()],
            callback,
            move || work::encode(&buffer, &req.format, req.palette.as_deref()).map(JobOutput::Bytes),
            |_, out| Ok(Some(Value::from(out.into_bytes()?))),
        );
        Ok(Value::Undefined)
    }

    /// Writes the encoded image to a file: `(filename[, format])`.
    ///
    /// The format is guessed from the extension when omitted.
    pub fn save(&self, args: &[Value]) -> HostResult<Value> {
        let req = SaveRequest::parse(args)?;
        carta_io::save_to_file(&self.0.buffer.read(), &req.filename, &req.format, None)?;
        Ok(Value::Undefined)
    }

    /// Composites another image onto this one:
    /// `(image[, options], callback)`.
    ///
    /// Options: `comp_op`, `opacity`, `dx`, `dy`, `image_filters`. Filters
    /// are applied to the source image in place, in list order, before
    /// compositing. Both images are pinned until the callback returns.
    #[cfg(feature = "composite")]
    pub fn composite(&self, env: &Env, args: &[Value]) -> HostResult<Value> {
        use crate::args::{CompositeRequest, MISSING_CALLBACK};

        let (positionals, callback) = split_callback(args);
        CompositeRequest::source(positionals)?;
        let callback = callback.ok_or_else(|| Error::type_error(MISSING_CALLBACK))?;
        let req = CompositeRequest::parse(positionals)?;

        let pins = vec![self.pin(), req.source.pin()];
        let job = work::CompositeJob {
            source: req.source.buffer().clone(),
            mode: req.mode,
            opacity: req.opacity,
            dx: req.dx,
            dy: req.dy,
            filters: req.filters,
        };
        let target = self.0.buffer.clone();
        let this = self.clone();
        env.submit(
            "composite",
            pins,
            callback,
            move || {
                work::composite(&target, &job)?;
                Ok(JobOutput::Unit)
            },
            move |_, _| Ok(Some(Value::Image(this))),
        );
        Ok(Value::Undefined)
    }

    /// Compositing is unavailable in this build.
    #[cfg(not(feature = "composite"))]
    pub fn composite(&self, _env: &Env, _args: &[Value]) -> HostResult<Value> {
        Err(Error::Unsupported("compositing is not supported by this build".into()))
    }

    /// Decodes a file: `(filename)`.
    pub fn open_sync(env: &Env, args: &[Value]) -> HostResult<Image> {
        let req = OpenRequest::parse(args)?;
        let buffer = work::load_file(&req.filename)?;
        Ok(Self::adopt(env, buffer))
    }

    /// Async [`Image::open_sync`]: `(filename[, callback])`.
    pub fn open(env: &Env, args: &[Value]) -> HostResult<Value> {
        let (positionals, callback) = split_callback(args);
        let Some(callback) = callback else {
            return Self::open_sync(env, args).map(Value::Image);
        };
        let req = OpenRequest::parse(positionals)?;
        env.submit(
            "open",
            Vec::new(),
            callback,
            move || work::load_file(&req.filename).map(JobOutput::Buffer),
            |env, out| Ok(Some(Value::Image(Self::adopt(env, out.into_buffer()?)))),
        );
        Ok(Value::Undefined)
    }

    /// Decodes an encoded byte buffer: `(buffer)`.
    pub fn from_bytes_sync(env: &Env, args: &[Value]) -> HostResult<Image> {
        let req = FromBytesRequest::parse(args)?;
        let buffer = work::load_bytes(&req.bytes)?;
        Ok(Self::adopt(env, buffer))
    }

    /// Async [`Image::from_bytes_sync`]: `(buffer[, callback])`.
    pub fn from_bytes(env: &Env, args: &[Value]) -> HostResult<Value> {
        let (positionals, callback) = split_callback(args);
        let Some(callback) = callback else {
            return Self::from_bytes_sync(env, args).map(Value::Image);
        };
        let req = FromBytesRequest::parse(positionals)?;
        env.submit(
            "from_bytes",
            Vec::new(),
            callback,
            move || work::load_bytes(&req.bytes).map(JobOutput::Buffer),
            |env, out| Ok(Some(Value::Image(Self::adopt(env, out.into_buffer()?)))),
        );
        Ok(Value::Undefined)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.0.width)
            .field("height", &self.0.height)
            .field("pins", &self.0.pins.get())
            .finish()
    }
}
