//! Argument coercion.
//!
//! Host arguments arrive as a slice of [`Value`]s. Each operation projects
//! them onto a typed request here, once, and both its synchronous and
//! asynchronous forms consume the same request type. Coercion failures are
//! [`Error::Type`] (or [`Error::FilterParse`] for `image_filters`) and are
//! returned before any job is queued.
//!
//! A trailing [`Value::Function`] selects the asynchronous form; see
//! [`split_callback`].

use crate::{Error, Function, HostResult, Object, Value};
use carta_core::{Color, Palette};
use std::sync::Arc;

pub(crate) const MISSING_CALLBACK: &str = "last argument must be a callback function";

/// Splits a trailing callback from the positional arguments.
///
/// ```rust
/// use carta_host::{split_callback, Value};
///
/// let args = [Value::from("png"), Value::function(|_| {})];
/// let (positionals, cb) = split_callback(&args);
/// assert_eq!(positionals.len(), 1);
/// assert!(cb.is_some());
///
/// let (positionals, cb) = split_callback(&args[..1]);
/// assert_eq!(positionals.len(), 1);
/// assert!(cb.is_none());
/// ```
pub fn split_callback(args: &[Value]) -> (&[Value], Option<Function>) {
    match args.split_last() {
        Some((Value::Function(f), rest)) => (rest, Some(f.clone())),
        _ => (args, None),
    }
}

/// Callback for an operation whose synchronous form takes no arguments.
///
/// `Ok(None)` means no arguments were given and the call falls through to
/// the synchronous form.
pub(crate) fn optional_callback(args: &[Value]) -> HostResult<Option<Function>> {
    match args.last() {
        None => Ok(None),
        Some(Value::Function(f)) => Ok(Some(f.clone())),
        Some(_) => Err(Error::type_error(MISSING_CALLBACK)),
    }
}

fn non_negative_u32(v: &Value) -> Option<u32> {
    v.as_integer().and_then(|i| u32::try_from(i).ok())
}

/// Positional arguments with arity and per-position type checks.
///
/// Every check fails with [`Error::Type`] and the caller's message; a
/// missing position fails the same way as a mistyped one.
///
/// ```rust
/// use carta_host::{Arguments, Value};
///
/// let raw = [Value::from("a.png"), Value::from(3)];
/// let args = Arguments::new(&raw).arity(1, 2, "one or two arguments").unwrap();
/// assert_eq!(args.string(0, "string expected").unwrap(), "a.png");
/// assert_eq!(args.non_negative(1, "integer expected").unwrap(), 3);
/// assert!(args.string(1, "string expected").is_err());
/// assert!(Arguments::new(&raw).arity(3, 3, "three").is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    args: &'a [Value],
}

impl<'a> Arguments<'a> {
    /// Wraps positional arguments.
    pub fn new(args: &'a [Value]) -> Self {
        Self { args }
    }

    /// Number of positionals.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` when there are no positionals.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Requires between `min` and `max` positionals, inclusive.
    pub fn arity(self, min: usize, max: usize, msg: &str) -> HostResult<Self> {
        if (min..=max).contains(&self.args.len()) {
            Ok(self)
        } else {
            Err(Error::type_error(msg))
        }
    }

    /// Raw positional.
    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    fn typed<T>(&self, index: usize, msg: &str, f: impl FnOnce(&'a Value) -> Option<T>) -> HostResult<T> {
        self.get(index).and_then(f).ok_or_else(|| Error::type_error(msg))
    }

    /// String positional.
    pub fn string(&self, index: usize, msg: &str) -> HostResult<&'a str> {
        self.typed(index, msg, Value::as_str)
    }

    /// Integer positional that fits `u32`.
    pub fn non_negative(&self, index: usize, msg: &str) -> HostResult<u32> {
        self.typed(index, msg, non_negative_u32)
    }

    /// Byte buffer positional.
    pub fn buffer(&self, index: usize, msg: &str) -> HostResult<&'a Arc<[u8]>> {
        self.typed(index, msg, Value::as_buffer)
    }

    /// Image positional.
    pub fn image(&self, index: usize, msg: &str) -> HostResult<&'a crate::Image> {
        self.typed(index, msg, Value::as_image)
    }
}

/// Projection of an options bag onto typed, optional fields.
///
/// Keys that are not asked for are ignored. A key that is present with a
/// value of the wrong type fails with [`Error::Type`] and the given message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options<'a> {
    bag: Option<&'a Object>,
}

impl<'a> Options<'a> {
    /// Reads an optional options positional; anything but an object fails
    /// with `msg`.
    pub fn from_arg(arg: Option<&'a Value>, msg: &str) -> HostResult<Self> {
        match arg {
            None => Ok(Self::default()),
            Some(Value::Object(bag)) => Ok(Self { bag: Some(bag) }),
            Some(_) => Err(Error::type_error(msg)),
        }
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.bag.and_then(|b| b.get(key))
    }

    fn typed<T>(&self, key: &str, msg: &str, f: impl FnOnce(&'a Value) -> Option<T>) -> HostResult<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => f(v).map(Some).ok_or_else(|| Error::type_error(msg)),
        }
    }

    /// Integer-valued number.
    pub fn integer(&self, key: &str, msg: &str) -> HostResult<Option<i64>> {
        self.typed(key, msg, Value::as_integer)
    }

    /// Any number.
    pub fn number(&self, key: &str, msg: &str) -> HostResult<Option<f64>> {
        self.typed(key, msg, Value::as_number)
    }

    /// String.
    pub fn string(&self, key: &str, msg: &str) -> HostResult<Option<&'a str>> {
        self.typed(key, msg, Value::as_str)
    }

    /// Palette object.
    pub fn palette(&self, key: &str, msg: &str) -> HostResult<Option<Arc<Palette>>> {
        self.typed(key, msg, |v| v.as_palette().cloned())
    }
}

/// Constructor arguments: `(width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Parses exactly two non-negative integers.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        let args = Arguments::new(args).arity(2, 2, "please provide Image width and height")?;
        let msg = "Image 'width' and 'height' must be integers";
        Ok(Self {
            width: args.non_negative(0, msg)?,
            height: args.non_negative(1, msg)?,
        })
    }
}

/// `encode` arguments: `([format][, options])`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    /// Format string, `"png"` by default.
    pub format: String,
    /// Palette for indexed output.
    pub palette: Option<Arc<Palette>>,
}

impl EncodeRequest {
    /// Parses the positional arguments.
    ///
    /// More than two positionals means a callback was intended but the last
    /// argument is not callable.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        Arguments::new(args).arity(0, 2, MISSING_CALLBACK)?;
        let format = match args.first() {
            None => "png".to_string(),
            Some(v) => v
                .as_str()
                .ok_or_else(|| Error::type_error("first arg, 'format' must be a string"))?
                .to_string(),
        };
        let options = Options::from_arg(args.get(1), "optional second arg must be an options object")?;
        let palette = options.palette("palette", "'palette' must be a Palette object")?;
        Ok(Self { format, palette })
    }
}

/// `save` arguments: `(filename[, format])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Output path.
    pub filename: String,
    /// Format string, guessed from the filename when omitted.
    pub format: String,
}

impl SaveRequest {
    /// Parses the positional arguments.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        let args = Arguments::new(args);
        let filename = args.string(0, "filename required")?.to_string();

        let format = match args.get(1) {
            Some(v) => v
                .as_str()
                .ok_or_else(|| Error::type_error("both 'filename' and 'format' arguments must be strings"))?
                .to_string(),
            None => {
                let guessed = carta_io::guess_type(&filename);
                if guessed == carta_io::UNKNOWN_TYPE {
                    return Err(Error::Internal(format!("unknown output extension for: {}", filename)));
                }
                guessed.to_string()
            }
        };
        Ok(Self { filename, format })
    }
}

/// `view` arguments: `(x, y, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRequest {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl ViewRequest {
    /// Parses exactly four non-negative integers.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        let msg = "requires 4 integer arguments: x, y, width, height";
        let args = Arguments::new(args).arity(4, 4, msg)?;
        Ok(Self {
            x: args.non_negative(0, msg)?,
            y: args.non_negative(1, msg)?,
            width: args.non_negative(2, msg)?,
            height: args.non_negative(3, msg)?,
        })
    }
}

/// `set_grayscale_to_alpha` arguments: `([color])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayscaleRequest {
    /// Replacement RGB, if any.
    pub color: Option<Color>,
}

impl GrayscaleRequest {
    /// Parses zero arguments or one color.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        match args {
            [] => Ok(Self { color: None }),
            [Value::Color(c)] => Ok(Self { color: Some(*c) }),
            _ => Err(Error::type_error("optional argument must be a Color")),
        }
    }
}

/// `open` arguments: `(filename)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    /// Path to read. Owned, so it outlives the caller's string.
    pub filename: String,
}

impl OpenRequest {
    /// Parses the positional arguments.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        let args = Arguments::new(args)
            .arity(1, usize::MAX, "must provide a string argument")?
            .arity(1, 1, MISSING_CALLBACK)?;
        Ok(Self {
            filename: args.string(0, "Argument must be a string")?.to_string(),
        })
    }
}

/// `from_bytes` arguments: `(buffer)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromBytesRequest {
    /// Encoded bytes, shared with the host buffer.
    pub bytes: Arc<[u8]>,
}

impl FromBytesRequest {
    /// Parses the positional arguments.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        let args = Arguments::new(args)
            .arity(1, usize::MAX, "must provide a buffer argument")?
            .arity(1, 1, MISSING_CALLBACK)?;
        let bytes = args.buffer(0, "first argument must be a buffer")?;
        Ok(Self { bytes: bytes.clone() })
    }
}

/// `composite` arguments: `(image[, options])`.
#[cfg(feature = "composite")]
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    /// Image composited onto the target.
    pub source: crate::Image,
    /// Composite operator.
    pub mode: carta_ops::CompositeMode,
    /// Source opacity.
    pub opacity: f32,
    /// Horizontal offset.
    pub dx: i32,
    /// Vertical offset.
    pub dy: i32,
    /// Filters applied to the source first.
    pub filters: Vec<carta_ops::ImageFilter>,
}

#[cfg(feature = "composite")]
impl CompositeRequest {
    /// Checks the leading image argument alone.
    pub fn source(args: &[Value]) -> HostResult<&crate::Image> {
        Arguments::new(args)
            .arity(1, usize::MAX, "requires at least one argument: an image")?
            .image(0, "Image expected as first arg")
    }

    /// Parses the positional arguments.
    pub fn parse(args: &[Value]) -> HostResult<Self> {
        use carta_ops::CompositeMode;

        let source = Self::source(args)?.clone();

        let options = Options::from_arg(args.get(1), "optional second arg must be an options object")?;

        let mode_msg = "comp_op must be a composite mode value";
        let mode = match options.integer("comp_op", mode_msg)? {
            None => CompositeMode::default(),
            Some(v) => CompositeMode::from_value(v).ok_or_else(|| Error::type_error(mode_msg))?,
        };

        let opacity = options
            .number("opacity", "opacity must be a floating point number")?
            .unwrap_or(1.0) as f32;

        let offset = |key: &str, msg: &str| -> HostResult<i32> {
            match options.integer(key, msg)? {
                None => Ok(0),
                Some(v) => i32::try_from(v).map_err(|_| Error::type_error(msg)),
            }
        };
        let dx = offset("dx", "dx must be an integer")?;
        let dy = offset("dy", "dy must be an integer")?;

        let filters = match options.string("image_filters", "image_filters argument must be a string of filter names")? {
            None => Vec::new(),
            Some(s) => carta_ops::parse_image_filters(s)
                .map_err(|_| Error::FilterParse("could not parse image_filters".into()))?,
        };

        Ok(Self {
            source,
            mode,
            opacity,
            dx,
            dy,
            filters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn type_msg(r: HostResult<impl std::fmt::Debug>) -> String {
        let e = r.unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Type);
        e.message().to_string()
    }

    #[test]
    fn dimensions() {
        assert_eq!(
            Dimensions::parse(&[4.into(), 0.into()]).unwrap(),
            Dimensions { width: 4, height: 0 }
        );
        assert_eq!(type_msg(Dimensions::parse(&[4.into()])), "please provide Image width and height");
        assert_eq!(
            type_msg(Dimensions::parse(&[4.into(), 2.5.into()])),
            "Image 'width' and 'height' must be integers"
        );
        assert_eq!(
            type_msg(Dimensions::parse(&[(-1).into(), 2.into()])),
            "Image 'width' and 'height' must be integers"
        );
        assert_eq!(
            type_msg(Dimensions::parse(&["4".into(), 2.into()])),
            "Image 'width' and 'height' must be integers"
        );
    }

    #[test]
    fn encode_defaults_and_errors() {
        let req = EncodeRequest::parse(&[]).unwrap();
        assert_eq!(req.format, "png");
        assert!(req.palette.is_none());

        assert_eq!(type_msg(EncodeRequest::parse(&[1.into()])), "first arg, 'format' must be a string");
        assert_eq!(
            type_msg(EncodeRequest::parse(&["png".into(), 1.into()])),
            "optional second arg must be an options object"
        );
        let bad = Value::object([("palette", Value::from("nope"))]);
        assert_eq!(
            type_msg(EncodeRequest::parse(&["png".into(), bad])),
            "'palette' must be a Palette object"
        );

        let ignored = Value::object([("quality", Value::from("high"))]);
        assert!(EncodeRequest::parse(&["png".into(), ignored]).is_ok());
    }

    #[test]
    fn save_guesses_format() {
        let req = SaveRequest::parse(&["out.PNG".into()]).unwrap();
        assert_eq!(req.format, "png");
        assert_eq!(type_msg(SaveRequest::parse(&[])), "filename required");
        assert_eq!(type_msg(SaveRequest::parse(&[3.into()])), "filename required");
        assert_eq!(
            type_msg(SaveRequest::parse(&["a.png".into(), 3.into()])),
            "both 'filename' and 'format' arguments must be strings"
        );
        let err = SaveRequest::parse(&["a.xyz".into()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "unknown output extension for: a.xyz");
    }

    #[test]
    fn view_needs_four_integers() {
        let ok = ViewRequest::parse(&[0.into(), 1.into(), 2.into(), 3.into()]).unwrap();
        assert_eq!((ok.x, ok.y, ok.width, ok.height), (0, 1, 2, 3));
        let msg = "requires 4 integer arguments: x, y, width, height";
        assert_eq!(type_msg(ViewRequest::parse(&[0.into(), 1.into(), 2.into()])), msg);
        assert_eq!(type_msg(ViewRequest::parse(&[0.into(), 1.into(), 2.into(), "3".into()])), msg);
    }

    #[test]
    fn grayscale_color() {
        assert_eq!(GrayscaleRequest::parse(&[]).unwrap().color, None);
        let red = Color::rgb(255, 0, 0);
        assert_eq!(GrayscaleRequest::parse(&[red.into()]).unwrap().color, Some(red));
        assert_eq!(
            type_msg(GrayscaleRequest::parse(&["red".into()])),
            "optional argument must be a Color"
        );
    }

    #[test]
    fn open_and_from_bytes() {
        assert_eq!(type_msg(OpenRequest::parse(&[])), "must provide a string argument");
        assert_eq!(type_msg(OpenRequest::parse(&[1.into()])), "Argument must be a string");
        assert_eq!(type_msg(FromBytesRequest::parse(&[])), "must provide a buffer argument");
        assert_eq!(type_msg(FromBytesRequest::parse(&["x".into()])), "first argument must be a buffer");
        let req = FromBytesRequest::parse(&[vec![1u8, 2].into()]).unwrap();
        assert_eq!(&*req.bytes, &[1, 2]);
    }

    #[test]
    fn extra_positionals_mean_a_missing_callback() {
        assert_eq!(type_msg(OpenRequest::parse(&["a.png".into(), 5.into()])), MISSING_CALLBACK);
        assert_eq!(
            type_msg(FromBytesRequest::parse(&[vec![1u8].into(), "not a callback".into()])),
            MISSING_CALLBACK
        );
        let opts = Value::object([("x", Value::from(1))]);
        assert_eq!(
            type_msg(EncodeRequest::parse(&["png".into(), opts.clone(), 5.into()])),
            MISSING_CALLBACK
        );
        assert!(EncodeRequest::parse(&["png".into(), opts]).is_ok());
    }

    #[test]
    fn optional_callback_rules() {
        assert!(optional_callback(&[]).unwrap().is_none());
        assert!(optional_callback(&[Value::function(|_| {})]).unwrap().is_some());
        assert_eq!(type_msg(optional_callback(&[1.into()])), MISSING_CALLBACK);
    }

    #[test]
    fn options_projection() {
        let bag = Value::object([("n", Value::from(1.5)), ("s", Value::from("x"))]);
        let opts = Options::from_arg(Some(&bag), "unused").unwrap();
        assert!(opts.has("n"));
        assert!(!opts.has("missing"));
        assert_eq!(opts.number("n", "m").unwrap(), Some(1.5));
        assert_eq!(type_msg(opts.integer("n", "n must be an integer")), "n must be an integer");
        assert_eq!(opts.string("s", "m").unwrap(), Some("x"));
        assert_eq!(opts.integer("missing", "m").unwrap(), None);
    }
}
