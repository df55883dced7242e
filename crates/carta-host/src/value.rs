//! Loosely typed host values.
//!
//! Host code calls into the image object with slices of [`Value`]. Values
//! that refer to host objects (`Image`, `View`, `Function`) are reference
//! counted with [`Rc`] and therefore cannot leave the main thread.

use crate::{Error, Image, ImageView};
use carta_core::{Color, Palette};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Options bag: string keys to values.
pub type Object = BTreeMap<String, Value>;

/// Completion capability, invoked with `(err, value?)`.
///
/// ```rust
/// use carta_host::{Function, Value};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let calls = Rc::new(Cell::new(0));
/// let seen = calls.clone();
/// let cb = Function::new(move |args: &[Value]| {
///     assert!(args[0].is_null());
///     seen.set(seen.get() + 1);
/// });
/// cb.call(&[Value::Null]);
/// assert_eq!(calls.get(), 1);
/// ```
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&[Value])>);

impl Function {
    /// Wraps a closure.
    pub fn new(f: impl Fn(&[Value]) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the function.
    pub fn call(&self, args: &[Value]) {
        (self.0)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

/// A host value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number. Integers are numbers without a fractional part.
    Number(f64),
    /// String.
    String(String),
    /// Immutable byte buffer.
    Buffer(Arc<[u8]>),
    /// Options bag.
    Object(Object),
    /// Image object.
    Image(Image),
    /// Color object.
    Color(Color),
    /// Palette object.
    Palette(Arc<Palette>),
    /// View object.
    View(ImageView),
    /// Callable.
    Function(Function),
    /// Error object.
    Error(Error),
}

impl Value {
    /// Builds an options bag from key/value pairs.
    ///
    /// ```rust
    /// use carta_host::Value;
    ///
    /// let opts = Value::object([("dx", Value::from(4)), ("opacity", Value::from(0.5))]);
    /// assert!(opts.as_object().unwrap().contains_key("dx"));
    /// ```
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wraps a closure as [`Value::Function`].
    pub fn function(f: impl Fn(&[Value]) + 'static) -> Self {
        Value::Function(Function::new(f))
    }

    /// Host type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Buffer(_) => "buffer",
            Value::Object(_) => "object",
            Value::Image(_) => "Image",
            Value::Color(_) => "Color",
            Value::Palette(_) => "Palette",
            Value::View(_) => "View",
            Value::Function(_) => "function",
            Value::Error(_) => "error",
        }
    }

    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for [`Value::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// `true` for [`Value::Function`].
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Number, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Number without a fractional part, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 => {
                Some(*n as i64)
            }
            _ => None,
        }
    }

    /// String, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte buffer, if any.
    pub fn as_buffer(&self) -> Option<&Arc<[u8]>> {
        match self {
            Value::Buffer(b) => Some(b),
            _ => None,
        }
    }

    /// Options bag, if any.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Image, if any.
    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Value::Image(i) => Some(i),
            _ => None,
        }
    }

    /// Color, if any.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Palette, if any.
    pub fn as_palette(&self) -> Option<&Arc<Palette>> {
        match self {
            Value::Palette(p) => Some(p),
            _ => None,
        }
    }

    /// View, if any.
    pub fn as_view(&self) -> Option<&ImageView> {
        match self {
            Value::View(v) => Some(v),
            _ => None,
        }
    }

    /// Function, if any.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Error, if any.
    pub fn as_error(&self) -> Option<&Error> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Buffer(v.into())
    }
}

impl From<Image> for Value {
    fn from(v: Image) -> Self {
        Value::Image(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<Palette> for Value {
    fn from(v: Palette) -> Self {
        Value::Palette(Arc::new(v))
    }
}

impl From<Error> for Value {
    fn from(v: Error) -> Self {
        Value::Error(v)
    }
}

impl From<Function> for Value {
    fn from(v: Function) -> Self {
        Value::Function(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(Value::from(3).as_integer(), Some(3));
        assert_eq!(Value::from(-2.0).as_integer(), Some(-2));
        assert_eq!(Value::from(2.5).as_integer(), None);
        assert_eq!(Value::from(f64::NAN).as_integer(), None);
        assert_eq!(Value::from(f64::INFINITY).as_integer(), None);
        assert_eq!(Value::from("3").as_integer(), None);
    }

    #[test]
    fn object_builder() {
        let v = Value::object([("a", Value::Null), ("b", Value::from(true))]);
        let o = v.as_object().unwrap();
        assert_eq!(o.len(), 2);
        assert!(o["a"].is_null());
    }

    #[test]
    fn buffers_share_bytes() {
        let v = Value::from(vec![1u8, 2, 3]);
        let w = v.clone();
        assert!(Arc::ptr_eq(v.as_buffer().unwrap(), w.as_buffer().unwrap()));
    }
}
