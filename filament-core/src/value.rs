//! Interpolated Values
//!
//! Every `${...}` position of a template receives one [`Value`]. The set of
//! shapes the binder understands is closed: one variant per case, dispatched
//! with a single exhaustive `match` in the binder.

use std::fmt;
use std::rc::Rc;

use crate::bind::{Conditional, KeyedList};
use crate::dom::Event;
use crate::reactive::{LiveValue, Map, Signal, Source, SourceExt};
use crate::result::RenderResult;

/// A reactive source of values, type-erased for storage in [`Value`].
pub type ValueSource = Rc<dyn Source<Value>>;

/// A plain scalar: what attributes, properties and text nodes hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Primitive {
    /// JavaScript-style truthiness, used for boolean attributes.
    pub fn is_truthy(&self) -> bool {
        match self {
            Primitive::Null => false,
            Primitive::Bool(b) => *b,
            Primitive::Int(i) => *i != 0,
            Primitive::Float(f) => *f != 0.0 && !f.is_nan(),
            Primitive::Str(s) => !s.is_empty(),
        }
    }

    /// Attribute value for this primitive; `None` means "remove the attribute".
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            Primitive::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Text content for this primitive. `Null` renders as nothing.
    pub fn to_text(&self) -> String {
        match self {
            Primitive::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Null => f.write_str("null"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Int(i) => write!(f, "{i}"),
            Primitive::Float(x) => write!(f, "{x}"),
            Primitive::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! primitive_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Primitive {
            fn from(v: $t) -> Self {
                Primitive::Int(i64::from(v))
            }
        }
    )*};
}

primitive_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Primitive {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Primitive::Float(v as f64), Primitive::Int)
    }
}

impl From<u64> for Primitive {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Primitive::Float(v as f64), Primitive::Int)
    }
}

impl From<f32> for Primitive {
    fn from(v: f32) -> Self {
        Primitive::Float(f64::from(v))
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Float(v)
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Bool(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::Str(v.to_string())
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::Str(v)
    }
}

impl From<&String> for Primitive {
    fn from(v: &String) -> Self {
        Primitive::Str(v.clone())
    }
}

impl From<()> for Primitive {
    fn from(_: ()) -> Self {
        Primitive::Null
    }
}

impl<T: Into<Primitive>> From<Option<T>> for Primitive {
    fn from(v: Option<T>) -> Self {
        v.map_or(Primitive::Null, Into::into)
    }
}

/// A DOM event listener supplied by a template.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        Self(Rc::new(f))
    }

    pub(crate) fn call(&self, event: &Event) {
        (self.0)(event);
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

/// Wrap a closure as an event binding value: `@click=${on(|e| ...)}`.
pub fn on<F>(f: F) -> Value
where
    F: Fn(&Event) + 'static,
{
    Value::Handler(EventHandler::new(f))
}

/// Markup that is inserted *without* escaping.
///
/// This is the only way unescaped markup reaches the document. Plain text
/// interpolation is always assigned as text.
#[derive(Clone)]
pub struct RawHtml {
    pub(crate) markup: RawMarkup,
    pub(crate) wrapper: Option<String>,
}

#[derive(Clone)]
pub(crate) enum RawMarkup {
    Static(String),
    Reactive(Rc<dyn Source<String>>),
}

impl RawHtml {
    /// Override the wrapper element tag (default comes from the config).
    pub fn wrapper(mut self, tag: impl Into<String>) -> Self {
        self.wrapper = Some(tag.into());
        self
    }
}

impl fmt::Debug for RawHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.markup {
            RawMarkup::Static(s) => f.debug_tuple("RawHtml").field(s).finish(),
            RawMarkup::Reactive(_) => f.write_str("RawHtml(<reactive>)"),
        }
    }
}

/// Unescaped static markup.
pub fn raw_html(markup: impl Into<String>) -> RawHtml {
    RawHtml {
        markup: RawMarkup::Static(markup.into()),
        wrapper: None,
    }
}

/// Unescaped markup that follows a source.
pub fn raw_html_reactive<S>(source: S) -> RawHtml
where
    S: Source<String> + 'static,
{
    RawHtml {
        markup: RawMarkup::Reactive(Rc::new(source)),
        wrapper: None,
    }
}

/// One interpolated template value.
#[derive(Clone)]
pub enum Value {
    /// A static scalar.
    Primitive(Primitive),
    /// A source of further values (scalars or nested render results).
    Reactive(ValueSource),
    /// An event listener.
    Handler(EventHandler),
    /// An already-produced nested render result.
    Result(RenderResult),
    /// Unescaped markup.
    Html(RawHtml),
    /// A conditional binding descriptor.
    When(Conditional),
    /// A keyed list binding descriptor.
    Each(KeyedList),
}

impl Value {
    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Primitive(_) => "primitive",
            Value::Reactive(_) => "reactive",
            Value::Handler(_) => "handler",
            Value::Result(_) => "render-result",
            Value::Html(_) => "raw-html",
            Value::When(_) => "conditional",
            Value::Each(_) => "list",
        }
    }

    pub fn null() -> Self {
        Value::Primitive(Primitive::Null)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Primitive(p) => f.debug_tuple("Primitive").field(p).finish(),
            Value::Html(raw) => raw.fmt(f),
            other => write!(f, "Value::{}", other.kind_name()),
        }
    }
}

/// Erase any source into a [`Value::Reactive`].
pub fn reactive<S, T>(source: S) -> Value
where
    S: Source<T> + 'static,
    T: Into<Value> + Clone + 'static,
{
    Value::Reactive(Rc::new(source.map(|v: &T| v.clone().into())))
}

macro_rules! value_from_primitive {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Primitive(v.into())
            }
        }
    )*};
}

value_from_primitive!(
    i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, bool, &str, String, &String, (), Primitive
);

impl<T: Into<Primitive>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        Value::Primitive(v.into())
    }
}

impl From<RenderResult> for Value {
    fn from(v: RenderResult) -> Self {
        Value::Result(v)
    }
}

impl From<EventHandler> for Value {
    fn from(v: EventHandler) -> Self {
        Value::Handler(v)
    }
}

impl From<RawHtml> for Value {
    fn from(v: RawHtml) -> Self {
        Value::Html(v)
    }
}

impl From<Conditional> for Value {
    fn from(v: Conditional) -> Self {
        Value::When(v)
    }
}

impl From<KeyedList> for Value {
    fn from(v: KeyedList) -> Self {
        Value::Each(v)
    }
}

impl<T> From<Signal<T>> for Value
where
    T: Into<Value> + Clone + 'static,
{
    fn from(v: Signal<T>) -> Self {
        reactive(v)
    }
}

impl<T> From<LiveValue<T>> for Value
where
    T: Into<Value> + Clone + 'static,
{
    fn from(v: LiveValue<T>) -> Self {
        reactive(v)
    }
}

impl<S, T, U, F> From<Map<S, T, F>> for Value
where
    S: Source<T> + 'static,
    T: 'static,
    F: Fn(&T) -> U + 'static,
    U: Into<Value> + Clone + 'static,
{
    fn from(v: Map<S, T, F>) -> Self {
        reactive(v)
    }
}
