//! Parameter binding.
//!
//! Every formal argument of an operation is declared as a [`Param`] naming
//! where the value comes from and the type it converts to. At dispatch time
//! the declared parameters are resolved, in order, into [`Arguments`]:
//!
//! ```ignore
//! Operation::get("/{id}")
//!     .param(Param::path::<u64>("id"))
//!     .param(Param::query::<String>("expand"))
//!     .handler(|users: &Users, mut args| {
//!         let id: u64 = args.take(0)?;
//!         let expand: Option<String> = args.optional(1)?;
//!         users.find(id, expand)
//!     })
//! ```

use crate::codec::{self, Format};
use crate::logging::trace;
use crate::media::choose_decode_format;
use crate::{ContentPart, Error, FormValues, HeaderMap, HttpRequest, MediaType, PathValues};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// A resolved argument value.
pub type Value = Box<dyn Any + Send>;

type TextConversion = fn(&str) -> Result<Value, Error>;
type BodyDecoder = fn(&[u8], Format) -> Result<Value, Error>;

/// Where a parameter's value is taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// A variable of the matched path template
    Path(String),
    /// First value of a query parameter
    Query(String),
    /// First value of a pre-parsed form field
    Form(String),
    /// Value of a request header
    Header(String),
    /// A readable cursor over the body
    RawBody,
    /// The body bytes
    RawBytes,
    /// The whole request
    RawRequest,
    /// The content part's headers
    RawHeaders,
    /// The content part itself
    RawContentPart,
    /// The body decoded through the negotiated codec
    TypedBody,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::Path(name) => write!(f, "path parameter '{}'", name),
            ParamSource::Query(name) => write!(f, "query parameter '{}'", name),
            ParamSource::Form(name) => write!(f, "form parameter '{}'", name),
            ParamSource::Header(name) => write!(f, "header '{}'", name),
            ParamSource::RawBody => f.write_str("body stream"),
            ParamSource::RawBytes => f.write_str("body bytes"),
            ParamSource::RawRequest => f.write_str("request"),
            ParamSource::RawHeaders => f.write_str("headers"),
            ParamSource::RawContentPart => f.write_str("content part"),
            ParamSource::TypedBody => f.write_str("body"),
        }
    }
}

#[derive(Clone, Copy)]
enum Conversion {
    Text(TextConversion),
    Body(BodyDecoder),
    Raw,
}

/// Declaration of one operation argument.
#[derive(Clone)]
pub struct Param {
    source: ParamSource,
    conversion: Conversion,
    type_name: &'static str,
}

impl Param {
    fn text<T: FromParam + Send + 'static>(source: ParamSource) -> Self {
        Self {
            source,
            conversion: Conversion::Text(convert_text::<T>),
            type_name: std::any::type_name::<T>(),
        }
    }

    fn raw<T: 'static>(source: ParamSource) -> Self {
        Self {
            source,
            conversion: Conversion::Raw,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// A path template variable converted to `T`.
    pub fn path<T: FromParam + Send + 'static>(name: impl Into<String>) -> Self {
        Self::text::<T>(ParamSource::Path(name.into()))
    }

    /// The first value of a query parameter converted to `T`.
    pub fn query<T: FromParam + Send + 'static>(name: impl Into<String>) -> Self {
        Self::text::<T>(ParamSource::Query(name.into()))
    }

    /// The first value of a form field converted to `T`.
    pub fn form<T: FromParam + Send + 'static>(name: impl Into<String>) -> Self {
        Self::text::<T>(ParamSource::Form(name.into()))
    }

    /// A request header converted to `T`.
    pub fn header<T: FromParam + Send + 'static>(name: impl Into<String>) -> Self {
        Self::text::<T>(ParamSource::Header(name.into()))
    }

    /// The request body decoded as `T` in the negotiated format.
    pub fn body<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            source: ParamSource::TypedBody,
            conversion: Conversion::Body(decode_body::<T>),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The body bytes, bound as [`Bytes`].
    pub fn bytes() -> Self {
        Self::raw::<Bytes>(ParamSource::RawBytes)
    }

    /// A reader over the body, bound as `Cursor<Bytes>`.
    pub fn stream() -> Self {
        Self::raw::<Cursor<Bytes>>(ParamSource::RawBody)
    }

    /// The request, bound as `Arc<HttpRequest>`.
    pub fn request() -> Self {
        Self::raw::<Arc<HttpRequest>>(ParamSource::RawRequest)
    }

    /// The content part headers, bound as [`HeaderMap`].
    pub fn headers() -> Self {
        Self::raw::<HeaderMap>(ParamSource::RawHeaders)
    }

    /// The content part, bound as [`ContentPart`].
    pub fn content() -> Self {
        Self::raw::<ContentPart>(ParamSource::RawContentPart)
    }

    pub fn source(&self) -> &ParamSource {
        &self.source
    }

    /// Name of the declared Rust type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn resolve(&self, ctx: &DispatchContext<'_>) -> Result<Option<Value>, Error> {
        let text = match &self.source {
            ParamSource::Path(name) => ctx.path_values.get(name),
            ParamSource::Query(name) => ctx.query.first(name),
            ParamSource::Header(name) => ctx.content.headers.get(name).map(String::as_str),
            ParamSource::Form(name) => {
                let form = ctx.form.ok_or_else(|| {
                    Error::MissingFormParameters("no form parameters available".into())
                })?;
                form.first(name)
            }
            ParamSource::RawBody => {
                return Ok(Some(Box::new(Cursor::new(ctx.content.body.clone()))));
            }
            ParamSource::RawBytes => return Ok(Some(Box::new(ctx.content.body.clone()))),
            ParamSource::RawRequest => return Ok(Some(Box::new(ctx.request.clone()))),
            ParamSource::RawHeaders => return Ok(Some(Box::new(ctx.content.headers.clone()))),
            ParamSource::RawContentPart => return Ok(Some(Box::new(ctx.content.clone()))),
            ParamSource::TypedBody => return self.decode(ctx),
        };

        match (text, self.conversion) {
            (None, _) => Ok(None),
            (Some(raw), Conversion::Text(convert)) => convert(raw).map(Some).map_err(|e| match e {
                Error::InvalidParameter(msg) => {
                    Error::InvalidParameter(format!("{}: {}", self.source, msg))
                }
                other => other,
            }),
            (Some(_), _) => Err(Error::InvalidParameterBinding(format!(
                "{} has no text conversion",
                self.source
            ))),
        }
    }

    fn decode(&self, ctx: &DispatchContext<'_>) -> Result<Option<Value>, Error> {
        let Conversion::Body(decoder) = self.conversion else {
            return Err(Error::InvalidParameterBinding(format!(
                "{} has no body decoder",
                self.source
            )));
        };
        let format = choose_decode_format(ctx.consumes, ctx.content_type)?;
        if ctx.content.body.is_empty() {
            return Ok(None);
        }
        decoder(&ctx.content.body, format).map(Some)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("source", &self.source)
            .field("type", &self.type_name)
            .finish()
    }
}

fn convert_text<T: FromParam + Send + 'static>(raw: &str) -> Result<Value, Error> {
    T::from_param(raw).map(|value| Box::new(value) as Value)
}

fn decode_body<T: DeserializeOwned + Send + 'static>(
    bytes: &[u8],
    format: Format,
) -> Result<Value, Error> {
    codec::decode::<T>(bytes, format).map(|value| Box::new(value) as Value)
}

/// Conversion of a textual parameter into a typed argument.
pub trait FromParam: Sized {
    fn from_param(value: &str) -> Result<Self, Error>;
}

impl FromParam for String {
    fn from_param(value: &str) -> Result<Self, Error> {
        Ok(value.to_string())
    }
}

macro_rules! impl_from_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromParam for $ty {
                fn from_param(value: &str) -> Result<Self, Error> {
                    value.trim().parse::<$ty>().map_err(|e| {
                        Error::InvalidParameter(format!(
                            "cannot convert '{}' to {}: {}",
                            value,
                            stringify!($ty),
                            e
                        ))
                    })
                }
            }
        )*
    };
}

impl_from_param!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char
);

/// Per-request state the parameters are resolved from.
pub struct DispatchContext<'a> {
    pub request: &'a Arc<HttpRequest>,
    pub content: &'a ContentPart,
    /// The path remainder after the base path and resource prefix
    pub path: &'a str,
    pub path_values: PathValues,
    pub query: FormValues,
    /// Raw Content-Type of the body
    pub content_type: Option<&'a str>,
    /// Pre-parsed form values, for URL-encoded bodies
    pub form: Option<&'a FormValues>,
    /// Media types the matched operation consumes
    pub consumes: Option<&'a [MediaType]>,
}

/// Resolve declared parameters into arguments, in declaration order.
pub fn resolve(params: &[Param], ctx: &DispatchContext<'_>) -> Result<Arguments, Error> {
    let mut slots = Vec::with_capacity(params.len());
    for param in params {
        trace!(source = %param.source, ty = param.type_name, "Finding parameter");
        slots.push(Slot {
            source: param.source.clone(),
            value: param.resolve(ctx)?,
        });
    }
    trace!(count = slots.len(), path = ctx.path, "Arguments resolved");
    Ok(Arguments { slots })
}

struct Slot {
    source: ParamSource,
    value: Option<Value>,
}

/// Resolved arguments, positionally aligned with the declared parameters.
///
/// Absent values (a missing query parameter, an empty body) are kept as
/// empty slots: [`take`](Self::take) rejects them, [`optional`](Self::optional)
/// turns them into `None`.
#[derive(Default)]
pub struct Arguments {
    slots: Vec<Slot>,
}

impl Arguments {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the argument at `index` has a value.
    pub fn is_present(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .map(|slot| slot.value.is_some())
            .unwrap_or(false)
    }

    /// Take a required argument.
    pub fn take<T: 'static>(&mut self, index: usize) -> Result<T, Error> {
        let source = self.source(index)?.clone();
        self.optional(index)?
            .ok_or_else(|| Error::MissingParameter(source.to_string()))
    }

    /// Take an argument that may be absent.
    pub fn optional<T: 'static>(&mut self, index: usize) -> Result<Option<T>, Error> {
        let count = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            Error::InvalidParameterBinding(format!(
                "argument {} requested but only {} declared",
                index, count
            ))
        })?;

        match slot.value.take() {
            None => Ok(None),
            Some(value) => match value.downcast::<T>() {
                Ok(typed) => Ok(Some(*typed)),
                Err(original) => {
                    slot.value = Some(original);
                    Err(Error::InvalidParameterBinding(format!(
                        "{} is not bound as {}",
                        slot.source,
                        std::any::type_name::<T>()
                    )))
                }
            },
        }
    }

    fn source(&self, index: usize) -> Result<&ParamSource, Error> {
        self.slots
            .get(index)
            .map(|slot| &slot.source)
            .ok_or_else(|| {
                Error::InvalidParameterBinding(format!(
                    "argument {} requested but only {} declared",
                    index,
                    self.slots.len()
                ))
            })
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.slots
                    .iter()
                    .map(|slot| (&slot.source, slot.value.is_some())),
            )
            .finish()
    }
}
