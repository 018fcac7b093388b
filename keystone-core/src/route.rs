//! Operation declarations and the route descriptors compiled from them.

use crate::reply::IntoReply;
use crate::{Arguments, BoxError, Error, HttpMethod, MediaType, Param, PathTemplate, Reply, Resource};
use std::fmt;

/// Type-erased operation handler.
pub type HandlerFn<R> = dyn Fn(&R, Arguments) -> Result<Reply, BoxError> + Send + Sync;

/// Declaration of one operation of a resource.
///
/// ```ignore
/// Operation::post("/{id}/items")
///     .name("add_item")
///     .consumes(&["application/json"])
///     .param(Param::path::<u64>("id"))
///     .param(Param::body::<Item>())
///     .handler(|cart: &Cart, mut args| cart.add(args.take(0)?, args.take(1)?))
/// ```
pub struct Operation<R> {
    verb: HttpMethod,
    path: Option<String>,
    name: Option<String>,
    produces: Option<Vec<String>>,
    consumes: Option<Vec<String>>,
    params: Vec<Param>,
    handler: Option<Box<HandlerFn<R>>>,
}

impl<R: Resource> Operation<R> {
    pub fn new(verb: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: Some(path.into()),
            name: None,
            produces: None,
            consumes: None,
            params: Vec::new(),
            handler: None,
        }
    }

    /// An operation bound to the resource path itself.
    pub fn at_root(verb: HttpMethod) -> Self {
        Self {
            path: None,
            ..Self::new(verb, "")
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::DELETE, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::HEAD, path)
    }

    pub fn options(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::OPTIONS, path)
    }

    /// Name used in logs and for duplicate detection.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Media types this operation produces; overrides the resource's.
    pub fn produces(mut self, types: &[&str]) -> Self {
        self.produces = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Media types this operation consumes; overrides the resource's.
    pub fn consumes(mut self, types: &[&str]) -> Self {
        self.consumes = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Declare the next formal argument.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn handler<F, T, E>(mut self, handler: F) -> Self
    where
        F: Fn(&R, Arguments) -> Result<T, E> + Send + Sync + 'static,
        T: IntoReply,
        E: Into<BoxError>,
    {
        self.handler = Some(Box::new(move |resource: &R, args: Arguments| {
            handler(resource, args)
                .map(IntoReply::into_reply)
                .map_err(Into::into)
        }));
        self
    }
}

/// A compiled, immutable operation.
pub struct RouteDescriptor<R> {
    name: String,
    verb: HttpMethod,
    template: PathTemplate,
    produces: Option<Vec<MediaType>>,
    consumes: Option<Vec<MediaType>>,
    params: Vec<Param>,
    handler: Box<HandlerFn<R>>,
}

impl<R: Resource> RouteDescriptor<R> {
    /// Compile an operation, falling back to the resource-level media types.
    pub fn compile(operation: Operation<R>) -> Result<Self, Error> {
        let path = match operation.path.as_deref().map(str::trim) {
            None | Some("") => "/".to_string(),
            Some(path) if path.starts_with('/') => path.to_string(),
            Some(path) => format!("/{}", path),
        };
        let name = operation
            .name
            .unwrap_or_else(|| format!("{} {}", operation.verb, path));

        let handler = operation
            .handler
            .ok_or_else(|| Error::InvalidRoute(format!("operation '{}' has no handler", name)))?;
        let template = PathTemplate::compile(&path)?;

        let produces = match operation.produces {
            Some(types) => Some(parse_media_types(&name, &types)?),
            None => R::produces()
                .map(|types| parse_media_types(&name, types))
                .transpose()?,
        };
        let consumes = match operation.consumes {
            Some(types) => Some(parse_media_types(&name, &types)?),
            None => R::consumes()
                .map(|types| parse_media_types(&name, types))
                .transpose()?,
        };

        Ok(Self {
            name,
            verb: operation.verb,
            template,
            produces,
            consumes,
            params: operation.params,
            handler,
        })
    }
}

impl<R> RouteDescriptor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verb(&self) -> HttpMethod {
        self.verb
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn produces(&self) -> Option<&[MediaType]> {
        self.produces.as_deref()
    }

    pub fn consumes(&self) -> Option<&[MediaType]> {
        self.consumes.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Fill media types neither the operation nor the resource declared.
    pub(crate) fn inherit_media(&mut self, produces: Option<&[MediaType]>, consumes: Option<&[MediaType]>) {
        if self.produces.is_none() {
            self.produces = produces.map(<[MediaType]>::to_vec);
        }
        if self.consumes.is_none() {
            self.consumes = consumes.map(<[MediaType]>::to_vec);
        }
    }

    /// Whether this route answers `verb` on `path`.
    pub fn matches(&self, verb: HttpMethod, path: &str) -> bool {
        self.verb == verb && self.template.matches(path)
    }

    pub fn invoke(&self, resource: &R, args: Arguments) -> Result<Reply, BoxError> {
        (self.handler)(resource, args)
    }
}

impl<R> fmt::Debug for RouteDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("name", &self.name)
            .field("verb", &self.verb)
            .field("template", &self.template.as_str())
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .field("params", &self.params)
            .finish()
    }
}

fn parse_media_types<S: AsRef<str>>(route: &str, types: &[S]) -> Result<Vec<MediaType>, Error> {
    types
        .iter()
        .map(|raw| {
            MediaType::parse(raw.as_ref()).ok_or_else(|| {
                Error::InvalidRoute(format!(
                    "operation '{}' declares invalid media type '{}'",
                    route,
                    raw.as_ref()
                ))
            })
        })
        .collect()
}
