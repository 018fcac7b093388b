//! Request dispatching for one resource type.
//!
//! A [`Dispatcher`] compiles the operations of a [`Resource`] once, when it
//! is built, and answers requests against them afterwards:
//!
//! 1. requests without a content part are not handled;
//! 2. the target is percent-decoded and normalised, then the base path and
//!    the resource path are stripped;
//! 3. the first route, in registration order, whose verb and template match
//!    the remainder is executed;
//! 4. the operation's reply is marshalled into the response.
//!
//! `Ok(None)` means "not handled"; mounting layers turn it into a 404.

use crate::logging::{debug, debug_span, trace, warn};
use crate::param::{self, DispatchContext};
use crate::reply::produce_response;
use crate::{
    ContentPart, ContextObjects, DispatcherConfig, Error, FormValues, HttpMethod, HttpRequest, HttpResponse,
    MediaType, Operation, RequestContext, Resource, RoleHandler, RouteDescriptor,
};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Routes requests onto the operations of resource `R`.
pub struct Dispatcher<R: Resource> {
    base_path: String,
    prefix: String,
    routes: Vec<RouteDescriptor<R>>,
    role_handler: Option<Arc<dyn RoleHandler>>,
    objects: ContextObjects,
}

impl<R: Resource> Dispatcher<R> {
    pub fn builder() -> DispatcherBuilder<R> {
        DispatcherBuilder::new()
    }

    /// Build a dispatcher for `R` mounted under `base_path`.
    pub fn new(
        base_path: impl Into<String>,
        role_handler: Option<Arc<dyn RoleHandler>>,
        objects: ContextObjects,
    ) -> Result<Self, Error> {
        let mut builder = Self::builder().base_path(base_path).objects(objects);
        if let Some(handler) = role_handler {
            builder = builder.shared_role_handler(handler);
        }
        builder.build()
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Base path joined with the resource path.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Compiled routes, in registration order.
    pub fn routes(&self) -> &[RouteDescriptor<R>] {
        &self.routes
    }

    /// Handle a request.
    ///
    /// Returns `Ok(None)` when the request is not addressed to this resource.
    pub fn handle(&self, request: impl Into<Arc<HttpRequest>>) -> Result<Option<HttpResponse>, Error> {
        let request = request.into();
        let Some(content) = request.content.as_ref() else {
            trace!(uri = %request.target, "Request has no content part");
            return Ok(None);
        };

        let span = debug_span!("dispatch", method = %request.method, uri = %request.target);
        let _enter = span.enter();

        let path = normalize_path(request.path())?;
        if !path.starts_with(&self.base_path) || !path.starts_with(&self.prefix) {
            return Ok(None);
        }
        let remainder = strip_prefix(&path, &self.prefix);

        let verb = HttpMethod::from_str(&request.method)
            .ok_or_else(|| Error::UnsupportedMethod(request.method.clone()))?;

        let Some(route) = self.routes.iter().find(|route| route.matches(verb, remainder)) else {
            trace!(path = remainder, "No route matched");
            return Ok(None);
        };

        self.execute(route, &request, content, remainder).map(Some)
    }

    fn execute(
        &self,
        route: &RouteDescriptor<R>,
        request: &Arc<HttpRequest>,
        content: &ContentPart,
        path: &str,
    ) -> Result<HttpResponse, Error> {
        debug!(operation = route.name(), resource = std::any::type_name::<R>(), "Executing operation");

        let content_type = content.content_type();
        let media = content_type.and_then(MediaType::parse);
        if let Some(media) = &media {
            if media.essence_eq(&MediaType::multipart_form_data()) {
                return Err(Error::NotImplemented(
                    "Multipart forms are currently not supported".into(),
                ));
            }
            if media.essence_eq(&MediaType::form_urlencoded()) && content.form().is_none() {
                return Err(Error::MalformedFormRequest(
                    "The form request was not correctly parsed".into(),
                ));
            }
        }

        let query = match request.query() {
            Some(query) => FormValues::parse_query(query)?,
            None => FormValues::new(),
        };
        let path_values = route
            .template()
            .extract(path)
            .ok_or_else(|| Error::internal(format!("route '{}' stopped matching", route.name())))?;

        // Form values only bind when the body is declared as a urlencoded form.
        let form = media
            .as_ref()
            .filter(|media| media.essence_eq(&MediaType::form_urlencoded()))
            .and_then(|_| content.form());
        let ctx = DispatchContext {
            request,
            content,
            path,
            path_values,
            query,
            content_type,
            form,
            consumes: route.consumes(),
        };
        let args = param::resolve(route.params(), &ctx)?;

        let resource = R::create(&RequestContext::new(
            request.clone(),
            self.role_handler.clone(),
            self.objects.clone(),
        ))?;

        let reply = match panic::catch_unwind(AssertUnwindSafe(|| route.invoke(&resource, args))) {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                let err = crate::error::unwind(err);
                if matches!(err, Error::Internal { .. }) {
                    warn!(operation = route.name(), error = %err, "Operation failed unexpectedly");
                }
                return Err(err);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(operation = route.name(), panic = %message, "Operation panicked");
                return Err(Error::internal(message));
            }
        };

        produce_response(reply, route.produces(), content.headers.accept().map(String::as_str))
    }
}

impl<R: Resource> fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("resource", &std::any::type_name::<R>())
            .field("base_path", &self.base_path)
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .finish()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<R: Resource> {
    base_path: String,
    role_handler: Option<Arc<dyn RoleHandler>>,
    objects: ContextObjects,
    default_produces: Option<Vec<String>>,
    default_consumes: Option<Vec<String>>,
    operations: Option<Vec<Operation<R>>>,
}

impl<R: Resource> DispatcherBuilder<R> {
    pub fn new() -> Self {
        Self {
            base_path: "/".to_string(),
            role_handler: None,
            objects: ContextObjects::new(),
            default_produces: None,
            default_consumes: None,
            operations: None,
        }
    }

    /// Path all requests must start with; defaults to `/`.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn role_handler<H: RoleHandler + 'static>(self, handler: H) -> Self {
        self.shared_role_handler(Arc::new(handler))
    }

    pub fn shared_role_handler(mut self, handler: Arc<dyn RoleHandler>) -> Self {
        self.role_handler = Some(handler);
        self
    }

    /// Add a context object handed to every created resource.
    pub fn context<T: Any + Send + Sync>(mut self, object: T) -> Self {
        self.objects.insert(object);
        self
    }

    /// Replace all context objects.
    pub fn objects(mut self, objects: ContextObjects) -> Self {
        self.objects = objects;
        self
    }

    /// Use these operations instead of [`Resource::operations`].
    pub fn operations(mut self, operations: Vec<Operation<R>>) -> Self {
        self.operations = Some(operations);
        self
    }

    /// Apply the base path and media defaults of a configuration.
    pub fn config(mut self, config: &DispatcherConfig) -> Self {
        self.base_path = config.base_path.clone();
        if config.default_produces.is_some() {
            self.default_produces = config.default_produces.clone();
        }
        if config.default_consumes.is_some() {
            self.default_consumes = config.default_consumes.clone();
        }
        self
    }

    pub fn build(self) -> Result<Dispatcher<R>, Error> {
        let base_path = normalize_base(&self.base_path);
        let prefix = join_prefix(&base_path, R::path());

        let default_produces = parse_defaults(self.default_produces.as_deref())?;
        let default_consumes = parse_defaults(self.default_consumes.as_deref())?;

        let operations = self.operations.unwrap_or_else(R::operations);
        let mut names = HashSet::with_capacity(operations.len());
        let mut routes = Vec::with_capacity(operations.len());

        for operation in operations {
            let mut route = RouteDescriptor::compile(operation)?;
            if !names.insert(route.name().to_string()) {
                return Err(Error::InvalidRoute(format!(
                    "duplicate operation name '{}'",
                    route.name()
                )));
            }
            route.inherit_media(default_produces.as_deref(), default_consumes.as_deref());
            trace!(operation = route.name(), template = route.template().as_str(), "Route compiled");
            routes.push(route);
        }

        debug!(
            resource = std::any::type_name::<R>(),
            prefix = %prefix,
            route_count = routes.len(),
            "Dispatcher built"
        );

        Ok(Dispatcher {
            base_path,
            prefix,
            routes,
            role_handler: self.role_handler,
            objects: self.objects,
        })
    }
}

impl<R: Resource> Default for DispatcherBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_defaults(types: Option<&[String]>) -> Result<Option<Vec<MediaType>>, Error> {
    types
        .map(|types| {
            types
                .iter()
                .map(|raw| {
                    MediaType::parse(raw).ok_or_else(|| {
                        Error::InvalidRoute(format!("invalid default media type '{}'", raw))
                    })
                })
                .collect()
        })
        .transpose()
}

fn normalize_base(base_path: &str) -> String {
    let trimmed = base_path.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Base path joined with the resource path.
fn join_prefix(base_path: &str, resource_path: Option<&str>) -> String {
    match resource_path.map(str::trim) {
        None | Some("") | Some("/") => base_path.to_string(),
        Some(path) => {
            let path = if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{}", path)
            };
            if base_path == "/" {
                path
            } else {
                format!("{}{}", base_path.trim_end_matches('/'), path)
            }
        }
    }
}

/// Strip the prefix minus its trailing slashes so the remainder keeps its
/// leading `/`.
fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    let remainder = &path[prefix.trim_end_matches('/').len()..];
    if remainder.is_empty() { "/" } else { remainder }
}

/// Percent-decode a path and resolve empty, `.` and `..` segments.
pub fn normalize_path(raw: &str) -> Result<String, Error> {
    let decoded = urlencoding::decode(raw)
        .map_err(|e| Error::internal(format!("cannot decode path '{}': {}", raw, e)))?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut path = String::with_capacity(decoded.len() + 1);
    for segment in &segments {
        path.push('/');
        path.push_str(segment);
    }
    let trailing = decoded.ends_with('/') || decoded.ends_with("/.") || decoded.ends_with("/..");
    if path.is_empty() || trailing {
        path.push('/');
    }
    Ok(path)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_string()
    }
}
