// Request-scoped context handed to resources

use crate::logging::{debug, trace};
use crate::{AUTHENTICATION_SCHEME_HEADER, HttpRequest, Principal, RoleHandler};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied objects made available to every request-scoped resource.
///
/// Objects keep their registration order; lookups return the first object of
/// the requested type.
#[derive(Clone, Default)]
pub struct ContextObjects {
    objects: Vec<Arc<dyn Any + Send + Sync>>,
}

impl ContextObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object.
    pub fn insert<T: Any + Send + Sync>(&mut self, object: T) {
        self.insert_arc(Arc::new(object));
    }

    /// Register an already shared object.
    pub fn insert_arc<T: Any + Send + Sync>(&mut self, object: Arc<T>) {
        let type_name = std::any::type_name::<T>();
        self.objects.push(object);
        debug!(object = type_name, "Context object registered");
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: Any + Send + Sync>(mut self, object: T) -> Self {
        self.insert(object);
        self
    }

    /// First registered object of type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let found = self
            .objects
            .iter()
            .find_map(|object| object.clone().downcast::<T>().ok());
        trace!(
            object = std::any::type_name::<T>(),
            found = found.is_some(),
            "Resolved context object"
        );
        found
    }

    pub fn has<T: Any + Send + Sync>(&self) -> bool {
        self.objects.iter().any(|object| object.is::<T>())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl fmt::Debug for ContextObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextObjects")
            .field("len", &self.objects.len())
            .finish()
    }
}

/// Security view of the current request.
#[derive(Clone)]
pub struct SecurityContext {
    request: Arc<HttpRequest>,
    role_handler: Option<Arc<dyn RoleHandler>>,
}

impl SecurityContext {
    pub fn new(request: Arc<HttpRequest>, role_handler: Option<Arc<dyn RoleHandler>>) -> Self {
        Self {
            request,
            role_handler,
        }
    }

    /// Name of the scheme that authenticated the caller.
    pub fn authentication_scheme(&self) -> Option<&str> {
        self.request.header(AUTHENTICATION_SCHEME_HEADER)
    }

    pub fn user_principal(&self) -> Option<&Principal> {
        self.request.principal.as_ref()
    }

    pub fn is_secure(&self) -> bool {
        self.request.secure
    }

    /// Whether the caller holds `role`.
    ///
    /// Always false for anonymous callers or without a role handler.
    pub fn is_user_in_role(&self, role: &str) -> bool {
        match (&self.role_handler, self.user_principal()) {
            (Some(handler), Some(principal)) => handler.has_role(principal, role),
            _ => false,
        }
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("principal", &self.user_principal())
            .field("secure", &self.is_secure())
            .field("role_handler", &self.role_handler.is_some())
            .finish()
    }
}

/// Everything a resource may draw on when it is created for a request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<HttpRequest>,
    security: SecurityContext,
    objects: ContextObjects,
}

impl RequestContext {
    pub fn new(
        request: Arc<HttpRequest>,
        role_handler: Option<Arc<dyn RoleHandler>>,
        objects: ContextObjects,
    ) -> Self {
        Self {
            security: SecurityContext::new(request.clone(), role_handler),
            request,
            objects,
        }
    }

    pub fn request(&self) -> &Arc<HttpRequest> {
        &self.request
    }

    pub fn security(&self) -> &SecurityContext {
        &self.security
    }

    pub fn objects(&self) -> &ContextObjects {
        &self.objects
    }

    /// First context object of type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.objects.get::<T>()
    }
}
