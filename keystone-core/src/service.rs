// Mounting dispatchers behind an async request-handler interface

use crate::dispatcher::normalize_path;
use crate::logging::{debug, warn};
use crate::{Dispatcher, Error, HttpRequest, HttpResponse, Resource};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for anything that answers HTTP requests.
///
/// `Ok(None)` means the request was not handled.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Arc<HttpRequest>) -> Result<Option<HttpResponse>, Error>;
}

#[async_trait]
impl<R: Resource> RequestHandler for Dispatcher<R> {
    async fn handle(&self, request: Arc<HttpRequest>) -> Result<Option<HttpResponse>, Error> {
        Dispatcher::handle(self, request)
    }
}

struct Mount {
    path: String,
    handler: Arc<dyn RequestHandler>,
}

impl Mount {
    fn covers(&self, path: &str) -> bool {
        let mount = self.path.trim_end_matches('/');
        mount.is_empty()
            || path == mount
            || path
                .strip_prefix(mount)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Ordered set of handlers, each limited to a server path.
///
/// ```ignore
/// let chain = HandlerChain::new()
///     .mount("/api", Dispatcher::<Users>::builder().base_path("/api").build()?)
///     .mount("/", Dispatcher::<Health>::builder().build()?);
///
/// let response = chain.respond(request).await;
/// ```
#[derive(Default)]
pub struct HandlerChain {
    mounts: Vec<Mount>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a handler; it only sees requests under `path`.
    pub fn mount<H: RequestHandler + 'static>(self, path: impl Into<String>, handler: H) -> Self {
        self.mount_shared(path, Arc::new(handler))
    }

    pub fn mount_shared(mut self, path: impl Into<String>, handler: Arc<dyn RequestHandler>) -> Self {
        let path = path.into();
        debug!(path = %path, "Handler mounted");
        self.mounts.push(Mount { path, handler });
        self
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// First handled response, in mount order.
    pub async fn dispatch(
        &self,
        request: impl Into<Arc<HttpRequest>>,
    ) -> Result<Option<HttpResponse>, Error> {
        let request = request.into();
        // Undecodable paths are left to the handlers to reject.
        let path = normalize_path(request.path()).unwrap_or_else(|_| request.path().to_string());
        for mount in self.mounts.iter().filter(|m| m.covers(&path)) {
            if let Some(response) = mount.handler.handle(request.clone()).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Dispatch and always produce a response.
    ///
    /// Unhandled requests become 404; failures are rendered through
    /// [`Error::to_response`].
    pub async fn respond(&self, request: impl Into<Arc<HttpRequest>>) -> HttpResponse {
        let request = request.into();
        match self.dispatch(request.clone()).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                debug!(uri = %request.target, "No handler answered");
                Error::http(404, format!("No resource found for {}", request.path())).to_response()
            }
            Err(err) => {
                if err.is_server_error() {
                    warn!(uri = %request.target, error = %err, "Request failed");
                } else {
                    debug!(uri = %request.target, error = %err, "Request rejected");
                }
                err.to_response()
            }
        }
    }
}

#[async_trait]
impl RequestHandler for HandlerChain {
    async fn handle(&self, request: Arc<HttpRequest>) -> Result<Option<HttpResponse>, Error> {
        self.dispatch(request).await
    }
}
