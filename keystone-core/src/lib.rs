// Core library for the Keystone REST dispatcher
// Maps HTTP requests onto operations declared by resource types.

pub mod codec;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod headers;
pub mod http;
pub mod logging;
pub mod media;
pub mod param;
pub mod reply;
pub mod route;
pub mod service;
pub mod template;
pub mod traits;

// Re-export commonly used types
pub use codec::{Format, Marshallable};
pub use config::{ConfigError, DispatcherConfig};
pub use context::{ContextObjects, RequestContext, SecurityContext};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::*;
pub use form::FormValues;
pub use headers::{Header, HeaderMap};
pub use self::http::*;
pub use media::{Accept, MediaType};
pub use param::{Arguments, FromParam, Param, ParamSource};
pub use reply::{Entity, IntoReply, Reply};
pub use route::{Operation, RouteDescriptor};
pub use service::{HandlerChain, RequestHandler};
pub use template::{PathTemplate, PathValues};
pub use traits::*;
