// Keystone - declarative REST dispatch for Rust
//
// Resources declare their operations once; the dispatcher matches requests
// against path templates, binds typed parameters and negotiates JSON or XML
// bodies in both directions.

// Re-export core functionality
pub use keystone_core::*;

// Re-export optional crates
#[cfg(feature = "testing")]
pub use keystone_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Arguments,
        ContextObjects,
        Dispatcher,
        DispatcherConfig,
        Entity,
        Error,
        HandlerChain,
        HttpMethod,
        HttpRequest,
        HttpResponse,
        IntoReply,
        Operation,
        Param,
        Reply,
        RequestContext,
        RequestHandler,
        Resource,
        RoleHandler,
        SecurityContext,
    };
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
}
