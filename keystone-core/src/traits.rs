// Core traits for the Keystone dispatcher

use crate::{Error, Operation, Principal, RequestContext};
use std::fmt;

/// Trait for types that expose REST operations.
///
/// A resource describes its operations once; the dispatcher compiles them
/// into route descriptors and creates one fresh instance per matched
/// request through [`Resource::create`].
pub trait Resource: Sized + Send + Sync + 'static {
    /// Path prefix shared by every operation of this resource.
    fn path() -> Option<&'static str> {
        None
    }

    /// Media types produced when an operation declares none.
    fn produces() -> Option<&'static [&'static str]> {
        None
    }

    /// Media types consumed when an operation declares none.
    fn consumes() -> Option<&'static [&'static str]> {
        None
    }

    /// The operations exposed by this resource.
    fn operations() -> Vec<Operation<Self>>;

    /// Build the request-scoped instance an operation is invoked on.
    fn create(ctx: &RequestContext) -> Result<Self, Error>;
}

/// Authority answering role-membership questions for a principal.
pub trait RoleHandler: Send + Sync {
    fn has_role(&self, principal: &Principal, role: &str) -> bool;
}

/// HTTP methods understood by the dispatcher
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str_is_case_insensitive() {
        assert_eq!(HttpMethod::from_str("get"), Some(HttpMethod::GET));
        assert_eq!(HttpMethod::from_str("Options"), Some(HttpMethod::OPTIONS));
        assert_eq!(HttpMethod::from_str("PATCH"), None);
        assert_eq!(HttpMethod::from_str("TRACE"), None);
    }

    #[test]
    fn test_method_round_trip_name() {
        for method in [
            HttpMethod::GET,
            HttpMethod::POST,
            HttpMethod::PUT,
            HttpMethod::DELETE,
            HttpMethod::HEAD,
            HttpMethod::OPTIONS,
        ] {
            assert_eq!(HttpMethod::from_str(method.as_str()), Some(method));
        }
    }
}
