// Error types for the Keystone dispatcher

use crate::HttpResponse;
use http::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by operation handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared cause attached to wrapped failures.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Structured failure raised while dispatching a request.
///
/// Every variant maps onto an HTTP status through [`Error::status_code`].
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("The method {0} is currently unsupported")]
    UnsupportedMethod(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Malformed form request: {0}")]
    MalformedFormRequest(String),

    #[error("Missing form parameters: {0}")]
    MissingFormParameters(String),

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Invalid parameter binding: {0}")]
    InvalidParameterBinding(String),

    #[error("Not marshallable: {0}")]
    NotMarshallable(String),

    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    // Registration errors
    #[error("Invalid path template: {0}")]
    InvalidPathTemplate(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    // Argument errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Unreadable body: {0}")]
    UnreadableBody(String),

    /// Failure raised by an operation with an explicit status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

impl Error {
    /// Create an internal error without a cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error wrapping a cause.
    pub fn internal_with<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Internal {
            message: cause.to_string(),
            source: Some(Arc::new(cause)),
        }
    }

    /// Create a failure with an explicit status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingFormParameters(_)
            | Error::InvalidContentType(_)
            | Error::InvalidParameter(_)
            | Error::MissingParameter(_)
            | Error::UnreadableBody(_) => StatusCode::BAD_REQUEST.as_u16(),

            Error::Http { status, .. } => *status,

            Error::UnsupportedMethod(_)
            | Error::NotImplemented(_)
            | Error::MalformedFormRequest(_)
            | Error::InvalidParameterBinding(_)
            | Error::NotMarshallable(_)
            | Error::Internal { .. }
            | Error::InvalidPathTemplate(_)
            | Error::InvalidRoute(_) => StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code())
    }

    /// Render this error as a JSON error response.
    pub fn to_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = ErrorBody {
            status,
            error: StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown"),
            message: self.to_string(),
        };
        // ErrorBody only holds plain strings and integers
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        HttpResponse::new(status).with_content("application/json", bytes)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    error: &'a str,
    message: String,
}

/// Unwind a handler failure to the structured error it carries.
///
/// A structured [`Error`] anywhere in the `source()` chain is returned as-is;
/// otherwise the failure is wrapped once as [`Error::Internal`] carrying the
/// innermost cause's message.
pub fn unwind(err: BoxError) -> Error {
    let err = match err.downcast::<Error>() {
        Ok(structured) => return *structured,
        Err(other) => other,
    };

    let mut innermost: &(dyn std::error::Error + 'static) = err.as_ref();
    while let Some(cause) = innermost.source() {
        if let Some(structured) = cause.downcast_ref::<Error>() {
            return structured.clone();
        }
        innermost = cause;
    }

    Error::Internal {
        message: innermost.to_string(),
        source: Some(Arc::from(err)),
    }
}
