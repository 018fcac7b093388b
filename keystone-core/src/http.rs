// HTTP request and response types

use crate::{Error, FormValues, HeaderMap};
use bytes::Bytes;
use std::fmt;

/// Header carrying the name of the scheme that authenticated the caller.
pub const AUTHENTICATION_SCHEME_HEADER: &str = "X-Authentication-Scheme";

/// The authenticated caller, as resolved by the security layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Headers plus a buffered body, as produced by the transport.
#[derive(Debug, Clone, Default)]
pub struct ContentPart {
    pub headers: HeaderMap,
    pub body: Bytes,
    form: Option<FormValues>,
}

impl ContentPart {
    pub fn new(headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: body.into(),
            form: None,
        }
    }

    /// A content part with no headers and no body.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Raw Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type().map(String::as_str)
    }

    /// Pre-parse a URL-encoded body so form parameters can be bound.
    pub fn parse_form(mut self) -> Result<Self, Error> {
        self.form = Some(FormValues::parse(&self.body)?);
        Ok(self)
    }

    /// Values of a pre-parsed form body.
    pub fn form(&self) -> Option<&FormValues> {
        self.form.as_ref()
    }
}

/// HTTP request as handed over by the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    /// Request target: path plus optional query string.
    pub target: String,
    pub content: Option<ContentPart>,
    /// Principal resolved by the security layer, if any.
    pub principal: Option<Principal>,
    /// Whether the transport connection is secured.
    pub secure: bool,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            content: None,
            principal: None,
            secure: false,
        }
    }

    pub fn with_content(mut self, content: ContentPart) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Path portion of the target, without the query string.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.target)
    }

    /// Query string portion of the target, if any.
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    /// Get a header of the content part by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|c| c.headers.get(name))
            .map(String::as_str)
    }
}

/// HTTP response returned to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// A 200 response with no body.
    pub fn empty() -> Self {
        let mut response = Self::ok();
        response.headers.set_content_length(0);
        response
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body together with its Content-Type and Content-Length.
    pub fn with_content(mut self, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.headers.set_content_type(content_type);
        self.headers.set_content_length(self.body.len());
        self
    }

    /// Wrap a fully formed content part in a 200 response.
    pub fn from_part(part: ContentPart) -> Self {
        let mut response = Self::ok();
        response.headers = part.headers;
        response.body = part.body;
        if !response.headers.contains("Content-Length") {
            response.headers.set_content_length(response.body.len());
        }
        response
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type().map(String::as_str)
    }

    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }
}
