// Test HTTP Client

use bytes::Bytes;
use keystone_core::codec::{self, Format};
use keystone_core::{
    ContentPart, Error, HeaderMap, HttpRequest, HttpResponse, Principal, RequestHandler,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Test client sending requests straight to a handler
#[derive(Clone)]
pub struct TestClient {
    handler: Arc<dyn RequestHandler>,
}

impl TestClient {
    pub fn new<H: RequestHandler + 'static>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn from_shared(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("GET", path)).await
    }

    /// Make a POST request with an untyped body
    pub async fn post(&self, path: &str, body: impl Into<Bytes>) -> TestResponse {
        self.send(TestRequestBuilder::new("POST", path).body(body)).await
    }

    /// Make a PUT request with an untyped body
    pub async fn put(&self, path: &str, body: impl Into<Bytes>) -> TestResponse {
        self.send(TestRequestBuilder::new("PUT", path).body(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("DELETE", path)).await
    }

    /// Send a built request
    pub async fn send(&self, request: TestRequestBuilder) -> TestResponse {
        self.execute(request.build()).await
    }

    pub async fn execute(&self, request: HttpRequest) -> TestResponse {
        match self.handler.handle(Arc::new(request)).await {
            Ok(Some(response)) => TestResponse::Handled(response),
            Ok(None) => TestResponse::NotHandled,
            Err(error) => TestResponse::Error(error),
        }
    }
}

/// Builder for test requests
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    content: Option<ContentPart>,
    principal: Option<Principal>,
    secure: bool,
}

impl TestRequestBuilder {
    /// A request with an empty content part
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: Vec::new(),
            content: Some(ContentPart::empty()),
            principal: None,
            secure: false,
        }
    }

    fn content_mut(&mut self) -> &mut ContentPart {
        self.content.get_or_insert_with(ContentPart::empty)
    }

    /// Add or replace a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.content_mut().headers.insert(key, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.content_mut().body = body.into();
        self
    }

    /// Set a JSON body and content type
    pub fn json<T: Serialize>(self, data: &T) -> Result<Self, Error> {
        let body = codec::encode(data, Format::Json)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// Set an XML body and content type
    pub fn xml<T: Serialize>(self, data: &T) -> Result<Self, Error> {
        let body = codec::encode(data, Format::Xml)?;
        Ok(self.header("Content-Type", "application/xml").body(body))
    }

    /// Set a URL-encoded form body, pre-parsed the way the transport would
    pub fn form(self, fields: &[(&str, &str)]) -> Result<Self, Error> {
        let body = serde_urlencoded::to_string(fields)
            .map_err(|e| Error::MalformedFormRequest(e.to_string()))?;
        let mut builder = self
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body);
        let content = builder.content.take().unwrap_or_default();
        builder.content = Some(content.parse_form()?);
        Ok(builder)
    }

    /// Add a query parameter
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach an authenticated principal
    pub fn principal(mut self, name: &str) -> Self {
        self.principal = Some(Principal::new(name));
        self
    }

    /// Mark the transport as secured
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Drop the content part entirely
    pub fn without_content(mut self) -> Self {
        self.content = None;
        self
    }

    /// Build the request
    pub fn build(self) -> HttpRequest {
        let target = if self.query.is_empty() {
            self.path
        } else {
            let params: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            format!("{}?{}", self.path, params.join("&"))
        };

        let mut request = HttpRequest::new(self.method, target).with_secure(self.secure);
        request.content = self.content;
        request.principal = self.principal;
        request
    }
}

/// Response from a test request
#[derive(Debug)]
pub enum TestResponse {
    Handled(HttpResponse),
    NotHandled,
    Error(Error),
}

impl TestResponse {
    /// Assert the request was handled
    pub fn assert_handled(&self) -> &HttpResponse {
        match self {
            TestResponse::Handled(response) => response,
            TestResponse::NotHandled => panic!("Expected a response, request was not handled"),
            TestResponse::Error(error) => {
                panic!("Expected a response, got error: {:?}", error)
            }
        }
    }

    /// Assert the request was not handled
    pub fn assert_not_handled(&self) {
        if !matches!(self, TestResponse::NotHandled) {
            panic!("Expected request not to be handled, got {:?}", self);
        }
    }

    /// Assert the request failed
    pub fn assert_error(&self) -> &Error {
        match self {
            TestResponse::Error(error) => error,
            other => panic!("Expected error, got {:?}", other),
        }
    }

    /// Status as seen by the caller; errors report their mapped status
    pub fn status(&self) -> Option<u16> {
        match self {
            TestResponse::Handled(response) => Some(response.status),
            TestResponse::NotHandled => None,
            TestResponse::Error(error) => Some(error.status_code()),
        }
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            TestResponse::Handled(response) => Some(&response.headers),
            _ => None,
        }
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers().and_then(|headers| headers.get(key))
    }

    /// Get the response body as string
    pub fn body_string(&self) -> Option<String> {
        match self {
            TestResponse::Handled(response) => String::from_utf8(response.body.to_vec()).ok(),
            _ => None,
        }
    }

    /// Get the response body as JSON
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, String> {
        self.decode(Format::Json)
    }

    /// Get the response body as XML
    pub fn body_xml<T: DeserializeOwned>(&self) -> Result<T, String> {
        self.decode(Format::Xml)
    }

    fn decode<T: DeserializeOwned>(&self, format: Format) -> Result<T, String> {
        match self {
            TestResponse::Handled(response) => {
                codec::decode(&response.body, format).map_err(|e| e.to_string())
            }
            other => Err(format!("{:?}", other)),
        }
    }
}
