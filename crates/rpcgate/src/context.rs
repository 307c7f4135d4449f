//! Transport boundary types
//!
//! The dispatch core never talks to sockets. It reads a [`TransportRequest`]
//! and fills a [`TransportResponse`], both carried by a [`RequestContext`]
//! that handler-style methods receive mutably.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};

/// Content types understood by the built-in codecs and helpers
pub mod content_type {
    pub const JSON: &str = "application/json; charset=utf-8";
    pub const XML: &str = "application/xml; charset=utf-8";
    pub const RSS_XML: &str = "application/rss+xml; charset=utf-8";
    pub const ATOM_XML: &str = "application/atom+xml; charset=utf-8";
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const PROTOBUF: &str = "application/protobuf";
    pub const FORM: &str = "application/x-www-form-urlencoded";
}

/// Incoming request as seen by the dispatch core
#[derive(Debug, Clone)]
pub struct TransportRequest {
    method: Method,
    headers: HeaderMap,
    query: Option<String>,
    body: Bytes,
}

impl TransportRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: None,
            body: Bytes::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// Build from a fully buffered HTTP request
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            headers: parts.headers,
            query: parts.uri.query().map(str::to_string),
            body,
        }
    }

    /// Set the Content-Type header. Values that are not valid header text are ignored.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw Content-Type header value
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Content-Type without parameters, e.g. `application/json`
    pub fn media_type(&self) -> Option<&str> {
        self.content_type()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|mt| !mt.is_empty())
    }

    /// Raw query string (without the leading `?`)
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Outgoing response filled in by the dispatcher or by a handler-style method
#[derive(Debug, Clone)]
pub struct TransportResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: Bytes,
}

impl Default for TransportResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: None,
            body: Bytes::new(),
        }
    }
}

impl TransportResponse {
    /// Write status, content type and body in one go
    pub fn write_bytes(&mut self, status: StatusCode, content_type: &str, body: impl Into<Bytes>) {
        self.status = status;
        self.content_type = Some(content_type.to_string());
        self.body = body.into();
    }

    pub fn write_str(&mut self, status: StatusCode, content_type: &str, body: &str) {
        self.write_bytes(status, content_type, Bytes::copy_from_slice(body.as_bytes()));
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        if let Some(value) = self
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        response
    }
}

/// Per-request state shared between the dispatcher and the invoked method
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: TransportRequest,
    response: TransportResponse,
}

impl RequestContext {
    pub fn new(request: TransportRequest) -> Self {
        Self {
            request,
            response: TransportResponse::default(),
        }
    }

    pub fn from_http(req: http::Request<Bytes>) -> Self {
        Self::new(TransportRequest::from_http(req))
    }

    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    pub fn response(&self) -> &TransportResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut TransportResponse {
        &mut self.response
    }

    pub fn write_bytes(&mut self, status: StatusCode, content_type: &str, body: impl Into<Bytes>) {
        self.response.write_bytes(status, content_type, body);
    }

    pub fn write_str(&mut self, status: StatusCode, content_type: &str, body: &str) {
        self.response.write_str(status, content_type, body);
    }

    pub fn into_response(self) -> TransportResponse {
        self.response
    }

    pub fn into_http_response(self) -> http::Response<Bytes> {
        self.response.into_http()
    }
}

impl From<TransportRequest> for RequestContext {
    fn from(request: TransportRequest) -> Self {
        Self::new(request)
    }
}
