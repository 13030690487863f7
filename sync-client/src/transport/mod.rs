//! Transport abstraction for FlowList sync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! HTTP client (reqwest, mock for testing).
//!
//! # Design
//!
//! The transport trait is a single async request/response exchange:
//! - [`HttpRequest`] carries a method, URL, headers and a form body
//! - [`HttpResponse`] exposes the status code, headers and body text
//!
//! Implementations must not follow redirects: login success is signalled
//! by the redirect response itself.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_response(HttpResponse::new(200).with_body("{}"));
//! let response = transport.execute(HttpRequest::get("https://example.com/")).await?;
//! ```

mod http;
mod mock;

pub use http::ReqwestTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection timeout.
    #[error("connection timeout")]
    Timeout,

    /// The request failed after connecting, or returned an error status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The response could not be read.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST` with a form-encoded body.
    Post,
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs, in order.
    pub headers: Vec<(String, String)>,
    /// Form fields, in order (sent only for `POST`).
    pub form: Vec<(String, String)>,
}

impl HttpRequest {
    /// A `GET` request with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// A `POST` request with no headers and an empty form.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            form: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a form field.
    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Value of the given form field.
    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Header name/value pairs, in order. Repeated headers appear once per value.
    pub headers: Vec<(String, String)>,
    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// A response with the given status, no headers and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Every value of the given header (case-insensitive), in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Transport trait for exchanging HTTP requests with the backend.
///
/// Implementations handle the underlying HTTP client
/// (reqwest, in-memory server, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for its complete response.
    ///
    /// Non-2xx statuses are returned as responses, not errors; redirects
    /// are returned as-is.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
