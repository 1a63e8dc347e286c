//! HTTP capability abstraction
//!
//! This module provides a trait-based abstraction over the HTTP transport,
//! enabling unit testing of adapters without real network calls.
//!
//! # Example
//!
//! ```no_run
//! use tradewire_http::{HttpClient, HttpConfig, HttpRequest, ReqwestHttpClient, TransportError};
//!
//! async fn example() -> Result<(), TransportError> {
//!     let client = ReqwestHttpClient::new(HttpConfig::default())?;
//!     let response = client
//!         .execute(HttpRequest::get("https://api.binance.com/api/v3/time"))
//!         .await?;
//!     println!("{} {}", response.status, response.text());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tradewire_types::ExchangeError;

/// Transport layer errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not build the underlying client
    #[error("client setup failed: {0}")]
    Setup(String),

    /// The request did not complete
    #[error("request failed: {0}")]
    Request(String),

    /// No response within the configured timeout
    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    /// The response body could not be read
    #[error("reading response body failed: {0}")]
    Body(String),
}

impl From<TransportError> for ExchangeError {
    fn from(err: TransportError) -> Self {
        ExchangeError::transport(err.to_string())
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `application/json`, already serialized
    Json(String),
}

/// A fully built, already signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including any query string
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_form(mut self, params: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(params);
        self
    }

    pub fn with_json(mut self, json: impl Into<String>) -> Self {
        self.body = RequestBody::Json(json.into());
        self
    }

    /// First header with this name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of a form field, when the body is a form
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(params) => params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// URL without the query string, safe to log
    pub fn path_for_log(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

/// Raw response; any status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP capability
///
/// Implementations perform exactly one network exchange per call and never
/// retry. Timeouts and cancellation belong to the implementation.
#[async_trait]
pub trait HttpClient: Send + Sync + fmt::Debug {
    /// Send a request and return the raw response
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    async fn get(&self, url: &str, headers: Vec<(String, String)>) -> Result<HttpResponse, TransportError> {
        self.execute(HttpRequest::get(url).with_headers(headers)).await
    }

    async fn post_form(
        &self,
        url: &str,
        params: Vec<(String, String)>,
        headers: Vec<(String, String)>,
    ) -> Result<HttpResponse, TransportError> {
        self.execute(HttpRequest::post(url).with_headers(headers).with_form(params))
            .await
    }

    async fn post_json(
        &self,
        url: &str,
        json: String,
        headers: Vec<(String, String)>,
    ) -> Result<HttpResponse, TransportError> {
        self.execute(HttpRequest::post(url).with_headers(headers).with_json(json))
            .await
    }

    async fn delete(
        &self,
        url: &str,
        params: Vec<(String, String)>,
        headers: Vec<(String, String)>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = HttpRequest::delete(url).with_headers(headers);
        if !params.is_empty() {
            request = request.with_form(params);
        }
        self.execute(request).await
    }
}
