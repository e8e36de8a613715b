//! Thin HTTP transport abstraction.
//!
//! The execution engine only ever talks to the [`Transport`] trait, so
//! tests run against an in-memory stub and production code injects
//! [`ReqwestTransport`]. A transport shared across tasks shares its
//! connection pool; `reqwest::Client` is internally reference-counted and
//! safe for concurrent use.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::OcpuError;

pub(crate) const CONTENT_TYPE_JSON: &str = "application/json";
pub(crate) const ACCEPT_TYPES: &str = "application/json,text/plain";

/// Response header carrying the OpenCPU session identifier.
pub(crate) const SESSION_HEADER: &str = "x-ocpu-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON request body; `None` for GET fetches.
    pub body: Option<String>,
}

/// One incoming HTTP response: status, headers and raw body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

/// Capability to issue one HTTP request and return the raw response.
///
/// Transport-level faults (connection refused, I/O errors) surface as
/// [`OcpuError::Transport`]. A non-2xx status is not an error at this
/// layer; the caller decides what it means.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OcpuError>;
}

/// [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OcpuError> {
        let builder = match request.method {
            Method::Post => self.client.post(&request.url),
            Method::Get => self.client.get(&request.url),
        };
        let mut builder = builder
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(reqwest::header::ACCEPT, ACCEPT_TYPES);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OcpuError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| OcpuError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
