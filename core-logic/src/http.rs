//! # HTTP Request Model
//!
//! Transport-agnostic request/response types shared by the retrying executor,
//! the reqwest adapter and the per-chain clients.

use crate::traits::HttpTransport;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// One outbound call. Built fresh for every request and never shared.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    /// Static header set of the calling client.
    pub headers: BTreeMap<String, String>,
    /// Per-call headers; these win over `headers` on a case-insensitive name match.
    pub override_headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
    pub transport: Arc<dyn HttpTransport>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            override_headers: BTreeMap::new(),
            body: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            transport,
        }
    }

    pub fn get(url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(HttpMethod::Get, url, transport)
    }

    pub fn post(url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(HttpMethod::Post, url, transport)
    }

    pub fn with_headers(mut self, headers: &BTreeMap<String, String>) -> Self {
        self.headers = headers.clone();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.override_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Static headers merged with the per-call overrides.
    pub fn effective_headers(&self) -> BTreeMap<String, String> {
        let mut merged: BTreeMap<String, String> = self
            .headers
            .iter()
            .filter(|(name, _)| {
                !self
                    .override_headers
                    .keys()
                    .any(|o| o.eq_ignore_ascii_case(name))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        merged.extend(
            self.override_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("has_body", &self.body.is_some())
            .field("transport", &self.transport.describe())
            .finish()
    }
}

/// A response that made it back through the transport, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Decoded JSON body. Non-JSON text is kept as a JSON string, empty bodies are `None`.
    pub body: Option<Value>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, Some(body))
    }

    /// Decodes a raw body the way the adapter does.
    pub fn from_text(status: u16, text: &str) -> Self {
        let trimmed = text.trim();
        let body = if trimmed.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(trimmed)
                    .unwrap_or_else(|_| Value::String(trimmed.to_string())),
            )
        };
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get(key))
    }

    /// The body's `message` string, if any.
    pub fn message(&self) -> Option<&str> {
        self.field("message").and_then(Value::as_str)
    }
}
