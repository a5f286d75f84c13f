//! The HTTP boundary of the client.
//!
//! Everything above this module talks in terms of [`ApiRequest`] and [`ApiResponse`],
//! which lets tests and instrumentation substitute their own [`Transport`].
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use thiserror::Error;

use crate::credential::{Credential, Route};

/// Timeout applied to each request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A request against the Akenza API, relative to the configured base URL.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// The route the request must take; decides how the key is attached.
    pub route: Route,
    /// HTTP method.
    pub method: Method,
    /// Path beginning with `/`, e.g. `/v3/organizations`.
    pub path: String,
    /// Query parameters, in order. Keys may repeat.
    pub query: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Create a request with no query parameters or body.
    pub fn new(route: Route, method: Method, path: impl Into<String>) -> Self {
        Self {
            route,
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The first value of a query parameter, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A raw response from the Akenza API.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase; may be empty.
    pub status_text: String,
    /// Response body.
    pub body: Bytes,
}

impl ApiResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the HTTP layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Building or sending the request failed.
    #[error("error sending request: {0}")]
    Request(#[source] reqwest::Error),
    /// The response body could not be read.
    #[error("error reading response body: {0}")]
    Body(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(other: reqwest::Error) -> Self {
        if other.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(other)
        }
    }
}

/// Executes [`ApiRequest`]s.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the raw response, whatever its status.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// A [`Transport`] that calls the Akenza API directly using `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credential: Credential,
}

impl HttpTransport {
    /// Create a transport for the given base URL and credential.
    ///
    /// Every request made through it is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Request)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header(request.route.header_name(), self.credential.key())
            .header(http::header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e)
            }
        })?;
        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
