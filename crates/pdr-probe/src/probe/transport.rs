use std::time::Duration;
use thiserror::Error;

pub const BASE_URL: &str = "https://api.binance.com";

/// Environment variable that points the probe binary at another host.
pub const BASE_URL_ENV: &str = "BINANCE_PROBE_BASE_URL";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The request failed before a full response was read. Only `Body`
/// carries the status line that arrived first.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to read response body: {reason}")]
    Body { status: u16, reason: String },

    #[error("{0}")]
    Connection(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Body { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Blocking `GET` against a fixed host.
pub trait HttpGet {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;
}

/// [`HttpGet`] over a blocking `reqwest` client with a fixed per-request
/// deadline and no retries.
pub struct ReqwestTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HttpGet for ReqwestTransport {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {} {:?}", url, query);

        let to_error = |source| TransportError::Request {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(to_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError::Body {
            status,
            reason: e.to_string(),
        })?;

        log::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
