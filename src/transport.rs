//! Pluggable HTTP transport.
//!
//! The request executor only depends on the [`Transport`] trait, so tests can
//! substitute an in-process transport and the reqwest-backed default stays a
//! thin shell around one GET per call.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::Error;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("gw2api/", env!("CARGO_PKG_VERSION"));

/// A raw HTTP exchange result: status, headers, and body.
///
/// Header names are lowercased on construction so lookups are
/// case-insensitive.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(
        status: u16,
        headers: impl IntoIterator<Item = (String, String)>,
        body: String,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Sends a single GET request and returns the raw exchange.
///
/// The API is read-only, so the contract is GET-only and carries no method
/// parameter.
///
/// Implementations own timeouts, TLS, and connection pooling. Failures map to
/// [`Error::Transport`]; a non-2xx status is not a transport failure and is
/// returned as a normal [`RawResponse`] for the executor to interpret.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &Url, headers: &[(String, String)]) -> Result<RawResponse, Error>;
}

/// Default transport backed by `reqwest` with a per-request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("failed to build HTTP client: {}", e);
                Error::Transport {
                    message: format!("failed to build HTTP client: {e}"),
                    timed_out: false,
                }
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, url: &Url, headers: &[(String, String)]) -> Result<RawResponse, Error> {
        let mut request = self
            .client
            .get(url.clone())
            .header("accept", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("request to {} failed: {}", url, e);
            Error::Transport {
                message: format!("{url}: {e}"),
                timed_out: e.is_timeout(),
            }
        })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| {
            tracing::error!("failed to read response body from {}: {}", url, e);
            Error::Transport {
                message: format!("{url}: {e}"),
                timed_out: e.is_timeout(),
            }
        })?;

        Ok(RawResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_response_header_lookup_is_case_insensitive() {
        let raw = RawResponse::new(
            200,
            vec![("X-Result-Total".to_string(), "42".to_string())],
            String::new(),
        );
        assert_eq!(raw.header("x-result-total"), Some("42"));
        assert_eq!(raw.header("X-RESULT-TOTAL"), Some("42"));
        assert_eq!(raw.header("x-page-size"), None);
    }
}
