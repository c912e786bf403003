//! Immutable connection configuration shared by every endpoint client.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::cache::{Cache, MemoryCache};
use crate::request::InflightMap;
use crate::transport::{HttpTransport, Transport};
use crate::Error;

/// Base URL for the production API.
pub const DEFAULT_BASE_URL: &str = "https://api.guildwars2.com/v2";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Languages the API can localize responses into, sent as the `lang` query
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Es,
    De,
    Fr,
    Ko,
    Zh,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::De => "de",
            Locale::Fr => "fr",
            Locale::Ko => "ko",
            Locale::Zh => "zh",
        }
    }
}

pub(crate) struct ConnectionInner {
    pub(crate) base_url: Url,
    pub(crate) locale: Locale,
    pub(crate) access_token: Option<String>,
    pub(crate) default_cache_ttl: Duration,
    pub(crate) cache: Arc<dyn Cache>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) inflight: InflightMap,
}

/// Immutable configuration for talking to the API: base URL, locale, access
/// token, cache, and transport.
///
/// Cloning is cheap (shared inner), and all endpoint clients built from one
/// connection share its cache and its in-flight request de-duplication.
#[derive(Clone)]
pub struct Connection {
    pub(crate) inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Creates a connection with all defaults: the production base URL,
    /// English locale, no access token, an in-memory cache, and a reqwest
    /// transport with a 30-second timeout.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn locale(&self) -> Locale {
        self.inner.locale
    }

    pub fn access_token(&self) -> Option<&str> {
        self.inner.access_token.as_deref()
    }
}

/// Builder for [`Connection`].
pub struct ConnectionBuilder {
    base_url: String,
    locale: Locale,
    access_token: Option<String>,
    default_cache_ttl: Duration,
    timeout: Duration,
    cache: Option<Arc<dyn Cache>>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            locale: Locale::default(),
            access_token: None,
            default_cache_ttl: DEFAULT_CACHE_TTL,
            timeout: DEFAULT_TIMEOUT,
            cache: None,
            transport: None,
        }
    }
}

impl ConnectionBuilder {
    /// Points the connection at a different base URL. Used for testing
    /// against a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Sets the access token sent as a bearer header on authenticated
    /// endpoints.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the fallback cache TTL used when a response carries neither a
    /// usable `Cache-Control` max-age nor an `Expires` header.
    pub fn with_default_cache_ttl(mut self, ttl: Duration) -> Self {
        self.default_cache_ttl = ttl;
        self
    }

    /// Sets the request timeout of the default transport. Ignored when a
    /// custom transport is supplied.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Connection, Error> {
        let base_url = Url::parse(&self.base_url).map_err(|e| {
            tracing::error!("invalid base URL {}: {}", self.base_url, e);
            Error::InvalidArgument(format!("invalid base URL {}: {e}", self.base_url))
        })?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.timeout)?),
        };
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));
        Ok(Connection {
            inner: Arc::new(ConnectionInner {
                base_url,
                locale: self.locale,
                access_token: self.access_token,
                default_cache_ttl: self.default_cache_ttl,
                cache,
                transport,
                inflight: InflightMap::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let conn = Connection::new().unwrap();
        assert_eq!(conn.base_url().as_str(), DEFAULT_BASE_URL);
        assert_eq!(conn.locale(), Locale::En);
        assert!(conn.access_token().is_none());
    }

    #[test]
    fn builder_rejects_invalid_base_url() {
        let result = Connection::builder().with_base_url("not a url").build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let conn = Connection::builder()
            .with_base_url("https://api.example/v2/")
            .build()
            .unwrap();
        assert_eq!(conn.base_url().as_str(), "https://api.example/v2");
    }
}
