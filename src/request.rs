//! Request building, cache policy, and in-flight de-duplication.
//!
//! One call to [`Connection::execute`] is exactly one logical HTTP exchange:
//! the URL is assembled from the endpoint descriptor and call parameters, the
//! cache is consulted under a deterministic fingerprint, and on a miss the
//! transport is invoked at most once per fingerprint across all concurrent
//! callers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared, WeakShared};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::connection::Connection;
use crate::endpoint::EndpointDescriptor;
use crate::response::{self, ApiResponse};
use crate::transport::RawResponse;
use crate::Error;

/// In-flight request futures keyed by fingerprint.
///
/// Weak handles: callers hold the strong ones, so a request whose callers
/// have all gone away is dropped rather than kept alive by the map.
pub(crate) type InflightMap =
    DashMap<String, WeakShared<BoxFuture<'static, Result<RawResponse, Error>>>>;

/// Call parameters merged into the endpoint descriptor's path template and
/// query string.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestParams {
    /// Values substituted for `:name` placeholders in the path template.
    pub(crate) path_params: Vec<(&'static str, String)>,
    /// Pre-joined id list, or `all`.
    pub(crate) ids: Option<String>,
    pub(crate) page: Option<i32>,
    pub(crate) page_size: Option<i32>,
}

impl Connection {
    /// Executes one request against `descriptor`, applying the cache policy
    /// and in-flight de-duplication, and decodes the body into `T`.
    pub(crate) async fn execute<T>(
        &self,
        descriptor: &EndpointDescriptor,
        params: RequestParams,
    ) -> Result<ApiResponse<T>, Error>
    where
        T: DeserializeOwned,
    {
        let auth = if descriptor.requires_auth {
            match self.access_token() {
                Some(token) => Some(token.to_string()),
                None => {
                    return Err(Error::AuthenticationRequired(descriptor.path.to_string()))
                }
            }
        } else {
            None
        };

        let url = build_url(self, descriptor, &params)?;
        let key = fingerprint(&url, auth.as_deref());

        if let Some(entry) = self.inner.cache.get(&key).await {
            if !entry.is_expired() {
                match serde_json::from_str::<T>(&entry.value) {
                    Ok(content) => {
                        tracing::debug!(url = %url, "cache hit");
                        return Ok(ApiResponse::from_cache(content));
                    }
                    Err(e) => {
                        tracing::debug!(url = %url, "cached body failed to decode, refetching: {}", e);
                    }
                }
            }
        }

        let raw = self.fetch_deduped(&key, url.clone(), auth).await?;
        let content = serde_json::from_str::<T>(&raw.body).map_err(|e| {
            tracing::error!(url = %url, "failed to decode response body: {}", e);
            Error::Decode {
                message: e.to_string(),
            }
        })?;
        Ok(ApiResponse::from_response(&raw, content))
    }

    /// Runs the network fetch for `key`, sharing one in-flight call among all
    /// concurrent requests with the same fingerprint.
    ///
    /// A caller that drops its future stops waiting without cancelling the
    /// shared call for the others; when the last caller drops, the weak map
    /// entry lets the call itself be dropped.
    async fn fetch_deduped(
        &self,
        key: &str,
        url: Url,
        auth: Option<String>,
    ) -> Result<RawResponse, Error> {
        let fut = match self.inner.inflight.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get().upgrade() {
                Some(fut) => fut,
                None => {
                    let fut = self.spawn_fetch(key.to_string(), url, auth);
                    if let Some(weak) = fut.downgrade() {
                        occupied.insert(weak);
                    }
                    fut
                }
            },
            Entry::Vacant(vacant) => {
                let fut = self.spawn_fetch(key.to_string(), url, auth);
                if let Some(weak) = fut.downgrade() {
                    vacant.insert(weak);
                }
                fut
            }
        };
        let result = fut.await;
        // Only completed entries are removed; a newer in-flight call for the
        // same key still upgrades and stays.
        self.inner
            .inflight
            .remove_if(key, |_, weak| weak.upgrade().is_none());
        result
    }

    fn spawn_fetch(
        &self,
        key: String,
        url: Url,
        auth: Option<String>,
    ) -> Shared<BoxFuture<'static, Result<RawResponse, Error>>> {
        let conn = self.clone();
        async move { conn.fetch_and_store(&key, url, auth.as_deref()).await }
            .boxed()
            .shared()
    }

    /// The single network fetch for one fingerprint: send, surface API
    /// errors, and write successful bodies to the cache.
    async fn fetch_and_store(
        &self,
        key: &str,
        url: Url,
        auth: Option<&str>,
    ) -> Result<RawResponse, Error> {
        let mut headers: Vec<(String, String)> = Vec::new();
        if let Some(token) = auth {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        tracing::debug!(url = %url, "dispatching request");
        let raw = self.inner.transport.send(&url, &headers).await?;

        if !(200..300).contains(&raw.status) {
            let message = error_message(&raw);
            tracing::error!(url = %url, status = raw.status, "request failed: {}", message);
            return Err(Error::Api {
                status: raw.status,
                message,
            });
        }

        let ttl = cache_ttl(&raw, self.inner.default_cache_ttl);
        self.inner.cache.set(key, raw.body.clone(), ttl).await;
        Ok(raw)
    }
}

/// Builds the full request URL: base + substituted path template + query
/// string (`ids`, `page`, `page_size`, `v`, `lang`).
pub(crate) fn build_url(
    conn: &Connection,
    descriptor: &EndpointDescriptor,
    params: &RequestParams,
) -> Result<Url, Error> {
    let mut path = descriptor.path.to_string();
    for (name, value) in &params.path_params {
        path = path.replace(&format!(":{name}"), value);
    }

    let mut url =
        Url::parse(&format!("{}{}", conn.base_url().as_str(), path)).map_err(|e| {
            tracing::error!("invalid URL constructed for {}: {}", descriptor.path, e);
            Error::InvalidArgument(format!("invalid URL for {}: {e}", descriptor.path))
        })?;

    {
        let mut pairs = url.query_pairs_mut();
        if let Some(ids) = &params.ids {
            pairs.append_pair("ids", ids);
        }
        if let Some(page) = params.page {
            pairs.append_pair("page", &page.to_string());
        }
        if let Some(page_size) = params.page_size {
            pairs.append_pair("page_size", &page_size.to_string());
        }
        if let Some(version) = descriptor.schema_version {
            pairs.append_pair("v", version);
        }
        pairs.append_pair("lang", conn.locale().as_str());
    }
    Ok(url)
}

/// Deterministic cache key for one request.
///
/// The URL already embeds path, query parameters, schema version, and locale.
/// For authenticated requests a hash of the token is appended so different
/// accounts never share entries; the raw token never reaches the cache.
pub(crate) fn fingerprint(url: &Url, auth: Option<&str>) -> String {
    match auth {
        Some(token) => {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            format!("{url}#auth={:016x}", hasher.finish())
        }
        None => url.to_string(),
    }
}

/// Entry TTL for a successful response: the smaller of max-age and the
/// `Expires` delta, or the connection default when neither is usable.
fn cache_ttl(raw: &RawResponse, default: Duration) -> Duration {
    let max_age = response::parse_max_age(raw.header("cache-control"));
    let expires_in = raw
        .header("expires")
        .and_then(response::parse_expires)
        .map(|at| {
            at.signed_duration_since(chrono::Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        });
    match (max_age, expires_in) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => default,
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    text: String,
}

/// Error message for a non-2xx response: the `{"text": ...}` body when
/// parseable, the truncated raw body otherwise, or the status when the body
/// is empty.
fn error_message(raw: &RawResponse) -> String {
    if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&raw.body) {
        return body.text;
    }
    if raw.body.trim().is_empty() {
        return format!("HTTP status {}", raw.status);
    }
    truncate_body(&raw.body)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        format!("{}...[truncated]", &body[..MAX])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLDS: EndpointDescriptor = EndpointDescriptor {
        path: "/worlds",
        schema_version: Some("2019-02-21T00:00:00.000Z"),
        requires_auth: false,
        supports_ids_all: true,
        max_batch_size: 200,
    };

    const CHARACTER_CORE: EndpointDescriptor = EndpointDescriptor {
        path: "/characters/:id/core",
        schema_version: None,
        requires_auth: true,
        supports_ids_all: false,
        max_batch_size: 200,
    };

    fn conn() -> Connection {
        Connection::builder()
            .with_base_url("https://api.example/v2")
            .build()
            .unwrap()
    }

    #[test]
    fn build_url_appends_query_parameters() {
        let params = RequestParams {
            ids: Some("1,2,3".to_string()),
            page: Some(2),
            page_size: Some(50),
            ..Default::default()
        };
        let url = build_url(&conn(), &WORLDS, &params).unwrap();
        assert_eq!(url.path(), "/v2/worlds");
        let query = url.query().unwrap();
        assert!(query.contains("ids=1%2C2%2C3"));
        assert!(query.contains("page=2"));
        assert!(query.contains("page_size=50"));
        assert!(query.contains("v=2019-02-21T00"));
        assert!(query.contains("lang=en"));
    }

    #[test]
    fn build_url_substitutes_path_placeholders() {
        let params = RequestParams {
            path_params: vec![("id", "Mist Walker".to_string())],
            ..Default::default()
        };
        let url = build_url(&conn(), &CHARACTER_CORE, &params).unwrap();
        assert_eq!(url.path(), "/v2/characters/Mist%20Walker/core");
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let url = build_url(&conn(), &WORLDS, &RequestParams::default()).unwrap();
        assert_eq!(fingerprint(&url, None), fingerprint(&url, None));
        assert_eq!(
            fingerprint(&url, Some("token-a")),
            fingerprint(&url, Some("token-a"))
        );
    }

    #[test]
    fn fingerprint_separates_auth_scopes() {
        let url = build_url(&conn(), &WORLDS, &RequestParams::default()).unwrap();
        let anonymous = fingerprint(&url, None);
        let a = fingerprint(&url, Some("token-a"));
        let b = fingerprint(&url, Some("token-b"));
        assert_ne!(anonymous, a);
        assert_ne!(a, b);
        assert!(!a.contains("token-a"), "raw token must not leak into the key");
    }

    #[test]
    fn fingerprint_varies_with_locale_and_version() {
        let es = Connection::builder()
            .with_base_url("https://api.example/v2")
            .with_locale(crate::Locale::Es)
            .build()
            .unwrap();
        let url_en = build_url(&conn(), &WORLDS, &RequestParams::default()).unwrap();
        let url_es = build_url(&es, &WORLDS, &RequestParams::default()).unwrap();
        assert_ne!(fingerprint(&url_en, None), fingerprint(&url_es, None));

        let unversioned = EndpointDescriptor {
            schema_version: None,
            ..WORLDS
        };
        let url_nv = build_url(&conn(), &unversioned, &RequestParams::default()).unwrap();
        assert_ne!(fingerprint(&url_en, None), fingerprint(&url_nv, None));
    }

    #[test]
    fn cache_ttl_prefers_the_smaller_bound() {
        let raw = RawResponse::new(
            200,
            vec![("cache-control".to_string(), "max-age=60".to_string())],
            String::new(),
        );
        assert_eq!(
            cache_ttl(&raw, Duration::from_secs(300)),
            Duration::from_secs(60)
        );

        let far_future = (chrono::Utc::now() + chrono::Duration::seconds(10)).to_rfc2822();
        let raw = RawResponse::new(
            200,
            vec![
                ("cache-control".to_string(), "max-age=60".to_string()),
                ("expires".to_string(), far_future),
            ],
            String::new(),
        );
        assert!(cache_ttl(&raw, Duration::from_secs(300)) <= Duration::from_secs(10));

        let raw = RawResponse::new(200, Vec::new(), String::new());
        assert_eq!(
            cache_ttl(&raw, Duration::from_secs(300)),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn error_message_prefers_parsed_body() {
        let raw = RawResponse::new(403, Vec::new(), r#"{"text":"requires scope inventories"}"#.to_string());
        assert_eq!(error_message(&raw), "requires scope inventories");

        let raw = RawResponse::new(502, Vec::new(), "Bad Gateway".to_string());
        assert_eq!(error_message(&raw), "Bad Gateway");

        let raw = RawResponse::new(500, Vec::new(), String::new());
        assert_eq!(error_message(&raw), "HTTP status 500");
    }
}
