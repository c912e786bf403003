//! Response envelope: typed content plus metadata derived from response
//! headers.
//!
//! Header parsing is tolerant by contract: a header that fails to parse
//! leaves its field unset and never fails the response as a whole.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::transport::RawResponse;

/// Relation token of one `Link` response header segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRel {
    Previous,
    Next,
    SelfRel,
    First,
    Last,
}

impl FromStr for LinkRel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "previous" => Ok(LinkRel::Previous),
            "next" => Ok(LinkRel::Next),
            "self" => Ok(LinkRel::SelfRel),
            "first" => Ok(LinkRel::First),
            "last" => Ok(LinkRel::Last),
            _ => Err(()),
        }
    }
}

fn link_rel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)rel="?(previous|next|self|first|last)"?"#).expect("valid rel pattern")
    })
}

fn link_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(.+?)>").expect("valid uri pattern"))
}

/// A typed API response: decoded content plus metadata parsed from headers.
///
/// Built either from a cache hit ([`ApiResponse::from_cache`], all metadata
/// absent) or from a live HTTP exchange ([`ApiResponse::from_response`],
/// metadata parsed best-effort). Immutable after construction; a new envelope
/// is produced per page by the pagination layer.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    content: T,
    cached: bool,
    cache_max_age: Option<Duration>,
    expires: Option<DateTime<FixedOffset>>,
    rate_limit_limit: Option<i32>,
    result_count: Option<i32>,
    result_total: Option<i32>,
    page_size: Option<i32>,
    page_total: Option<i32>,
    links: HashMap<LinkRel, String>,
}

impl<T> ApiResponse<T> {
    /// Wraps content served from the cache. Every header-derived field is
    /// absent and `cached` is `true`.
    pub(crate) fn from_cache(content: T) -> Self {
        Self {
            content,
            cached: true,
            cache_max_age: None,
            expires: None,
            rate_limit_limit: None,
            result_count: None,
            result_total: None,
            page_size: None,
            page_total: None,
            links: HashMap::new(),
        }
    }

    /// Wraps content decoded from a live response, parsing each metadata
    /// header independently.
    pub(crate) fn from_response(raw: &RawResponse, content: T) -> Self {
        Self {
            content,
            cached: false,
            cache_max_age: parse_max_age(raw.header("cache-control")),
            expires: raw.header("expires").and_then(parse_expires),
            rate_limit_limit: parse_int(raw.header("x-rate-limit-limit")),
            result_count: parse_int(raw.header("x-result-count")),
            result_total: parse_int(raw.header("x-result-total")),
            page_size: parse_int(raw.header("x-page-size")),
            page_total: parse_int(raw.header("x-page-total")),
            links: raw.header("link").map(parse_links).unwrap_or_default(),
        }
    }

    /// Wraps content assembled from several underlying requests. No single
    /// set of response headers applies, so all metadata is absent.
    pub(crate) fn aggregate(content: T) -> Self {
        Self {
            cached: false,
            ..Self::from_cache(content)
        }
    }

    pub fn content(&self) -> &T {
        &self.content
    }

    pub fn into_content(self) -> T {
        self.content
    }

    /// Whether this response was served from the cache without a network
    /// call.
    pub fn cached(&self) -> bool {
        self.cached
    }

    /// `Cache-Control` max-age.
    pub fn cache_max_age(&self) -> Option<Duration> {
        self.cache_max_age
    }

    /// `Expires` timestamp.
    pub fn expires(&self) -> Option<DateTime<FixedOffset>> {
        self.expires
    }

    /// `X-Rate-Limit-Limit`: requests allowed per minute.
    pub fn rate_limit_limit(&self) -> Option<i32> {
        self.rate_limit_limit
    }

    /// `X-Result-Count`: number of results in this response.
    pub fn result_count(&self) -> Option<i32> {
        self.result_count
    }

    /// `X-Result-Total`: total number of results across all pages.
    pub fn result_total(&self) -> Option<i32> {
        self.result_total
    }

    /// `X-Page-Size`: the page size this response was served with.
    pub fn page_size(&self) -> Option<i32> {
        self.page_size
    }

    /// `X-Page-Total`: total number of pages.
    pub fn page_total(&self) -> Option<i32> {
        self.page_total
    }

    /// Pagination links from the `Link` header, keyed by relation.
    pub fn links(&self) -> &HashMap<LinkRel, String> {
        &self.links
    }

    /// The URI for one link relation, if the response carried it.
    pub fn link(&self, rel: LinkRel) -> Option<&str> {
        self.links.get(&rel).map(String::as_str)
    }
}

/// Extracts the max-age directive from a `Cache-Control` header value.
pub(crate) fn parse_max_age(value: Option<&str>) -> Option<Duration> {
    let value = value?;
    value.split(',').find_map(|directive| {
        let seconds = directive.trim().strip_prefix("max-age=")?;
        seconds.trim().parse::<u64>().ok().map(Duration::from_secs)
    })
}

/// Parses an `Expires` header (RFC 2822 HTTP date).
pub(crate) fn parse_expires(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value.trim()).ok()
}

fn parse_int(value: Option<&str>) -> Option<i32> {
    value?.trim().parse().ok()
}

/// Parses an RFC 5988-style `Link` header into a relation → URI mapping.
///
/// Segments are split on `,`; a segment missing either the relation token or
/// the `<...>` URI is dropped silently.
fn parse_links(value: &str) -> HashMap<LinkRel, String> {
    value
        .split(',')
        .filter_map(|segment| {
            let rel = link_rel_regex().captures(segment)?;
            let rel = LinkRel::from_str(rel.get(1)?.as_str()).ok()?;
            let uri = link_uri_regex().captures(segment)?;
            Some((rel, uri.get(1)?.as_str().to_string()))
        })
        .collect()
}
