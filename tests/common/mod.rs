//! Shared test transport that serves canned responses in-process.
//!
//! Unlike a socket-backed mock server, this transport does no real I/O, so
//! tests can pause the tokio clock and assert exact transport call counts.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gw2api::transport::{RawResponse, Transport};
use gw2api::Error;
use url::Url;

type Responder = Box<dyn Fn(&Url) -> Result<RawResponse, Error> + Send + Sync>;

pub struct RecordingTransport {
    respond: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Url>>,
}

impl RecordingTransport {
    pub fn new(
        respond: impl Fn(&Url) -> Result<RawResponse, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Makes every request take `delay` of (possibly paused) tokio time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, url: &Url, _headers: &[(String, String)]) -> Result<RawResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(url.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(url)
    }
}

pub fn json_response(body: &str, headers: &[(&str, &str)]) -> RawResponse {
    RawResponse::new(
        200,
        headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string())),
        body.to_string(),
    )
}

pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
