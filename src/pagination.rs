//! Bulk, all, and page-by-page fetch strategies on top of the request
//! executor.

use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;

use futures::{future, stream, Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::connection::Connection;
use crate::endpoint::{EndpointDescriptor, Identified};
use crate::request::RequestParams;
use crate::response::ApiResponse;
use crate::Error;

/// Maximum number of ids the API accepts in one request.
pub const MAX_IDS_PER_REQUEST: usize = 200;

/// Outcome of a bulk by-ids fetch.
///
/// The API omits unknown ids rather than failing, so a shorter-than-requested
/// result is reported here and the caller decides whether that is fatal.
#[derive(Debug, Clone)]
pub struct BulkResult<T, I> {
    /// Fetched items, in the order their ids were requested.
    pub items: Vec<T>,
    /// Requested ids missing from the response.
    pub missing: Vec<I>,
}

impl<T, I> BulkResult<T, I> {
    /// Whether every requested id was returned.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Chunked by-ids fetch: one request per batch, dispatched concurrently but
/// recombined in request order, then reordered to the caller's id order.
pub(crate) async fn fetch_by_ids<T>(
    conn: &Connection,
    descriptor: &EndpointDescriptor,
    path_params: Vec<(&'static str, String)>,
    ids: &[T::Id],
) -> Result<BulkResult<T, T::Id>, Error>
where
    T: DeserializeOwned + Identified + Send,
{
    if ids.is_empty() {
        return Err(Error::InvalidArgument("empty id set".to_string()));
    }

    let chunk_size = descriptor.max_batch_size.clamp(1, MAX_IDS_PER_REQUEST);
    let requests = ids.chunks(chunk_size).map(|chunk| {
        let params = RequestParams {
            path_params: path_params.clone(),
            ids: Some(join_ids(chunk)),
            ..Default::default()
        };
        conn.execute::<Vec<T>>(descriptor, params)
    });
    // try_join_all yields chunk results in request order regardless of
    // completion order.
    let chunks = future::try_join_all(requests).await?;

    let mut by_id: HashMap<T::Id, T> = chunks
        .into_iter()
        .flat_map(ApiResponse::into_content)
        .map(|item| (item.id(), item))
        .collect();
    let mut items = Vec::with_capacity(ids.len());
    let mut missing = Vec::new();
    for id in ids {
        match by_id.remove(id) {
            Some(item) => items.push(item),
            None => missing.push(id.clone()),
        }
    }
    if !missing.is_empty() {
        tracing::debug!(
            endpoint = descriptor.path,
            missing = missing.len(),
            "bulk fetch returned fewer items than requested"
        );
    }
    Ok(BulkResult { items, missing })
}

/// Fetches every resource: one `ids=all` request when the endpoint supports
/// it, otherwise the id list followed by chunked by-ids fetches.
pub(crate) async fn fetch_all<T>(
    conn: &Connection,
    descriptor: &EndpointDescriptor,
    path_params: Vec<(&'static str, String)>,
) -> Result<ApiResponse<Vec<T>>, Error>
where
    T: DeserializeOwned + Identified + Send,
{
    if descriptor.supports_ids_all {
        let params = RequestParams {
            path_params,
            ids: Some("all".to_string()),
            ..Default::default()
        };
        return conn.execute(descriptor, params).await;
    }

    let id_params = RequestParams {
        path_params: path_params.clone(),
        ..Default::default()
    };
    let ids = conn
        .execute::<Vec<T::Id>>(descriptor, id_params)
        .await?
        .into_content();
    if ids.is_empty() {
        return Ok(ApiResponse::aggregate(Vec::new()));
    }
    let bulk = fetch_by_ids::<T>(conn, descriptor, path_params, &ids).await?;
    Ok(ApiResponse::aggregate(bulk.items))
}

fn join_ids<I: Display>(ids: &[I]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Lazy pager over a collection endpoint.
///
/// One page is fetched per [`PageSequence::next`] call; nothing is requested
/// until the consumer asks. The sequence ends when a page comes back shorter
/// than the requested size, or when the totals announced by `X-Page-Total` /
/// `X-Result-Total` are reached; no fetch is ever issued past a known end.
/// [`PageSequence::reset`] restarts at the first page.
pub struct PageSequence<'a, T> {
    conn: &'a Connection,
    descriptor: EndpointDescriptor,
    path_params: Vec<(&'static str, String)>,
    page_size: i32,
    next_page: i32,
    page_total: Option<i32>,
    result_total: Option<i32>,
    yielded: i64,
    done: bool,
    _content: PhantomData<fn() -> T>,
}

impl<'a, T> PageSequence<'a, T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(
        conn: &'a Connection,
        descriptor: &EndpointDescriptor,
        path_params: Vec<(&'static str, String)>,
        page_size: i32,
    ) -> Self {
        Self {
            conn,
            descriptor: *descriptor,
            path_params,
            page_size,
            next_page: 0,
            page_total: None,
            result_total: None,
            yielded: 0,
            done: false,
            _content: PhantomData,
        }
    }

    /// Restarts the sequence at the first page.
    pub fn reset(&mut self) {
        self.next_page = 0;
        self.page_total = None;
        self.result_total = None;
        self.yielded = 0;
        self.done = false;
    }

    /// Fetches the next page, or returns `None` when the sequence is
    /// exhausted. An error ends the sequence after being yielded.
    pub async fn next(&mut self) -> Option<Result<ApiResponse<Vec<T>>, Error>> {
        if self.done {
            return None;
        }
        if let Some(total) = self.page_total {
            if self.next_page >= total {
                self.done = true;
                return None;
            }
        }
        if let Some(total) = self.result_total {
            if self.yielded >= i64::from(total) {
                self.done = true;
                return None;
            }
        }

        let params = RequestParams {
            path_params: self.path_params.clone(),
            page: Some(self.next_page),
            page_size: Some(self.page_size),
            ..Default::default()
        };
        let page = match self.conn.execute::<Vec<T>>(&self.descriptor, params).await {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        self.next_page += 1;
        self.yielded += page.content().len() as i64;
        if let Some(total) = page.page_total() {
            self.page_total = Some(total);
        }
        if let Some(total) = page.result_total() {
            self.result_total = Some(total);
        }
        if (page.content().len() as i32) < self.page_size {
            self.done = true;
        }
        Some(Ok(page))
    }

    /// Consumes the pager into a lazy stream of pages.
    pub fn into_stream(self) -> impl Stream<Item = Result<ApiResponse<Vec<T>>, Error>> + 'a {
        stream::unfold(self, |mut seq| async move {
            seq.next().await.map(|page| (page, seq))
        })
    }

    /// Consumes the pager into a lazy stream of items, flattening pages.
    pub fn into_items(self) -> impl Stream<Item = Result<T, Error>> + 'a {
        self.into_stream().flat_map(|page| match page {
            Ok(page) => stream::iter(
                page.into_content()
                    .into_iter()
                    .map(Ok)
                    .collect::<Vec<Result<T, Error>>>(),
            ),
            Err(e) => stream::iter(vec![Err(e)]),
        })
    }
}
