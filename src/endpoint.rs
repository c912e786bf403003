//! Endpoint descriptors and the capability traits endpoint clients compose
//! from.
//!
//! Instead of a deep client class hierarchy, each concrete endpoint client
//! implements exactly the capabilities its endpoint supports ([`GetSingle`],
//! [`GetBlob`], [`GetByIds`], [`GetAll`], [`GetPaginated`]); calling an
//! unsupported capability does not compile. The method bodies live here as
//! default implementations over the shared request executor.

use std::fmt::Display;
use std::hash::Hash;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::connection::Connection;
use crate::pagination::{self, BulkResult, PageSequence};
use crate::request::RequestParams;
use crate::response::ApiResponse;
use crate::Error;

/// Static metadata describing one API endpoint. Defined at client
/// construction time, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDescriptor {
    /// Path template relative to the base URL, with `:name` placeholders.
    pub path: &'static str,
    /// Schema-version timestamp pinned with the `v` query parameter.
    pub schema_version: Option<&'static str>,
    /// Whether requests must carry an access token.
    pub requires_auth: bool,
    /// Whether the endpoint answers a single `ids=all` request.
    pub supports_ids_all: bool,
    /// Maximum number of ids accepted in one request.
    pub max_batch_size: usize,
}

/// Resources that carry their own id. Required for bulk fetches, where
/// responses are merged back into the caller's requested id order.
pub trait Identified {
    type Id: Clone + Eq + Hash + Display + DeserializeOwned + Send + Sync;

    fn id(&self) -> Self::Id;
}

/// Common surface of every endpoint client.
pub trait EndpointClient: Send + Sync {
    fn descriptor(&self) -> &EndpointDescriptor;

    fn connection(&self) -> &Connection;

    /// Values substituted into the path template's `:name` placeholders.
    fn path_params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Marker for endpoints that require an access token.
///
/// The executor refuses authenticated requests without a token before any
/// network I/O; this trait also lets callers check up front.
pub trait Authenticated: EndpointClient {
    /// Fails with [`Error::AuthenticationRequired`] when the connection has
    /// no access token.
    fn require_token(&self) -> Result<(), Error> {
        if self.connection().access_token().is_none() {
            return Err(Error::AuthenticationRequired(
                self.descriptor().path.to_string(),
            ));
        }
        Ok(())
    }
}

/// Fetches the endpoint's single resource. No parameters.
#[async_trait]
pub trait GetSingle: EndpointClient {
    type Output: DeserializeOwned + Send;

    async fn get(&self) -> Result<ApiResponse<Self::Output>, Error> {
        let params = RequestParams {
            path_params: self.path_params(),
            ..Default::default()
        };
        self.connection().execute(self.descriptor(), params).await
    }
}

/// Fetches the endpoint's whole collection in one call, without ids.
#[async_trait]
pub trait GetBlob: EndpointClient {
    type Output: DeserializeOwned + Send;

    async fn get_blob(&self) -> Result<ApiResponse<Self::Output>, Error> {
        let params = RequestParams {
            path_params: self.path_params(),
            ..Default::default()
        };
        self.connection().execute(self.descriptor(), params).await
    }
}

/// Bulk access by resource id.
#[async_trait]
pub trait GetByIds: EndpointClient {
    type Item: DeserializeOwned + Identified + Send;

    /// Fetches the list of all resource ids.
    async fn ids(&self) -> Result<ApiResponse<Vec<<Self::Item as Identified>::Id>>, Error> {
        let params = RequestParams {
            path_params: self.path_params(),
            ..Default::default()
        };
        self.connection().execute(self.descriptor(), params).await
    }

    /// Fetches the given ids, splitting them into batches of at most
    /// [`EndpointDescriptor::max_batch_size`] and merging the results in the
    /// requested order. Ids the API does not know end up in
    /// [`BulkResult::missing`] rather than failing the call.
    async fn many(
        &self,
        ids: &[<Self::Item as Identified>::Id],
    ) -> Result<BulkResult<Self::Item, <Self::Item as Identified>::Id>, Error> {
        pagination::fetch_by_ids::<Self::Item>(
            self.connection(),
            self.descriptor(),
            self.path_params(),
            ids,
        )
        .await
    }

    /// Fetches one resource by id.
    async fn single(
        &self,
        id: <Self::Item as Identified>::Id,
    ) -> Result<ApiResponse<Self::Item>, Error> {
        let params = RequestParams {
            path_params: self.path_params(),
            ids: Some(id.to_string()),
            ..Default::default()
        };
        let response = self
            .connection()
            .execute::<Vec<Self::Item>>(self.descriptor(), params)
            .await?;
        let cached = response.cached();
        match response.into_content().into_iter().next() {
            Some(item) if cached => Ok(ApiResponse::from_cache(item)),
            Some(item) => Ok(ApiResponse::aggregate(item)),
            None => Err(Error::Api {
                status: 404,
                message: format!("id {id} not found"),
            }),
        }
    }
}

/// Fetches every resource the endpoint has.
#[async_trait]
pub trait GetAll: GetByIds {
    /// One `ids=all` request when the endpoint supports it, otherwise the id
    /// list followed by chunked by-ids fetches merged in id order.
    async fn all(&self) -> Result<ApiResponse<Vec<Self::Item>>, Error> {
        pagination::fetch_all::<Self::Item>(
            self.connection(),
            self.descriptor(),
            self.path_params(),
        )
        .await
    }
}

/// Page-by-page access with `page`/`page_size` parameters.
pub trait GetPaginated: EndpointClient {
    type Page: DeserializeOwned + Send + 'static;

    /// Returns a lazy pager. Nothing is fetched until the consumer asks for
    /// the first page; call again for a fresh, restarted sequence.
    fn pages(&self, page_size: i32) -> PageSequence<'_, Self::Page> {
        PageSequence::new(
            self.connection(),
            self.descriptor(),
            self.path_params(),
            page_size,
        )
    }
}
