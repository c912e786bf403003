//! Typed client core for the Guild Wars 2 v2 REST API.
//!
//! The crate centers on a shared request core: responses are wrapped in an
//! [`ApiResponse`] envelope carrying header-derived metadata (rate limits,
//! pagination links, totals), bodies are cached by request fingerprint with
//! TTL semantics, and identical concurrent requests share one network call.
//! Endpoint clients are thin declarative registrations composing the
//! capability traits in [`endpoint`].
//!
//! ```no_run
//! use gw2api::{Connection, GetByIds, Gw2Api};
//!
//! # async fn run() -> Result<(), gw2api::Error> {
//! let api = Gw2Api::new(Connection::new()?);
//! let worlds = api.worlds().many(&[1001, 1002]).await?;
//! for world in &worlds.items {
//!     println!("{}", world.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod clients;
mod connection;
mod endpoint;
mod errors;
pub mod models;
mod pagination;
mod request;
mod response;
pub mod transport;

pub use self::clients::{
    AccountBankClient, AccountClient, BuildClient, CharactersClient, CharactersIdCoreClient,
    Gw2Api, ItemsClient, QuaggansClient, TokenInfoClient, WorldsClient,
};
pub use self::connection::{Connection, ConnectionBuilder, Locale, DEFAULT_BASE_URL};
pub use self::endpoint::{
    Authenticated, EndpointClient, EndpointDescriptor, GetAll, GetBlob, GetByIds, GetPaginated,
    GetSingle, Identified,
};
pub use self::errors::Error;
pub use self::pagination::{BulkResult, PageSequence, MAX_IDS_PER_REQUEST};
pub use self::response::{ApiResponse, LinkRel};
