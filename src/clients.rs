//! Concrete endpoint clients, declared through a registry macro.
//!
//! Every client here is a thin registration: a path template, a schema
//! version, and the capability set the endpoint supports. The behavior all
//! lives in the capability traits and the shared executor.

use crate::connection::Connection;
use crate::endpoint::{
    Authenticated, EndpointClient, EndpointDescriptor, GetAll, GetBlob, GetByIds, GetPaginated,
    GetSingle,
};
use crate::models::{Account, BankSlot, Build, Character, Item, Quaggan, TokenInfo, World};
use crate::pagination::MAX_IDS_PER_REQUEST;

/// Declares an endpoint client: a struct carrying the connection (plus any
/// path parameters) and its static [`EndpointDescriptor`].
macro_rules! endpoint_client {
    (
        $(#[$meta:meta])*
        $name:ident {
            path: $path:literal,
            schema_version: $schema:expr,
            requires_auth: $auth:literal,
            supports_ids_all: $ids_all:literal
            $(, path_params: [$($pname:ident),+ $(,)?])?
            $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            connection: Connection,
            $($(pub $pname: String,)+)?
        }

        impl $name {
            const DESCRIPTOR: EndpointDescriptor = EndpointDescriptor {
                path: $path,
                schema_version: $schema,
                requires_auth: $auth,
                supports_ids_all: $ids_all,
                max_batch_size: MAX_IDS_PER_REQUEST,
            };

            pub fn new(connection: Connection $($(, $pname: impl Into<String>)+)?) -> Self {
                Self {
                    connection,
                    $($($pname: $pname.into(),)+)?
                }
            }
        }

        impl EndpointClient for $name {
            fn descriptor(&self) -> &EndpointDescriptor {
                &Self::DESCRIPTOR
            }

            fn connection(&self) -> &Connection {
                &self.connection
            }

            $(fn path_params(&self) -> Vec<(&'static str, String)> {
                vec![$((stringify!($pname), self.$pname.clone())),+]
            })?
        }
    };
}

endpoint_client! {
    /// `/build`: the current game build.
    BuildClient {
        path: "/build",
        schema_version: None,
        requires_auth: false,
        supports_ids_all: false,
    }
}

impl GetSingle for BuildClient {
    type Output = Build;
}

endpoint_client! {
    /// `/worlds`: game worlds, bulk-expandable with `ids=all`.
    WorldsClient {
        path: "/worlds",
        schema_version: Some("2019-02-21T00:00:00.000Z"),
        requires_auth: false,
        supports_ids_all: true,
    }
}

impl GetByIds for WorldsClient {
    type Item = World;
}
impl GetAll for WorldsClient {}
impl GetPaginated for WorldsClient {
    type Page = World;
}

endpoint_client! {
    /// `/items`: items. Too large for `ids=all`, so only by-ids and
    /// paginated access.
    ItemsClient {
        path: "/items",
        schema_version: Some("2019-02-21T00:00:00.000Z"),
        requires_auth: false,
        supports_ids_all: false,
    }
}

impl GetByIds for ItemsClient {
    type Item = Item;
}
impl GetPaginated for ItemsClient {
    type Page = Item;
}

endpoint_client! {
    /// `/quaggans`: quaggan images. No direct `ids=all`, so `all()` walks
    /// the id list in chunks.
    QuaggansClient {
        path: "/quaggans",
        schema_version: None,
        requires_auth: false,
        supports_ids_all: false,
    }
}

impl GetByIds for QuaggansClient {
    type Item = Quaggan;
}
impl GetAll for QuaggansClient {}

endpoint_client! {
    /// `/tokeninfo`: metadata about the access token in use.
    TokenInfoClient {
        path: "/tokeninfo",
        schema_version: None,
        requires_auth: true,
        supports_ids_all: false,
    }
}

impl Authenticated for TokenInfoClient {}
impl GetSingle for TokenInfoClient {
    type Output = TokenInfo;
}

endpoint_client! {
    /// `/account`: the authenticated account.
    AccountClient {
        path: "/account",
        schema_version: Some("2019-02-21T00:00:00.000Z"),
        requires_auth: true,
        supports_ids_all: false,
    }
}

impl Authenticated for AccountClient {}
impl GetSingle for AccountClient {
    type Output = Account;
}

endpoint_client! {
    /// `/account/bank`: the account bank as one blob of slots.
    AccountBankClient {
        path: "/account/bank",
        schema_version: Some("2019-02-21T00:00:00.000Z"),
        requires_auth: true,
        supports_ids_all: false,
    }
}

impl Authenticated for AccountBankClient {}
impl GetBlob for AccountBankClient {
    type Output = Vec<Option<BankSlot>>;
}

endpoint_client! {
    /// `/characters`: the account's characters, identified by name.
    CharactersClient {
        path: "/characters",
        schema_version: Some("2019-02-21T00:00:00.000Z"),
        requires_auth: true,
        supports_ids_all: false,
    }
}

impl Authenticated for CharactersClient {}
impl GetByIds for CharactersClient {
    type Item = Character;
}
impl GetPaginated for CharactersClient {
    type Page = Character;
}

endpoint_client! {
    /// `/characters/:id/core`: one character's core data.
    CharactersIdCoreClient {
        path: "/characters/:id/core",
        schema_version: None,
        requires_auth: true,
        supports_ids_all: false,
        path_params: [id],
    }
}

impl Authenticated for CharactersIdCoreClient {}
impl GetSingle for CharactersIdCoreClient {
    type Output = Character;
}

/// Entry point handing out endpoint clients that share one connection (and
/// therefore one cache and one in-flight request map).
pub struct Gw2Api {
    connection: Connection,
}

impl Gw2Api {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn build(&self) -> BuildClient {
        BuildClient::new(self.connection.clone())
    }

    pub fn worlds(&self) -> WorldsClient {
        WorldsClient::new(self.connection.clone())
    }

    pub fn items(&self) -> ItemsClient {
        ItemsClient::new(self.connection.clone())
    }

    pub fn quaggans(&self) -> QuaggansClient {
        QuaggansClient::new(self.connection.clone())
    }

    pub fn tokeninfo(&self) -> TokenInfoClient {
        TokenInfoClient::new(self.connection.clone())
    }

    pub fn account(&self) -> AccountClient {
        AccountClient::new(self.connection.clone())
    }

    pub fn account_bank(&self) -> AccountBankClient {
        AccountBankClient::new(self.connection.clone())
    }

    pub fn characters(&self) -> CharactersClient {
        CharactersClient::new(self.connection.clone())
    }

    pub fn character_core(&self, name: impl Into<String>) -> CharactersIdCoreClient {
        CharactersIdCoreClient::new(self.connection.clone(), name)
    }
}
