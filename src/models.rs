//! Response shapes for the shipped endpoint clients.
//!
//! Only the fields every resource of a kind carries are modeled; the API
//! serves many optional fields that callers can capture with their own
//! shapes and the generic capability traits.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::endpoint::Identified;

/// The current game build (`/build`).
#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    pub id: i64,
}

/// A game world (`/worlds`).
#[derive(Debug, Clone, Deserialize)]
pub struct World {
    pub id: i32,
    pub name: String,
    pub population: String,
}

impl Identified for World {
    type Id = i32;

    fn id(&self) -> i32 {
        self.id
    }
}

/// An item (`/items`).
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rarity: String,
    pub level: i32,
}

impl Identified for Item {
    type Id = i32;

    fn id(&self) -> i32 {
        self.id
    }
}

/// A quaggan image (`/quaggans`).
#[derive(Debug, Clone, Deserialize)]
pub struct Quaggan {
    pub id: String,
    pub url: String,
}

impl Identified for Quaggan {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Metadata about the access token in use (`/tokeninfo`).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

/// The authenticated account (`/account`).
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub world: i32,
    #[serde(default)]
    pub guilds: Vec<String>,
    pub created: DateTime<Utc>,
}

/// One occupied bank slot (`/account/bank`). Empty slots are JSON `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct BankSlot {
    pub id: i32,
    pub count: i32,
}

/// A character (`/characters`). Characters are identified by name.
#[derive(Debug, Clone, Deserialize)]
pub struct Character {
    pub name: String,
    pub race: String,
    pub profession: String,
    pub level: i32,
}

impl Identified for Character {
    type Id = String;

    fn id(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_deserializes_with_type_field() {
        let item: Item = serde_json::from_str(
            r#"{"id":19684,"name":"Mithril Ingot","type":"CraftingMaterial","rarity":"Basic","level":0}"#,
        )
        .unwrap();
        assert_eq!(item.id, 19684);
        assert_eq!(item.kind, "CraftingMaterial");
    }

    #[test]
    fn bank_slots_tolerate_nulls() {
        let slots: Vec<Option<BankSlot>> =
            serde_json::from_str(r#"[{"id":100,"count":250},null,{"id":7,"count":1}]"#).unwrap();
        assert_eq!(slots.len(), 3);
        assert!(slots[1].is_none());
    }
}
