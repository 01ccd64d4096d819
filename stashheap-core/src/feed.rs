//! Fat records as served by the public stash tab feed.
//!
//! Only the fields the compaction and cataloguing paths read are modelled;
//! everything else in the payload is ignored during decoding.

use serde::{Deserialize, Deserializer, Serialize};

/// One snapshot of the stash feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default, deserialize_with = "nullable")]
    pub next_change_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub stashes: Vec<Stash>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stash {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub account_name: String,
    /// Tab label chosen by the owner.
    #[serde(default, rename = "stash", deserialize_with = "nullable")]
    pub label: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    /// Feed-native id of the owning stash; not part of the payload, set by
    /// [`Feed::link_items`].
    #[serde(skip)]
    pub stash_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub type_line: String,
    #[serde(default, deserialize_with = "nullable")]
    pub note: String,
    #[serde(default)]
    pub corrupted: bool,
    #[serde(default)]
    pub identified: bool,
    #[serde(default)]
    pub ilvl: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub properties: Vec<Property>,
    #[serde(default, deserialize_with = "nullable")]
    pub requirements: Vec<Property>,
    #[serde(default, deserialize_with = "nullable")]
    pub additional_properties: Vec<Property>,
    #[serde(default, deserialize_with = "nullable")]
    pub next_level_requirements: Vec<Property>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    /// `(text, colour hint)` pairs.
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<(String, u32)>,
    #[serde(default)]
    pub display_mode: u32,
}

impl Feed {
    /// Points every item's `stash_id` at its enclosing stash.
    pub fn link_items(&mut self) {
        for stash in &mut self.stashes {
            for item in &mut stash.items {
                item.stash_id.clone_from(&stash.id);
            }
        }
    }

    /// Total number of items across all stashes.
    pub fn item_count(&self) -> usize {
        self.stashes.iter().map(|s| s.items.len()).sum()
    }

    /// Every property name of every item, duplicates included.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.stashes
            .iter()
            .flat_map(|stash| &stash.items)
            .flat_map(Item::property_names)
    }
}

impl Item {
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .chain(&self.requirements)
            .chain(&self.additional_properties)
            .chain(&self.next_level_requirements)
            .map(|p| p.name.as_str())
    }
}

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
