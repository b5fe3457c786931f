//! Decoding of item JSON returned by the remote API.
//!
//! Item shapes are inconsistent (deleted items lack `by` and `text`, leaf
//! comments lack `kids`), so every field is extracted independently and
//! falls back to its own default instead of failing the whole item.

use crate::types::{ItemId, ItemType};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// String-keyed view of one JSON object
///
/// Malformed input, `null` and non-object documents all decode to an empty
/// mapping rather than an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemData {
    fields: Map<String, Value>,
}

impl ItemData {
    /// Decode raw JSON text
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => Self { fields },
            _ => Self::default(),
        }
    }

    /// True when no fields were decoded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the field exists at all
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// A string field
    pub fn string(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// An integer field; numeric strings are accepted too
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// An array of integers; any non-integer element invalidates the field
    pub fn integers(&self, key: &str) -> Option<Vec<i64>> {
        self.fields
            .get(key)?
            .as_array()?
            .iter()
            .map(Value::as_i64)
            .collect()
    }

    /// The `type` field mapped onto [`ItemType`]
    pub fn item_type(&self) -> ItemType {
        self.string("type")
            .map(ItemType::from_api)
            .unwrap_or_default()
    }

    /// The `by` field, the only one a reply cannot be filed without
    pub fn author(&self) -> Option<&str> {
        self.string("by")
    }
}

/// Placeholder author for items whose `by` field is gone
pub const DELETED_AUTHOR: &str = "[deleted]";

/// Parsed representation of one remote item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    /// Item id (0 when absent)
    pub id: ItemId,
    /// Author
    pub by: String,
    /// Child ids in the order returned by the API
    pub kids: Vec<ItemId>,
    /// Parent id (0 for top-level items)
    pub parent: ItemId,
    /// Raw HTML text
    pub text: String,
    /// Creation time in epoch seconds
    pub time: i64,
    /// Kind of item
    pub item_type: ItemType,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            id: ItemId::default(),
            by: DELETED_AUTHOR.to_string(),
            kids: Vec::new(),
            parent: ItemId::default(),
            text: String::new(),
            time: 0,
            item_type: ItemType::Unknown,
        }
    }
}

impl Item {
    /// Decode every field independently, defaulting each one on failure
    pub fn from_data(data: &ItemData) -> Self {
        Self {
            id: data.integer("id").map(ItemId).unwrap_or_default(),
            by: data.author().unwrap_or(DELETED_AUTHOR).to_string(),
            kids: data
                .integers("kids")
                .map(|ids| ids.into_iter().map(ItemId).collect())
                .unwrap_or_default(),
            parent: data.integer("parent").map(ItemId).unwrap_or_default(),
            text: data.string("text").unwrap_or_default().to_string(),
            time: data.integer("time").unwrap_or(0),
            item_type: data.item_type(),
        }
    }

    /// Decode raw JSON text
    pub fn parse(raw: &str) -> Self {
        Self::from_data(&ItemData::parse(raw))
    }

    /// Creation time, if `time` holds a representable timestamp
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        if self.time == 0 {
            return None;
        }
        DateTime::from_timestamp(self.time, 0)
    }

    /// Top-level items have no parent
    pub fn is_top_level(&self) -> bool {
        self.parent == 0
    }
}

/// Extract the id list from an `updates.json` body
///
/// Unparseable bodies and a missing or malformed `items` field yield an empty list.
pub fn parse_updated_ids(raw: &str) -> Vec<ItemId> {
    ItemData::parse(raw)
        .integers("items")
        .map(|ids| ids.into_iter().map(ItemId).collect())
        .unwrap_or_default()
}
