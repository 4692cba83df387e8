//! Declarative field extraction from loosely-shaped upstream records.
//!
//! Upstream resources name the same concept differently across API
//! versions. Each canonical field is read through a [`FieldRule`]: an ordered
//! list of dotted paths where the first usable value wins.

use serde_json::Value;

use crate::domain::{CanonicalItem, ItemType};

/// Ordered candidate paths for one canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub paths: &'static [&'static str],
}

impl FieldRule {
    pub const fn new(field: &'static str, paths: &'static [&'static str]) -> Self {
        Self { field, paths }
    }

    /// First candidate that is a non-empty string or an integer, as text.
    pub fn string(&self, record: &Value) -> Option<String> {
        self.paths
            .iter()
            .find_map(|path| lookup(record, path).and_then(scalar_text))
    }

    /// First candidate that reads as a non-negative whole amount.
    pub fn price(&self, record: &Value) -> Option<u64> {
        self.paths
            .iter()
            .find_map(|path| lookup(record, path).and_then(non_negative_amount))
    }
}

/// The rules that turn one record into a [`CanonicalItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    pub item_type: ItemType,
    pub id: FieldRule,
    pub name: FieldRule,
    pub price: FieldRule,
    pub icon: FieldRule,
    pub creator: FieldRule,
}

pub const GAME_PASS_RULES: RuleSet = RuleSet {
    item_type: ItemType::Gamepass,
    id: FieldRule::new("itemId", &["gamePassId", "id", "passId"]),
    name: FieldRule::new("itemName", &["displayName", "name"]),
    price: FieldRule::new(
        "itemPrice",
        &[
            "price",
            "priceInRobux",
            "priceInformation.defaultPriceInRobux",
            "priceInformation.priceInRobux",
        ],
    ),
    icon: FieldRule::new(
        "itemImageRef",
        &[
            "iconAssetId",
            "iconImageAssetId",
            "displayIconImageAssetId",
            "imageId",
        ],
    ),
    creator: FieldRule::new("creatorId", &["creator.id", "creatorId", "creatorTargetId"]),
};

pub const COLLECTIBLE_RULES: RuleSet = RuleSet {
    item_type: ItemType::Asset,
    id: FieldRule::new("itemId", &["assetId", "id"]),
    name: FieldRule::new("itemName", &["name", "assetName"]),
    price: FieldRule::new("itemPrice", &["recentAveragePrice", "price", "originalPrice"]),
    icon: FieldRule::new("itemImageRef", &["iconAssetId", "imageId"]),
    creator: FieldRule::new("creatorId", &["creator.id", "creatorTargetId", "creatorId"]),
};

pub const UNIVERSE_ID_RULE: FieldRule =
    FieldRule::new("universeId", &["universeId", "universe_id", "id"]);

const WORN_ID_FIELDS: [&str; 3] = ["assetIds", "assets", "data"];
const WORN_ENTRY_RULE: FieldRule = FieldRule::new("assetId", &["assetId", "id"]);

/// Normalize one record, or `None` when it carries no usable id.
///
/// `default_creator` fills `creatorId` when no rule matches.
pub fn normalize(record: &Value, rules: &RuleSet, default_creator: &str) -> Option<CanonicalItem> {
    let id = rules.id.string(record)?;
    let name = rules
        .name
        .string(record)
        .unwrap_or_else(|| fallback_name(rules.item_type, &id));
    let price = rules.price.price(record).unwrap_or(0);
    let creator = rules
        .creator
        .string(record)
        .unwrap_or_else(|| default_creator.to_owned());
    let image = image_ref(rules.item_type, &id, rules.icon.string(record).as_deref());

    CanonicalItem::new(id, name, price, rules.item_type, creator, image).ok()
}

/// A price-zero asset standing in for an id with no detail record.
pub fn placeholder(asset_id: &str) -> Option<CanonicalItem> {
    CanonicalItem::new(
        asset_id,
        fallback_name(ItemType::Asset, asset_id),
        0,
        ItemType::Asset,
        "",
        image_ref(ItemType::Asset, asset_id, None),
    )
    .ok()
}

/// Distinct universe ids in first-seen order.
pub fn universe_ids(records: &[Value]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in records.iter().filter_map(|record| UNIVERSE_ID_RULE.string(record)) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Asset ids from a currently-wearing body. Entries may be bare ids or
/// objects carrying `assetId`/`id`.
pub fn worn_asset_ids(body: &Value) -> Vec<String> {
    let entries = match body {
        Value::Array(entries) => Some(entries),
        Value::Object(map) => WORN_ID_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array)),
        _ => None,
    };

    entries
        .into_iter()
        .flatten()
        .filter_map(|entry| match entry {
            Value::Object(_) => WORN_ENTRY_RULE.string(entry),
            other => scalar_text(other),
        })
        .collect()
}

pub fn image_ref(item_type: ItemType, id: &str, icon: Option<&str>) -> String {
    match icon {
        Some(icon) if icon != "0" => format!("rbxassetid://{icon}"),
        _ => format!(
            "rbxthumb://type={}&id={id}&w=150&h=150",
            item_type.thumbnail_type()
        ),
    }
}

fn fallback_name(item_type: ItemType, id: &str) -> String {
    match item_type {
        ItemType::Gamepass => format!("Gamepass {id}"),
        ItemType::Asset => format!("Asset {id}"),
    }
}

/// Follow a dotted path through nested objects.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|found| !found.is_null())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        }
        Value::Number(number) => number
            .as_u64()
            .map(|n| n.to_string())
            .or_else(|| number.as_i64().map(|n| n.to_string())),
        _ => None,
    }
}

fn non_negative_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|amount| amount.is_finite() && *amount >= 0.0)
                .map(|amount| amount.trunc() as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}
