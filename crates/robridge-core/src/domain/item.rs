use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Canonical item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Gamepass,
    Asset,
}

impl ItemType {
    /// Type name used in `rbxthumb://` references.
    pub const fn thumbnail_type(self) -> &'static str {
        match self {
            Self::Gamepass => "GamePass",
            Self::Asset => "Asset",
        }
    }
}

/// How much an item entry can be trusted when two sources disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provenance {
    /// Synthesized from a bare id.
    Placeholder,
    /// Normalized from a full upstream record.
    Detailed,
}

/// One purchasable or wearable thing, keyed by `item_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalItem {
    pub item_id: String,
    pub item_name: String,
    pub item_price: u64,
    pub item_type: ItemType,
    pub creator_id: String,
    pub item_image_ref: String,
}

impl CanonicalItem {
    pub fn new(
        item_id: impl Into<String>,
        item_name: impl Into<String>,
        item_price: u64,
        item_type: ItemType,
        creator_id: impl Into<String>,
        item_image_ref: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let item_id = item_id.into();
        if item_id.trim().is_empty() {
            return Err(ValidationError::EmptyItemId);
        }

        Ok(Self {
            item_id,
            item_name: item_name.into(),
            item_price,
            item_type,
            creator_id: creator_id.into(),
            item_image_ref: item_image_ref.into(),
        })
    }
}

/// The merged view of everything a subject owns or wears.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub items: BTreeMap<String, CanonicalItem>,
    /// Sources that only partially succeeded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AggregateResult {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds an item map where detailed entries win over placeholders.
///
/// At equal provenance the later insert replaces the earlier one.
#[derive(Debug, Default)]
pub struct ItemMerger {
    items: BTreeMap<String, (Provenance, CanonicalItem)>,
}

impl ItemMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the item was stored.
    pub fn insert(&mut self, item: CanonicalItem, provenance: Provenance) -> bool {
        match self.items.get(&item.item_id) {
            Some((existing, _)) if *existing > provenance => false,
            _ => {
                self.items
                    .insert(item.item_id.clone(), (provenance, item));
                true
            }
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn finish(self, warnings: Vec<String>) -> AggregateResult {
        AggregateResult {
            items: self
                .items
                .into_iter()
                .map(|(id, (_, item))| (id, item))
                .collect(),
            warnings,
        }
    }
}
