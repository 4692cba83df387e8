//! # Domain Models
//!
//! Canonical types the aggregator produces.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SubjectId`] | Validated numeric user or universe id |
//! | [`CanonicalItem`] | One normalized game pass or asset |
//! | [`ItemType`] | `Gamepass` or `Asset` |
//! | [`Provenance`] | Placeholder or detailed origin of an entry |
//! | [`ItemMerger`] | Priority-aware item map builder |
//! | [`AggregateResult`] | Serialized aggregate with warnings |
//!
//! Construction validates invariants; an item without an id cannot exist.

mod item;
mod subject;

pub use item::{AggregateResult, CanonicalItem, ItemMerger, ItemType, Provenance};
pub use subject::SubjectId;
