use std::sync::Arc;

// items are keyed by id in every hot map, so a fast non-cryptographic hasher pays off
use core::hash::{BuildHasherDefault, Hasher};
use seahash::SeaHasher;

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

// ------------- Item -------------
pub type ItemId = u32;

pub type ItemHasher = BuildHasherDefault<SeaHasher>;

/// An item observed in transactions, or a group item that generalizes several of them.
///
/// Identity is the `id` alone: two items with the same id are the same item no
/// matter what name or group flag they carry. The name is reference counted so
/// that items can be cloned freely into the concurrent counters of the miner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    name: Arc<str>,
    is_group: bool,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<Arc<str>>, is_group: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_group,
        }
    }
    // Getters only, so an item is immutable once created.
    pub fn id(&self) -> ItemId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_group(&self) -> bool {
        self.is_group
    }
}
impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Item {}
impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Orders two items by id so that an unordered pair has a single canonical key.
pub(crate) fn ordered_pair(first: Item, second: Item) -> (Item, Item) {
    if first.id <= second.id {
        (first, second)
    } else {
        (second, first)
    }
}
