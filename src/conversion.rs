use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use crate::error::{BasketError, Result};
use crate::item::{Item, ItemHasher, ItemId};

/// Replaces items with the group they generalize to, which lets the miner
/// produce generalized association rules over item hierarchies.
pub trait ItemConverter: Send + Sync {
    fn try_convert(&self, item: &Item) -> Option<Item>;
}

// ------------- ItemConversionRule -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemConversionRule {
    source: Item,
    target: Item,
}

impl ItemConversionRule {
    pub fn new(source: Item, target: Item) -> Result<Self> {
        if source.is_group() {
            return Err(BasketError::invalid_argument(
                "source",
                format!("source item {} is a group, but transactions only hold plain items", source.id()),
            ));
        }
        if !target.is_group() {
            return Err(BasketError::invalid_argument(
                "target",
                format!("target item {} must be a group", target.id()),
            ));
        }
        Ok(Self { source, target })
    }
    pub fn source(&self) -> &Item {
        &self.source
    }
    pub fn target(&self) -> &Item {
        &self.target
    }
}
impl fmt::Display for ItemConversionRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.source.name(), self.target.name())
    }
}

// ------------- RuleBasedItemConverter -------------
#[derive(Debug)]
pub struct RuleBasedItemConverter {
    replacements: HashMap<ItemId, Item, ItemHasher>,
}

impl RuleBasedItemConverter {
    /// Every source item may map to exactly one group.
    pub fn new(rules: Vec<ItemConversionRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(BasketError::invalid_argument(
                "rules",
                "collection of item conversion rules cannot be empty",
            ));
        }
        let mut replacements = HashMap::with_capacity_and_hasher(rules.len(), ItemHasher::default());
        for rule in rules {
            match replacements.entry(rule.source.id()) {
                Entry::Vacant(e) => {
                    e.insert(rule.target);
                }
                Entry::Occupied(_) => {
                    return Err(BasketError::invalid_argument(
                        "rules",
                        format!("item {} appears as the source of more than one conversion rule", rule.source.id()),
                    ));
                }
            }
        }
        Ok(Self { replacements })
    }
}

impl ItemConverter for RuleBasedItemConverter {
    fn try_convert(&self, item: &Item) -> Option<Item> {
        self.replacements.get(&item.id()).cloned()
    }
}
