//! Item exclusion: keeping unwanted items out of mining.
//!
//! An [`ItemExclusionRule`] matches item names against a pattern, either as a
//! substring or as the whole name, optionally ignoring case. A rule applies to
//! plain items, to group items, or to both. The [`RuleBasedItemExcluder`]
//! combines several rules and remembers every decision it has made, since the
//! same items recur across many transactions.

use dashmap::DashSet;
use regex::{Regex, RegexBuilder};

use crate::error::{BasketError, Result};
use crate::item::{Item, ItemHasher, ItemId};

/// Decides whether an item takes part in mining.
pub trait ItemExcluder: Send + Sync {
    fn should_exclude(&self, item: &Item) -> bool;
}

// ------------- ItemExclusionRule -------------
#[derive(Debug, Clone)]
pub struct ItemExclusionRule {
    pattern: String,
    exact_match: bool,
    ignore_case: bool,
    apply_to_items: bool,
    apply_to_groups: bool,
    matcher: Regex,
}

impl ItemExclusionRule {
    pub fn new(
        pattern: impl Into<String>,
        exact_match: bool,
        ignore_case: bool,
        apply_to_items: bool,
        apply_to_groups: bool,
    ) -> Result<Self> {
        if !apply_to_items && !apply_to_groups {
            return Err(BasketError::invalid_argument(
                "apply_to_items",
                "an exclusion rule must apply to items or to groups",
            ));
        }
        let pattern = pattern.into();
        let escaped = regex::escape(&pattern);
        let expression = if exact_match {
            format!(r"\A(?:{escaped})\z")
        } else {
            escaped
        };
        let matcher = RegexBuilder::new(&expression)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| BasketError::invalid_argument("pattern", e.to_string()))?;
        Ok(Self {
            pattern,
            exact_match,
            ignore_case,
            apply_to_items,
            apply_to_groups,
            matcher,
        })
    }
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
    pub fn exact_match(&self) -> bool {
        self.exact_match
    }
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }
    pub fn apply_to_items(&self) -> bool {
        self.apply_to_items
    }
    pub fn apply_to_groups(&self) -> bool {
        self.apply_to_groups
    }
    pub fn should_exclude(&self, item: &Item) -> bool {
        let applies = if item.is_group() {
            self.apply_to_groups
        } else {
            self.apply_to_items
        };
        applies && self.matcher.is_match(item.name())
    }
}

// ------------- RuleBasedItemExcluder -------------
/// Excludes an item when any of its rules matches it.
///
/// Decisions are memoized per item id for the lifetime of the excluder, so
/// concurrent callers evaluate the rules at most a handful of times per item.
#[derive(Debug)]
pub struct RuleBasedItemExcluder {
    rules: Vec<ItemExclusionRule>,
    allowed: DashSet<ItemId, ItemHasher>,
    excluded: DashSet<ItemId, ItemHasher>,
}

impl RuleBasedItemExcluder {
    pub fn new(rules: Vec<ItemExclusionRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(BasketError::invalid_argument(
                "rules",
                "collection of item exclusion rules cannot be empty",
            ));
        }
        Ok(Self {
            rules,
            allowed: DashSet::default(),
            excluded: DashSet::default(),
        })
    }
    pub fn rules(&self) -> &[ItemExclusionRule] {
        &self.rules
    }
}

impl ItemExcluder for RuleBasedItemExcluder {
    fn should_exclude(&self, item: &Item) -> bool {
        if self.allowed.contains(&item.id()) {
            return false;
        }
        if self.excluded.contains(&item.id()) {
            return true;
        }
        let exclude = self.rules.iter().any(|rule| rule.should_exclude(item));
        if exclude {
            self.excluded.insert(item.id());
        } else {
            self.allowed.insert(item.id());
        }
        exclude
    }
}
