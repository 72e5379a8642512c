//! Named rule sets and their part-wise serialization.
//!
//! A stored rule set travels as a sequence of parts: one [`RuleSetPart::Header`],
//! then the items in [`RuleSetPart::Items`] chunks, then the rules in
//! [`RuleSetPart::Rules`] chunks. Rules refer to items by id, so every item a
//! rule mentions must have arrived in an earlier chunk. [`RuleSetAssembler`]
//! checks each part as it arrives and rebuilds the in-memory entities.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BasketError, Result};
use crate::item::{Item, ItemHasher, ItemId};
use crate::rule::AssociationRule;

// ------------- RuleSetHeader -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetHeader {
    pub name: String,
    pub description: String,
    pub transaction_count: usize,
}

impl RuleSetHeader {
    pub fn new(name: impl Into<String>, description: impl Into<String>, transaction_count: usize) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BasketError::invalid_argument("name", "rule set name cannot be empty"));
        }
        Ok(Self {
            name,
            description: description.into(),
            transaction_count,
        })
    }
}

/// A rule flattened to ids and counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub lhs_item_id: ItemId,
    pub rhs_item_id: ItemId,
    pub lhs_count: usize,
    pub rhs_count: usize,
    pub pair_count: usize,
    pub transaction_count: usize,
}

impl From<&AssociationRule> for RuleRecord {
    fn from(rule: &AssociationRule) -> Self {
        Self {
            lhs_item_id: rule.left_hand_side().id(),
            rhs_item_id: rule.right_hand_side().id(),
            lhs_count: rule.left_hand_side().count(),
            rhs_count: rule.right_hand_side().count(),
            pair_count: rule.pair_count(),
            transaction_count: rule.transaction_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RuleSetPart {
    Header(RuleSetHeader),
    Items(Vec<Item>),
    Rules(Vec<RuleRecord>),
}

impl RuleSetPart {
    pub fn stage(&self) -> &'static str {
        match self {
            RuleSetPart::Header(_) => "header",
            RuleSetPart::Items(_) => "items",
            RuleSetPart::Rules(_) => "rules",
        }
    }
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| BasketError::InvalidOperation(format!("cannot encode part: {e}")))
    }
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BasketError::invalid_argument("json", e.to_string()))
    }
}

// ------------- AssociationRuleSet -------------
#[derive(Debug, Clone)]
pub struct AssociationRuleSet {
    header: RuleSetHeader,
    items: Vec<Item>,
    rules: Vec<AssociationRule>,
}

impl AssociationRuleSet {
    /// Collects the items of `rules`, which must all stem from
    /// `header.transaction_count` transactions and be pairwise distinct.
    pub fn new(header: RuleSetHeader, rules: Vec<AssociationRule>) -> Result<Self> {
        let mut items: HashMap<ItemId, Item, ItemHasher> = HashMap::default();
        let mut links: HashSet<(ItemId, ItemId), ItemHasher> = HashSet::default();
        for rule in &rules {
            check_transaction_count(&header, rule.transaction_count())?;
            if !links.insert(rule.key()) {
                return Err(BasketError::invalid_argument(
                    "rules",
                    format!("rule {rule} appears more than once"),
                ));
            }
            for part in [rule.left_hand_side(), rule.right_hand_side()] {
                items.entry(part.id()).or_insert_with(|| part.item().clone());
            }
        }
        let mut items: Vec<Item> = items.into_values().collect();
        items.sort();
        Ok(Self { header, items, rules })
    }
    pub fn header(&self) -> &RuleSetHeader {
        &self.header
    }
    pub fn name(&self) -> &str {
        &self.header.name
    }
    pub fn items(&self) -> &[Item] {
        &self.items
    }
    pub fn rules(&self) -> &[AssociationRule] {
        &self.rules
    }

    pub fn to_parts(&self, chunk_size: usize) -> Result<Vec<RuleSetPart>> {
        if chunk_size == 0 {
            return Err(BasketError::invalid_argument("chunk_size", "chunk size must be positive"));
        }
        let mut parts = Vec::with_capacity(1 + self.items.len().div_ceil(chunk_size) + self.rules.len().div_ceil(chunk_size));
        parts.push(RuleSetPart::Header(self.header.clone()));
        parts.extend(self.items.chunks(chunk_size).map(|chunk| RuleSetPart::Items(chunk.to_vec())));
        parts.extend(
            self.rules
                .chunks(chunk_size)
                .map(|chunk| RuleSetPart::Rules(chunk.iter().map(RuleRecord::from).collect())),
        );
        Ok(parts)
    }

    pub fn from_parts(parts: impl IntoIterator<Item = RuleSetPart>) -> Result<Self> {
        let mut assembler = RuleSetAssembler::default();
        for part in parts {
            assembler.push(part)?;
        }
        assembler.finish()
    }
}

impl fmt::Display for AssociationRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({} items, {} rules over {} transactions)",
            self.header.name,
            self.items.len(),
            self.rules.len(),
            self.header.transaction_count
        )
    }
}

fn check_transaction_count(header: &RuleSetHeader, transaction_count: usize) -> Result<()> {
    if transaction_count != header.transaction_count {
        return Err(BasketError::invalid_argument(
            "rules",
            format!(
                "rule mined from {transaction_count} transactions does not belong to a set of {}",
                header.transaction_count
            ),
        ));
    }
    Ok(())
}

// ------------- RuleSetAssembler -------------
/// Rebuilds a rule set from parts arriving one at a time.
#[derive(Debug, Default)]
pub struct RuleSetAssembler {
    header: Option<RuleSetHeader>,
    items: HashMap<ItemId, Item, ItemHasher>,
    rules: Vec<AssociationRule>,
    links: HashSet<(ItemId, ItemId), ItemHasher>,
}

impl RuleSetAssembler {
    pub fn header(&self) -> Option<&RuleSetHeader> {
        self.header.as_ref()
    }

    pub fn push(&mut self, part: RuleSetPart) -> Result<()> {
        match part {
            RuleSetPart::Header(header) => {
                if self.header.is_some() {
                    return Err(BasketError::invalid_argument("part", "header sent twice"));
                }
                self.header = Some(header);
            }
            RuleSetPart::Items(items) => {
                self.expect_header()?;
                if !self.rules.is_empty() {
                    return Err(BasketError::invalid_argument("part", "items must precede rules"));
                }
                for item in items {
                    if self.items.insert(item.id(), item).is_some() {
                        return Err(BasketError::invalid_argument("part", "item sent twice"));
                    }
                }
            }
            RuleSetPart::Rules(records) => {
                let header = self.expect_header()?.clone();
                for record in records {
                    check_transaction_count(&header, record.transaction_count)?;
                    let rule = AssociationRule::new(
                        self.item(record.lhs_item_id)?,
                        self.item(record.rhs_item_id)?,
                        record.lhs_count,
                        record.rhs_count,
                        record.pair_count,
                        record.transaction_count,
                    )?;
                    if !self.links.insert(rule.key()) {
                        return Err(BasketError::invalid_argument(
                            "part",
                            format!("rule {rule} sent twice"),
                        ));
                    }
                    self.rules.push(rule);
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<AssociationRuleSet> {
        let header = self
            .header
            .ok_or_else(|| BasketError::invalid_argument("part", "rule set has no header"))?;
        let mut items: Vec<Item> = self.items.into_values().collect();
        items.sort();
        Ok(AssociationRuleSet {
            header,
            items,
            rules: self.rules,
        })
    }

    fn expect_header(&self) -> Result<&RuleSetHeader> {
        self.header
            .as_ref()
            .ok_or_else(|| BasketError::invalid_argument("part", "header must come first"))
    }

    fn item(&self, id: ItemId) -> Result<Item> {
        self.items
            .get(&id)
            .cloned()
            .ok_or_else(|| BasketError::invalid_argument("part", format!("rule refers to unknown item {id}")))
    }
}
