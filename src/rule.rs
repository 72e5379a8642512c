use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{BasketError, Result};
use crate::item::{Item, ItemId};
use crate::metrics::{self, ContingencyTable};

// ------------- AssociationRulePart -------------
/// One side of an association rule: an item together with the number of
/// transactions that contain it.
#[derive(Clone, Debug)]
pub struct AssociationRulePart {
    item: Item,
    count: usize,
    support: f64,
}

impl AssociationRulePart {
    pub fn new(item: Item, count: usize, transaction_count: usize) -> Result<Self> {
        if count < 1 {
            return Err(BasketError::invalid_argument("count", "item count must be positive"));
        }
        if count > transaction_count {
            return Err(BasketError::invalid_argument(
                "transaction_count",
                format!("item count {count} exceeds transaction count {transaction_count}"),
            ));
        }
        Ok(Self {
            item,
            count,
            support: metrics::support(count, transaction_count),
        })
    }
    pub fn item(&self) -> &Item {
        &self.item
    }
    pub fn id(&self) -> ItemId {
        self.item.id()
    }
    pub fn count(&self) -> usize {
        self.count
    }
    pub fn support(&self) -> f64 {
        self.support
    }
}
impl PartialEq for AssociationRulePart {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item
    }
}
impl Eq for AssociationRulePart {}
impl Hash for AssociationRulePart {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item.hash(state);
    }
}
impl fmt::Display for AssociationRulePart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.item)
    }
}

// ------------- AssociationRule -------------
/// A directed rule "transactions containing the left hand side tend to contain
/// the right hand side".
///
/// Only the counts are stored; every statistic is derived on demand.
///
/// Equality and hashing look at the directed item pair only. Two rules over
/// the same `(lhs, rhs)` pair compare equal even when their counts differ, so
/// rule collections mined from different data can be compared by shape. A
/// rule and its reverse are different rules.
#[derive(Clone, Debug)]
pub struct AssociationRule {
    lhs: AssociationRulePart,
    rhs: AssociationRulePart,
    pair_count: usize,
    transaction_count: usize,
}

impl AssociationRule {
    pub fn new(
        lhs_item: Item,
        rhs_item: Item,
        lhs_count: usize,
        rhs_count: usize,
        pair_count: usize,
        transaction_count: usize,
    ) -> Result<Self> {
        if lhs_item == rhs_item {
            return Err(BasketError::invalid_argument(
                "rhs_item",
                format!("left and right hand sides refer to the same item {}", lhs_item.id()),
            ));
        }
        if transaction_count == 0 {
            return Err(BasketError::invalid_argument(
                "transaction_count",
                "transaction count must be greater than zero",
            ));
        }
        if pair_count == 0 {
            return Err(BasketError::invalid_argument("pair_count", "pair count must be greater than zero"));
        }
        if lhs_count > transaction_count {
            return Err(BasketError::invalid_argument(
                "lhs_count",
                format!("lhs count {lhs_count} exceeds transaction count {transaction_count}"),
            ));
        }
        if rhs_count > transaction_count {
            return Err(BasketError::invalid_argument(
                "rhs_count",
                format!("rhs count {rhs_count} exceeds transaction count {transaction_count}"),
            ));
        }
        if pair_count > lhs_count.min(rhs_count) {
            return Err(BasketError::invalid_argument(
                "pair_count",
                format!("pair count {pair_count} exceeds the smaller of lhs count {lhs_count} and rhs count {rhs_count}"),
            ));
        }
        if lhs_count + rhs_count - pair_count > transaction_count {
            return Err(BasketError::invalid_argument(
                "pair_count",
                format!(
                    "{lhs_count} + {rhs_count} - {pair_count} transactions hold either item, more than {transaction_count}"
                ),
            ));
        }
        Ok(Self {
            lhs: AssociationRulePart::new(lhs_item, lhs_count, transaction_count)?,
            rhs: AssociationRulePart::new(rhs_item, rhs_count, transaction_count)?,
            pair_count,
            transaction_count,
        })
    }
    pub fn left_hand_side(&self) -> &AssociationRulePart {
        &self.lhs
    }
    pub fn right_hand_side(&self) -> &AssociationRulePart {
        &self.rhs
    }
    pub fn pair_count(&self) -> usize {
        self.pair_count
    }
    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }
    pub fn support(&self) -> f64 {
        metrics::support(self.pair_count, self.transaction_count)
    }
    pub fn confidence(&self) -> f64 {
        metrics::confidence(self.support(), self.lhs.support())
    }
    pub fn lift(&self) -> f64 {
        metrics::lift(self.confidence(), self.rhs.support())
    }
    pub fn conviction(&self) -> f64 {
        metrics::conviction(self.rhs.support(), self.confidence())
    }
    pub fn contingency_table(&self) -> ContingencyTable {
        ContingencyTable::new(self.lhs.count(), self.rhs.count(), self.pair_count, self.transaction_count)
    }
    pub fn yule_q(&self) -> f64 {
        self.contingency_table().yule_q()
    }
    pub fn phi(&self) -> f64 {
        self.contingency_table().phi()
    }
    pub fn chi_squared(&self) -> f64 {
        self.contingency_table().chi_squared()
    }
    /// The directed `(lhs id, rhs id)` key this rule is identified by.
    pub fn key(&self) -> (ItemId, ItemId) {
        (self.lhs.id(), self.rhs.id())
    }
}
impl PartialEq for AssociationRule {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}
impl Eq for AssociationRule {}
impl Hash for AssociationRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lhs.hash(state);
        self.rhs.hash(state);
    }
}
impl fmt::Display for AssociationRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs)
    }
}
