use std::collections::HashSet;

use crate::item::{ItemHasher, ItemId};
use crate::rule::AssociationRule;

/// Set algebra over two collections of association rules.
///
/// Rules are compared by their item pair only. With `ignore_link_direction`
/// a rule `A -> B` also matches `B -> A`. Results keep the rules of `first`,
/// each at most once, so the statistics reported are those of the first
/// collection.
pub struct SetOperationsPerformer;

impl SetOperationsPerformer {
    pub fn intersect(
        first: &[AssociationRule],
        second: &[AssociationRule],
        ignore_link_direction: bool,
    ) -> Vec<AssociationRule> {
        Self::select(first, second, ignore_link_direction, true)
    }

    pub fn except(
        first: &[AssociationRule],
        second: &[AssociationRule],
        ignore_link_direction: bool,
    ) -> Vec<AssociationRule> {
        Self::select(first, second, ignore_link_direction, false)
    }

    fn select(
        first: &[AssociationRule],
        second: &[AssociationRule],
        ignore_link_direction: bool,
        keep_shared: bool,
    ) -> Vec<AssociationRule> {
        let key = |rule: &AssociationRule| link_key(rule, ignore_link_direction);
        let others: HashSet<(ItemId, ItemId), ItemHasher> = second.iter().map(key).collect();
        let mut seen: HashSet<(ItemId, ItemId), ItemHasher> = HashSet::default();
        first
            .iter()
            .filter(|rule| {
                let k = key(rule);
                others.contains(&k) == keep_shared && seen.insert(k)
            })
            .cloned()
            .collect()
    }
}

fn link_key(rule: &AssociationRule, ignore_link_direction: bool) -> (ItemId, ItemId) {
    let (lhs, rhs) = rule.key();
    if ignore_link_direction {
        (lhs.min(rhs), lhs.max(rhs))
    } else {
        (lhs, rhs)
    }
}
