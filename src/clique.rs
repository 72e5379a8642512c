//! Maximal cliques of association rules.
//!
//! The finder turns a rule set into an undirected graph over its items, asks a
//! [`MaximalCliqueAlgorithm`] for the maximal cliques of that graph and maps
//! each clique back to the rules linking its members.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use bimap::BiMap;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::error::{BasketError, Result};
use crate::item::{Item, ItemHasher, ItemId};
use crate::rule::AssociationRule;
use crate::tomita::{Adjacency, MaximalCliqueAlgorithm, TomitaAlgorithm, Vertex};

pub type AssociationRuleFilter = Arc<dyn Fn(&AssociationRule) -> bool + Send + Sync>;

// ------------- MaximalCliqueFindingParameters -------------
#[derive(Clone)]
pub struct MaximalCliqueFindingParameters {
    min_clique_size: usize,
    max_clique_size: usize,
    ignore_one_way_links: bool,
    association_rule_filter: Option<AssociationRuleFilter>,
}

impl MaximalCliqueFindingParameters {
    pub fn new(min_clique_size: usize, max_clique_size: usize, ignore_one_way_links: bool) -> Result<Self> {
        if min_clique_size < 2 {
            return Err(BasketError::invalid_argument(
                "min_clique_size",
                format!("minimum clique size {min_clique_size} must be at least 2"),
            ));
        }
        if max_clique_size < min_clique_size {
            return Err(BasketError::invalid_argument(
                "max_clique_size",
                format!("maximum clique size {max_clique_size} is less than the minimum {min_clique_size}"),
            ));
        }
        Ok(Self {
            min_clique_size,
            max_clique_size,
            ignore_one_way_links,
            association_rule_filter: None,
        })
    }
    /// Only rules accepted by `filter` take part in the graph.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&AssociationRule) -> bool + Send + Sync + 'static,
    {
        self.association_rule_filter = Some(Arc::new(filter));
        self
    }
    pub fn min_clique_size(&self) -> usize {
        self.min_clique_size
    }
    pub fn max_clique_size(&self) -> usize {
        self.max_clique_size
    }
    pub fn ignore_one_way_links(&self) -> bool {
        self.ignore_one_way_links
    }
    pub fn association_rule_filter(&self) -> Option<&AssociationRuleFilter> {
        self.association_rule_filter.as_ref()
    }
    fn accepts(&self, rule: &AssociationRule) -> bool {
        self.association_rule_filter.as_ref().is_none_or(|filter| filter(rule))
    }
}

impl fmt::Debug for MaximalCliqueFindingParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MaximalCliqueFindingParameters")
            .field("min_clique_size", &self.min_clique_size)
            .field("max_clique_size", &self.max_clique_size)
            .field("ignore_one_way_links", &self.ignore_one_way_links)
            .field("association_rule_filter", &self.association_rule_filter.is_some())
            .finish()
    }
}

// ------------- MaximalCliqueFinder -------------
#[derive(Debug, Default, Clone)]
pub struct MaximalCliqueFinder<A: MaximalCliqueAlgorithm = TomitaAlgorithm> {
    algorithm: A,
}

impl MaximalCliqueFinder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: MaximalCliqueAlgorithm> MaximalCliqueFinder<A> {
    pub fn with_algorithm(algorithm: A) -> Self {
        Self { algorithm }
    }

    /// Finds the rule subsets forming maximal cliques.
    ///
    /// Each returned subset holds every input rule whose two items both belong
    /// to the clique, in either direction, so a clique of `n` items yields at
    /// most `n × (n − 1)` rules. Cancellation discards everything found so far.
    pub fn find(
        &self,
        association_rules: &[AssociationRule],
        parameters: &MaximalCliqueFindingParameters,
        token: &CancelToken,
    ) -> Result<Vec<Vec<AssociationRule>>> {
        token.check()?;
        let mut links: HashSet<(ItemId, ItemId), ItemHasher> =
            HashSet::with_capacity_and_hasher(association_rules.len(), ItemHasher::default());
        for rule in association_rules {
            if !links.insert(rule.key()) {
                return Err(BasketError::invalid_argument(
                    "association_rules",
                    format!("rule {rule} appears more than once"),
                ));
            }
        }

        let rules: Vec<&AssociationRule> = association_rules.iter().filter(|rule| parameters.accepts(rule)).collect();
        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let mut items: Vec<Item> = Vec::new();
        let mut known: HashSet<ItemId, ItemHasher> = HashSet::default();
        for rule in &rules {
            for item in [rule.left_hand_side().item(), rule.right_hand_side().item()] {
                if known.insert(item.id()) {
                    items.push(item.clone());
                }
            }
        }

        let item_count = items.len();
        if item_count <= u8::CAPACITY {
            self.search::<u8>(&rules, items, parameters, token)
        } else if item_count <= u16::CAPACITY {
            self.search::<u16>(&rules, items, parameters, token)
        } else if item_count <= u32::CAPACITY {
            self.search::<u32>(&rules, items, parameters, token)
        } else {
            Err(BasketError::invalid_argument(
                "association_rules",
                format!("{item_count} distinct items exceed the supported vertex count"),
            ))
        }
    }

    fn search<V: Vertex>(
        &self,
        rules: &[&AssociationRule],
        items: Vec<Item>,
        parameters: &MaximalCliqueFindingParameters,
        token: &CancelToken,
    ) -> Result<Vec<Vec<AssociationRule>>> {
        let mut vertices: BiMap<Item, V> = BiMap::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let vertex = V::from_index(index).ok_or_else(|| {
                BasketError::InvalidOperation(format!("vertex index {index} does not fit in {} bits", V::BITS))
            })?;
            vertices.insert(item, vertex);
        }
        let vertex_of = |item: &Item| {
            vertices
                .get_by_left(item)
                .copied()
                .ok_or_else(|| BasketError::InvalidOperation(format!("item {} has no vertex", item.id())))
        };

        let mut by_link: HashMap<(ItemId, ItemId), &AssociationRule, ItemHasher> =
            HashMap::with_capacity_and_hasher(rules.len(), ItemHasher::default());
        let mut adjacency: Adjacency<V> = Adjacency::default();
        for &rule in rules {
            token.check()?;
            let (lhs, rhs) = rule.key();
            by_link.insert((lhs, rhs), rule);
            // a one-way link only becomes an edge once its reverse shows up
            if parameters.ignore_one_way_links && !by_link.contains_key(&(rhs, lhs)) {
                continue;
            }
            let a = vertex_of(rule.left_hand_side().item())?;
            let b = vertex_of(rule.right_hand_side().item())?;
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
        debug!(
            vertices = vertices.len(),
            connected = adjacency.len(),
            vertex_bits = V::BITS,
            "built rule graph"
        );

        let cliques = self
            .algorithm
            .find(&adjacency, parameters.min_clique_size, parameters.max_clique_size, token)?
            .collect::<Result<Vec<_>>>()?;
        token.check()?;

        let mut subsets = Vec::with_capacity(cliques.len());
        for clique in &cliques {
            let members = clique
                .vertices()
                .iter()
                .map(|vertex| {
                    vertices
                        .get_by_right(vertex)
                        .map(Item::id)
                        .ok_or_else(|| BasketError::InvalidOperation(format!("vertex {vertex:?} has no item")))
                })
                .collect::<Result<Vec<ItemId>>>()?;
            let mut subset = Vec::new();
            for &lhs in &members {
                for &rhs in &members {
                    if let Some(&rule) = by_link.get(&(lhs, rhs)) {
                        subset.push(rule.clone());
                    }
                }
            }
            subsets.push(subset);
        }
        info!(rules = rules.len(), cliques = subsets.len(), "maximal clique search complete");
        Ok(subsets)
    }
}
