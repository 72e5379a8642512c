use std::collections::{BTreeSet, HashSet};

use basket_analysis::cancel::CancelToken;
use basket_analysis::clique::{MaximalCliqueFinder, MaximalCliqueFindingParameters};
use basket_analysis::item::Item;
use basket_analysis::mining::{Miner, MiningParameters};
use basket_analysis::rule::AssociationRule;
use basket_analysis::tomita::{Adjacency, MaximalCliqueAlgorithm, TomitaAlgorithm};
use proptest::prelude::*;

fn item(id: u32) -> Item {
    Item::new(id, format!("item {id}"), false)
}

fn rule_counts() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (1usize..500)
        .prop_flat_map(|n| (Just(n), 1..=n, 1..=n))
        .prop_flat_map(|(n, lhs, rhs)| {
            // at most n transactions can hold either item
            let least = (lhs + rhs).saturating_sub(n).max(1);
            (Just(n), Just(lhs), Just(rhs), least..=lhs.min(rhs))
        })
}

fn transactions() -> impl Strategy<Value = Vec<Vec<u32>>> {
    prop::collection::vec(prop::collection::vec(0u32..8, 0..6), 0..40)
}

fn mined(transactions: &[Vec<u32>], support: f64, confidence: f64, degree: usize) -> Vec<(u32, u32, usize, usize, usize)> {
    let transactions: Vec<Vec<Item>> = transactions
        .iter()
        .map(|transaction| transaction.iter().map(|&id| item(id)).collect())
        .collect();
    let parameters = MiningParameters::builder(support, confidence)
        .degree_of_parallelism(degree)
        .build()
        .expect("valid parameters");
    let rules = Miner::new()
        .mine(&transactions, &parameters, &CancelToken::new())
        .expect("mining should succeed");
    let mut counts: Vec<_> = rules
        .iter()
        .map(|rule| {
            (
                rule.left_hand_side().id(),
                rule.right_hand_side().id(),
                rule.left_hand_side().count(),
                rule.right_hand_side().count(),
                rule.pair_count(),
            )
        })
        .collect();
    counts.sort();
    counts
}

fn links() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::btree_set((0u32..7, 0u32..7), 0..30).prop_map(|pairs| {
        pairs.into_iter().filter(|(a, b)| a != b).collect::<Vec<_>>()
    })
}

fn cliques_of(links: &[(u32, u32)], ignore_one_way_links: bool) -> BTreeSet<Vec<(u32, u32)>> {
    let rules: Vec<AssociationRule> = links
        .iter()
        .map(|&(a, b)| AssociationRule::new(item(a), item(b), 3, 3, 2, 10).expect("valid rule"))
        .collect();
    let parameters = MaximalCliqueFindingParameters::new(2, 7, ignore_one_way_links).expect("valid parameters");
    MaximalCliqueFinder::new()
        .find(&rules, &parameters, &CancelToken::new())
        .expect("search should succeed")
        .into_iter()
        .map(|subset| {
            let mut keys: Vec<(u32, u32)> = subset.iter().map(AssociationRule::key).collect();
            keys.sort();
            keys
        })
        .collect()
}

fn graph() -> impl Strategy<Value = (usize, Vec<(u8, u8)>)> {
    (1usize..8).prop_flat_map(|n| {
        let vertex = 0..n as u8;
        (Just(n), prop::collection::vec((vertex.clone(), vertex), 0..20))
    })
}

fn brute_force(n: usize, adjacency: &Adjacency<u8>, min: usize, max: usize) -> BTreeSet<Vec<u8>> {
    let adjacent = |a: u8, b: u8| adjacency.get(&a).is_some_and(|neighbors| neighbors.contains(&b));
    let is_clique = |members: &[u8]| {
        members
            .iter()
            .enumerate()
            .all(|(i, &a)| members[i + 1..].iter().all(|&b| adjacent(a, b)))
    };
    let mut found = BTreeSet::new();
    for mask in 1u32..(1 << n) {
        let members: Vec<u8> = (0..n as u8).filter(|v| mask & (1 << v) != 0).collect();
        if members.len() < min || members.len() > max || !is_clique(&members) {
            continue;
        }
        let extensible = (0..n as u8)
            .filter(|v| !members.contains(v))
            .any(|v| members.iter().all(|&m| adjacent(m, v)));
        if !extensible {
            found.insert(members);
        }
    }
    found
}

proptest! {
    #[test]
    fn rule_statistics_follow_from_counts((n, lhs, rhs, pair) in rule_counts()) {
        let rule = AssociationRule::new(item(1), item(2), lhs, rhs, pair, n).expect("valid counts");
        let support = pair as f64 / n as f64;
        prop_assert_eq!(rule.support(), support);
        prop_assert_eq!(rule.confidence(), support / (lhs as f64 / n as f64));
        let table = rule.contingency_table();
        prop_assert_eq!(table.a + table.b + table.c + table.d, n as f64);
        prop_assert!(rule.yule_q().is_nan() || (-1.0..=1.0).contains(&rule.yule_q()));
        prop_assert!(rule.chi_squared().is_nan() || rule.chi_squared() >= 0.0);

        let reverse = AssociationRule::new(item(2), item(1), rhs, lhs, pair, n).expect("valid counts");
        prop_assert_ne!(&rule, &reverse);
        let recounted = AssociationRule::new(item(1), item(2), n, n, n, n).expect("valid counts");
        prop_assert_eq!(&rule, &recounted);
    }

    #[test]
    fn mining_is_idempotent_and_parallelism_independent(
        transactions in transactions(),
        support in 0.0f64..=1.0,
        confidence in 0.0f64..=1.0,
    ) {
        let first = mined(&transactions, support, confidence, 1);
        prop_assert_eq!(&first, &mined(&transactions, support, confidence, 1));
        prop_assert_eq!(&first, &mined(&transactions, support, confidence, 4));
        for &(_, _, lhs, rhs, pair) in &first {
            prop_assert!(pair <= lhs.min(rhs));
        }
    }

    #[test]
    fn clique_search_ignores_rule_order(
        (links, shuffled) in links().prop_flat_map(|links| (Just(links.clone()), Just(links).prop_shuffle())),
        ignore_one_way_links in any::<bool>(),
    ) {
        prop_assert_eq!(cliques_of(&links, ignore_one_way_links), cliques_of(&shuffled, ignore_one_way_links));
    }

    #[test]
    fn tomita_matches_brute_force((n, edges) in graph(), min in 1usize..4, extra in 0usize..4) {
        let max = min + extra;
        let mut adjacency: Adjacency<u8> = Adjacency::default();
        for v in 0..n as u8 {
            adjacency.entry(v).or_default();
        }
        for (a, b) in edges.into_iter().filter(|(a, b)| a != b) {
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
        let token = CancelToken::new();
        let found: Vec<Vec<u8>> = TomitaAlgorithm
            .find(&adjacency, min, max, &token)
            .expect("valid bounds")
            .map(|clique| clique.expect("not cancelled").vertices().to_vec())
            .collect();
        let unique: HashSet<&Vec<u8>> = found.iter().collect();
        prop_assert_eq!(unique.len(), found.len(), "a clique was reported twice");
        let found: BTreeSet<Vec<u8>> = found.into_iter().collect();
        prop_assert_eq!(found, brute_force(n, &adjacency, min, max));
    }
}
