use basket_analysis::item::Item;
use basket_analysis::rule::AssociationRule;
use basket_analysis::setops::SetOperationsPerformer;

fn rule(lhs: u32, rhs: u32) -> AssociationRule {
    AssociationRule::new(
        Item::new(lhs, format!("item {lhs}"), false),
        Item::new(rhs, format!("item {rhs}"), false),
        4,
        4,
        2,
        10,
    )
    .expect("valid rule")
}

fn links(rules: &[AssociationRule]) -> Vec<(u32, u32)> {
    let mut links: Vec<(u32, u32)> = rules.iter().map(AssociationRule::key).collect();
    links.sort();
    links
}

#[test]
fn directed_intersection_and_difference() {
    let first = vec![rule(1, 2), rule(2, 3), rule(3, 4)];
    let second = vec![rule(2, 1), rule(2, 3)];
    assert_eq!(links(&SetOperationsPerformer::intersect(&first, &second, false)), vec![(2, 3)]);
    assert_eq!(
        links(&SetOperationsPerformer::except(&first, &second, false)),
        vec![(1, 2), (3, 4)]
    );
}

#[test]
fn undirected_mode_matches_reversed_links() {
    let first = vec![rule(1, 2), rule(2, 3), rule(3, 4)];
    let second = vec![rule(2, 1), rule(4, 3)];
    assert_eq!(
        links(&SetOperationsPerformer::intersect(&first, &second, true)),
        vec![(1, 2), (3, 4)]
    );
    assert_eq!(links(&SetOperationsPerformer::except(&first, &second, true)), vec![(2, 3)]);
}

#[test]
fn statistics_do_not_take_part_in_comparison() {
    let first = vec![rule(1, 2)];
    let stronger = AssociationRule::new(Item::new(1, "a", false), Item::new(2, "b", false), 9, 9, 9, 10)
        .expect("valid rule");
    let common = SetOperationsPerformer::intersect(&first, &[stronger], false);
    assert_eq!(common.len(), 1);
    // the first collection's counts are kept
    assert_eq!(common[0].pair_count(), 2);
}

#[test]
fn undirected_results_hold_each_link_once() {
    let first = vec![rule(1, 2), rule(2, 1)];
    let second = vec![rule(1, 2)];
    assert_eq!(SetOperationsPerformer::intersect(&first, &second, true).len(), 1);
    assert_eq!(SetOperationsPerformer::intersect(&first, &second, false).len(), 1);
    assert_eq!(SetOperationsPerformer::except(&first, &[], false).len(), 2);
}

#[test]
fn empty_inputs() {
    let rules = vec![rule(1, 2)];
    assert!(SetOperationsPerformer::intersect(&[], &rules, false).is_empty());
    assert!(SetOperationsPerformer::intersect(&rules, &[], true).is_empty());
    assert_eq!(SetOperationsPerformer::except(&rules, &[], true).len(), 1);
}
