use std::hint::black_box;

use basket_analysis::cancel::CancelToken;
use basket_analysis::clique::{MaximalCliqueFinder, MaximalCliqueFindingParameters};
use basket_analysis::item::Item;
use basket_analysis::mining::{Miner, MiningParameters};
use basket_analysis::rule::AssociationRule;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

// xorshift baskets, identical on every run
fn baskets(count: usize, catalog: u32, basket_size: usize) -> Vec<Vec<Item>> {
    let items: Vec<Item> = (0..catalog).map(|id| Item::new(id, format!("item {id}"), false)).collect();
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..count)
        .map(|_| {
            (0..basket_size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    // skew towards low ids so that some items are frequent
                    let pick = (state % catalog as u64) * (state % 3 + 1) / 3;
                    items[pick as usize].clone()
                })
                .collect()
        })
        .collect()
}

fn mining(c: &mut Criterion) {
    let transactions = baskets(20_000, 500, 8);
    let token = CancelToken::new();
    let miner = Miner::new();
    let mut group = c.benchmark_group("mining");
    group.sample_size(10);
    for degree in [1usize, 4] {
        let parameters = MiningParameters::builder(0.002, 0.1)
            .degree_of_parallelism(degree)
            .build()
            .expect("valid parameters");
        group.bench_with_input(BenchmarkId::from_parameter(degree), &parameters, |b, parameters| {
            b.iter(|| {
                miner
                    .mine(black_box(&transactions), parameters, &token)
                    .expect("mining succeeds")
            })
        });
    }
    group.finish();
}

fn cliques(c: &mut Criterion) {
    let transactions = baskets(5_000, 60, 10);
    let token = CancelToken::new();
    let parameters = MiningParameters::new(0.01, 0.05).expect("valid parameters");
    let rules: Vec<AssociationRule> = Miner::new()
        .mine(&transactions, &parameters, &token)
        .expect("mining succeeds")
        .into_iter()
        .collect();
    let finder = MaximalCliqueFinder::new();
    let mut group = c.benchmark_group("cliques");
    for ignore_one_way_links in [false, true] {
        let parameters =
            MaximalCliqueFindingParameters::new(2, 6, ignore_one_way_links).expect("valid parameters");
        group.bench_with_input(
            BenchmarkId::new("ignore_one_way_links", ignore_one_way_links),
            &parameters,
            |b, parameters| b.iter(|| finder.find(black_box(&rules), parameters, &token).expect("search succeeds")),
        );
    }
    group.finish();
}

criterion_group!(benches, mining, cliques);
criterion_main!(benches);
