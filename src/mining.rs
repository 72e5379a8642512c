//! The association rule miner.
//!
//! Mining runs in three stages, each of which is a data-parallel pass:
//!
//! 1. *Frequent item search* counts, for every item, the number of
//!    transactions it occurs in, after exclusion and conversion to groups.
//!    Items reaching `ceil(transactions × min_support)` are frequent.
//! 2. *Itemset search* counts, for every unordered pair of frequent items, the
//!    number of transactions containing both.
//! 3. *Association rule generation* turns every frequent pair into up to two
//!    directed rules, one per direction meeting `min_confidence`.
//!
//! Counters are shared by all workers and updated per key, never under a
//! global lock. Per-transaction scratch collections come from pools sized to
//! the degree of parallelism. Observers are told about stage changes and,
//! during the itemset search, about progress sampled every 100ms.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use dashmap::DashMap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::conversion::{ItemConversionRule, ItemConverter, RuleBasedItemConverter};
use crate::error::{BasketError, Result};
use crate::exclusion::{ItemExcluder, ItemExclusionRule, RuleBasedItemExcluder};
use crate::item::{Item, ItemHasher, ItemId, ordered_pair};
use crate::pool::ObjectPool;
use crate::rule::AssociationRule;

pub const MAX_DEGREE_OF_PARALLELISM: usize = 512;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

// ------------- MiningParameters -------------
#[derive(Clone)]
pub struct MiningParameters {
    min_support: f64,
    min_confidence: f64,
    converter: Option<Arc<dyn ItemConverter>>,
    excluder: Option<Arc<dyn ItemExcluder>>,
    degree_of_parallelism: usize,
}

impl MiningParameters {
    /// Parameters without conversion or exclusion, mining on a single worker.
    pub fn new(min_support: f64, min_confidence: f64) -> Result<Self> {
        Self::builder(min_support, min_confidence).build()
    }
    pub fn builder(min_support: f64, min_confidence: f64) -> MiningParametersBuilder {
        MiningParametersBuilder {
            min_support,
            min_confidence,
            converter: None,
            excluder: None,
            conversion_rules: None,
            exclusion_rules: None,
            degree_of_parallelism: 1,
        }
    }
    pub fn min_support(&self) -> f64 {
        self.min_support
    }
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }
    pub fn converter(&self) -> Option<&Arc<dyn ItemConverter>> {
        self.converter.as_ref()
    }
    pub fn excluder(&self) -> Option<&Arc<dyn ItemExcluder>> {
        self.excluder.as_ref()
    }
    pub fn degree_of_parallelism(&self) -> usize {
        self.degree_of_parallelism
    }

    fn is_excluded(&self, item: &Item) -> bool {
        self.excluder
            .as_ref()
            .is_some_and(|excluder| excluder.should_exclude(item))
    }

    /// The item a transaction element is counted as: `None` when it is
    /// excluded (or converts to an excluded group), its group when it has one,
    /// and the element itself otherwise.
    pub(crate) fn resolve(&self, item: &Item) -> Option<Item> {
        if self.is_excluded(item) {
            return None;
        }
        match self.converter.as_ref().and_then(|converter| converter.try_convert(item)) {
            Some(group) if self.is_excluded(&group) => None,
            Some(group) => Some(group),
            None => Some(item.clone()),
        }
    }
}

impl fmt::Debug for MiningParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MiningParameters")
            .field("min_support", &self.min_support)
            .field("min_confidence", &self.min_confidence)
            .field("converter", &self.converter.is_some())
            .field("excluder", &self.excluder.is_some())
            .field("degree_of_parallelism", &self.degree_of_parallelism)
            .finish()
    }
}

pub struct MiningParametersBuilder {
    min_support: f64,
    min_confidence: f64,
    converter: Option<Arc<dyn ItemConverter>>,
    excluder: Option<Arc<dyn ItemExcluder>>,
    conversion_rules: Option<Vec<ItemConversionRule>>,
    exclusion_rules: Option<Vec<ItemExclusionRule>>,
    degree_of_parallelism: usize,
}

impl MiningParametersBuilder {
    pub fn converter(mut self, converter: Arc<dyn ItemConverter>) -> Self {
        self.converter = Some(converter);
        self
    }
    pub fn excluder(mut self, excluder: Arc<dyn ItemExcluder>) -> Self {
        self.excluder = Some(excluder);
        self
    }
    /// Converts with a [`RuleBasedItemConverter`] built from these rules.
    pub fn conversion_rules(mut self, rules: Vec<ItemConversionRule>) -> Self {
        self.conversion_rules = Some(rules);
        self
    }
    /// Excludes with a [`RuleBasedItemExcluder`] built from these rules.
    pub fn exclusion_rules(mut self, rules: Vec<ItemExclusionRule>) -> Self {
        self.exclusion_rules = Some(rules);
        self
    }
    pub fn degree_of_parallelism(mut self, degree_of_parallelism: usize) -> Self {
        self.degree_of_parallelism = degree_of_parallelism;
        self
    }
    pub fn build(self) -> Result<MiningParameters> {
        if !(0.0..=1.0).contains(&self.min_support) {
            return Err(BasketError::invalid_argument(
                "min_support",
                format!("minimum support {} must be between 0 and 1", self.min_support),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(BasketError::invalid_argument(
                "min_confidence",
                format!("minimum confidence {} must be between 0 and 1", self.min_confidence),
            ));
        }
        if !(1..=MAX_DEGREE_OF_PARALLELISM).contains(&self.degree_of_parallelism) {
            return Err(BasketError::invalid_argument(
                "degree_of_parallelism",
                format!(
                    "degree of parallelism {} must be between 1 and {MAX_DEGREE_OF_PARALLELISM}",
                    self.degree_of_parallelism
                ),
            ));
        }
        let converter = match (self.converter, self.conversion_rules) {
            (Some(_), Some(_)) => {
                return Err(BasketError::invalid_argument(
                    "conversion_rules",
                    "give either a converter or conversion rules, not both",
                ));
            }
            (converter, None) => converter,
            (None, Some(rules)) => Some(Arc::new(RuleBasedItemConverter::new(rules)?) as Arc<dyn ItemConverter>),
        };
        let excluder = match (self.excluder, self.exclusion_rules) {
            (Some(_), Some(_)) => {
                return Err(BasketError::invalid_argument(
                    "exclusion_rules",
                    "give either an excluder or exclusion rules, not both",
                ));
            }
            (excluder, None) => excluder,
            (None, Some(rules)) => Some(Arc::new(RuleBasedItemExcluder::new(rules)?) as Arc<dyn ItemExcluder>),
        };
        Ok(MiningParameters {
            min_support: self.min_support,
            min_confidence: self.min_confidence,
            converter,
            excluder,
            degree_of_parallelism: self.degree_of_parallelism,
        })
    }
}

// ------------- Observation -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MiningStage {
    FrequentItemSearch,
    ItemsetSearch,
    AssociationRuleGeneration,
}

impl fmt::Display for MiningStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MiningStage::FrequentItemSearch => "frequent item search",
            MiningStage::ItemsetSearch => "itemset search",
            MiningStage::AssociationRuleGeneration => "association rule generation",
        };
        f.write_str(name)
    }
}

/// Receives notifications while mining runs. Purely observational: nothing
/// an observer does can influence the result.
pub trait MiningObserver: Send + Sync {
    fn stage_changed(&self, _stage: MiningStage) {}
    /// Percentage in `0.0..=100.0` of transactions processed by the itemset search.
    fn progress_changed(&self, _progress: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MiningEvent {
    Stage(MiningStage),
    Progress(f64),
}

/// Lets a caller consume notifications from a channel instead of a callback.
impl MiningObserver for mpsc::Sender<MiningEvent> {
    fn stage_changed(&self, stage: MiningStage) {
        // a hung up receiver just stops listening
        let _ = self.send(MiningEvent::Stage(stage));
    }
    fn progress_changed(&self, progress: f64) {
        let _ = self.send(MiningEvent::Progress(progress));
    }
}

// ------------- Miner -------------
type FrequentItems = HashMap<Item, usize, ItemHasher>;
type PairFrequencies = DashMap<(Item, Item), usize, ItemHasher>;

#[derive(Default, Clone)]
pub struct Miner {
    observers: Vec<Arc<dyn MiningObserver>>,
}

impl Miner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn MiningObserver>) {
        self.observers.push(observer);
    }

    /// Mines directed association rules between pairs of items.
    ///
    /// The transactions are scanned once per stage, so they must not change
    /// while mining runs. Returns [`BasketError::Cancelled`] as soon as the
    /// token is observed, discarding whatever the workers produced so far.
    pub fn mine<T>(
        &self,
        transactions: &[T],
        parameters: &MiningParameters,
        token: &CancelToken,
    ) -> Result<HashSet<AssociationRule>>
    where
        T: AsRef<[Item]> + Sync,
    {
        token.check()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(parameters.degree_of_parallelism)
            .thread_name(|index| format!("basket-miner-{index}"))
            .build()
            .map_err(|e| BasketError::InvalidOperation(format!("cannot start mining workers: {e}")))?;

        self.notify_stage(MiningStage::FrequentItemSearch);
        let transaction_count = transactions.len();
        let frequent_items = self.search_frequent_items(&pool, transactions, parameters, token)?;
        let threshold = frequency_threshold(transaction_count, parameters.min_support);
        info!(transaction_count, threshold, frequent_items = frequent_items.len(), "frequent item search complete");

        token.check()?;
        self.notify_stage(MiningStage::ItemsetSearch);
        let pair_frequencies = self.search_itemsets(&pool, transactions, parameters, &frequent_items, token)?;
        info!(pairs = pair_frequencies.len(), "itemset search complete");

        token.check()?;
        self.notify_stage(MiningStage::AssociationRuleGeneration);
        let rules = generate_rules(
            &pool,
            pair_frequencies,
            &frequent_items,
            transaction_count,
            threshold,
            parameters.min_confidence,
            token,
        )?;
        info!(rules = rules.len(), "association rule generation complete");
        Ok(rules)
    }

    fn search_frequent_items<T>(
        &self,
        pool: &ThreadPool,
        transactions: &[T],
        parameters: &MiningParameters,
        token: &CancelToken,
    ) -> Result<FrequentItems>
    where
        T: AsRef<[Item]> + Sync,
    {
        let frequencies: DashMap<Item, usize, ItemHasher> = DashMap::with_hasher(ItemHasher::default());
        let scratch: ObjectPool<HashSet<ItemId, ItemHasher>> = ObjectPool::new(parameters.degree_of_parallelism);

        pool.install(|| {
            transactions.par_iter().try_for_each(|transaction| -> Result<()> {
                token.check()?;
                let mut counted = scratch.get();
                for item in transaction.as_ref() {
                    let Some(resolved) = parameters.resolve(item) else {
                        continue;
                    };
                    if counted.insert(resolved.id()) {
                        *frequencies.entry(resolved).or_insert(0) += 1;
                    }
                }
                Ok(())
            })
        })?;

        let threshold = frequency_threshold(transactions.len(), parameters.min_support);
        debug!(distinct_items = frequencies.len(), threshold, "counted item frequencies");
        Ok(frequencies
            .into_iter()
            .filter(|(_, frequency)| *frequency >= threshold)
            .collect())
    }

    fn search_itemsets<T>(
        &self,
        pool: &ThreadPool,
        transactions: &[T],
        parameters: &MiningParameters,
        frequent_items: &FrequentItems,
        token: &CancelToken,
    ) -> Result<PairFrequencies>
    where
        T: AsRef<[Item]> + Sync,
    {
        let pair_frequencies: PairFrequencies = DashMap::with_hasher(ItemHasher::default());
        let resolved_pool: ObjectPool<Vec<Item>> = ObjectPool::new(parameters.degree_of_parallelism);
        let pairs_pool: ObjectPool<HashSet<(ItemId, ItemId), ItemHasher>> =
            ObjectPool::new(parameters.degree_of_parallelism);
        let processed = AtomicUsize::new(0);
        let transaction_count = transactions.len();

        std::thread::scope(|scope| {
            let (stop, stopped) = mpsc::channel::<()>();
            if !self.observers.is_empty() && transaction_count > 0 {
                let processed = &processed;
                scope.spawn(move || self.report_progress(processed, transaction_count, stopped));
            }

            let outcome = pool.install(|| {
                transactions.par_iter().try_for_each(|transaction| -> Result<()> {
                    token.check()?;
                    let mut resolved = resolved_pool.get();
                    resolved.extend(
                        transaction
                            .as_ref()
                            .iter()
                            .filter_map(|item| parameters.resolve(item))
                            .filter(|item| frequent_items.contains_key(item)),
                    );
                    let mut counted = pairs_pool.get();
                    for (i, first) in resolved.iter().enumerate() {
                        for second in &resolved[i + 1..] {
                            if first == second {
                                continue;
                            }
                            let (low, high) = ordered_pair(first.clone(), second.clone());
                            if counted.insert((low.id(), high.id())) {
                                *pair_frequencies.entry((low, high)).or_insert(0) += 1;
                            }
                        }
                    }
                    processed.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
            });
            // hanging up wakes the reporter
            drop(stop);
            outcome
        })?;

        Ok(pair_frequencies)
    }

    fn report_progress(&self, processed: &AtomicUsize, transaction_count: usize, stopped: mpsc::Receiver<()>) {
        let mut previous = 0;
        while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(PROGRESS_INTERVAL) {
            let current = processed.load(Ordering::Relaxed);
            if current == previous {
                continue;
            }
            previous = current;
            let progress = current as f64 / transaction_count as f64 * 100.0;
            for observer in &self.observers {
                observer.progress_changed(progress);
            }
        }
    }

    fn notify_stage(&self, stage: MiningStage) {
        debug!(%stage, "mining stage changed");
        for observer in &self.observers {
            observer.stage_changed(stage);
        }
    }
}

fn frequency_threshold(transaction_count: usize, min_support: f64) -> usize {
    (transaction_count as f64 * min_support).ceil() as usize
}

fn generate_rules(
    pool: &ThreadPool,
    pair_frequencies: PairFrequencies,
    frequent_items: &FrequentItems,
    transaction_count: usize,
    threshold: usize,
    min_confidence: f64,
    token: &CancelToken,
) -> Result<HashSet<AssociationRule>> {
    let batches: Vec<Vec<AssociationRule>> = pool.install(|| {
        pair_frequencies
            .into_par_iter()
            .filter(|(_, pair_count)| *pair_count >= threshold)
            .map(|((first, second), pair_count)| {
                token.check()?;
                rules_for_pair(first, second, pair_count, frequent_items, transaction_count, min_confidence)
            })
            .collect::<Result<Vec<_>>>()
    })?;
    Ok(batches.into_iter().flatten().collect())
}

fn rules_for_pair(
    first: Item,
    second: Item,
    pair_count: usize,
    frequent_items: &FrequentItems,
    transaction_count: usize,
    min_confidence: f64,
) -> Result<Vec<AssociationRule>> {
    let frequency = |item: &Item| {
        frequent_items.get(item).copied().ok_or_else(|| {
            BasketError::InvalidOperation(format!("item {} of a frequent pair is not frequent", item.id()))
        })
    };
    let first_count = frequency(&first)?;
    let second_count = frequency(&second)?;
    let mut rules = Vec::with_capacity(2);
    let build = |lhs: &Item, rhs: &Item, lhs_count: usize, rhs_count: usize| {
        AssociationRule::new(lhs.clone(), rhs.clone(), lhs_count, rhs_count, pair_count, transaction_count)
            .map_err(|e| BasketError::InvalidOperation(format!("mined pair {lhs} / {rhs} is inconsistent: {e}")))
    };
    if pair_count as f64 / first_count as f64 >= min_confidence {
        rules.push(build(&first, &second, first_count, second_count)?);
    }
    if pair_count as f64 / second_count as f64 >= min_confidence {
        rules.push(build(&second, &first, second_count, first_count)?);
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_are_range_checked() {
        assert!(MiningParameters::new(-0.1, 0.5).is_err());
        assert!(MiningParameters::new(0.5, 1.1).is_err());
        assert!(MiningParameters::builder(0.5, 0.5).degree_of_parallelism(0).build().is_err());
        assert!(MiningParameters::builder(0.5, 0.5).degree_of_parallelism(513).build().is_err());
        let parameters = MiningParameters::builder(0.0, 1.0)
            .degree_of_parallelism(512)
            .build()
            .expect("valid parameters");
        assert_eq!(parameters.degree_of_parallelism(), 512);
        assert!(parameters.converter().is_none());
    }

    #[test]
    fn converter_and_rules_are_mutually_exclusive() {
        let milk = Item::new(1, "Milk", false);
        let dairy = Item::new(2, "Dairy", true);
        let rule = ItemConversionRule::new(milk, dairy).expect("valid rule");
        let converter = RuleBasedItemConverter::new(vec![rule.clone()]).expect("valid converter");
        let result = MiningParameters::builder(0.0, 0.0)
            .converter(Arc::new(converter))
            .conversion_rules(vec![rule])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn resolve_applies_exclusion_before_and_after_conversion() {
        let milk = Item::new(1, "Milk", false);
        let cream = Item::new(2, "Cream", false);
        let bread = Item::new(3, "Bread", false);
        let dairy = Item::new(10, "Dairy", true);
        let parameters = MiningParameters::builder(0.0, 0.0)
            .conversion_rules(vec![
                ItemConversionRule::new(milk.clone(), dairy.clone()).expect("valid rule"),
                ItemConversionRule::new(cream.clone(), dairy.clone()).expect("valid rule"),
            ])
            .exclusion_rules(vec![ItemExclusionRule::new("Cream", true, false, true, false).expect("valid rule")])
            .build()
            .expect("valid parameters");
        assert_eq!(parameters.resolve(&milk), Some(dairy));
        assert_eq!(parameters.resolve(&cream), None);
        assert_eq!(parameters.resolve(&bread), Some(bread));
    }

    #[test]
    fn threshold_rounds_up() {
        assert_eq!(frequency_threshold(6, 0.5), 3);
        assert_eq!(frequency_threshold(7, 0.5), 4);
        assert_eq!(frequency_threshold(10, 0.0), 0);
        assert_eq!(frequency_threshold(0, 1.0), 0);
    }
}
