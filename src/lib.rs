//! Basket analysis – association rule mining and maximal cliques over rules.
//!
//! Given transactions (lists of [`item::Item`]s observed together), the
//! [`mining::Miner`] finds directed association rules `A -> B` between pairs
//! of items whose support and confidence reach the requested minimums. Each
//! [`rule::AssociationRule`] keeps the counts it was derived from, so the
//! usual strength measures (lift, conviction, Yule's Q, phi, chi-squared)
//! come straight from its 2×2 contingency table.
//!
//! ## Modules
//! * [`item`] – Items and group items, identified by id alone.
//! * [`rule`] / [`metrics`] – Association rules and their statistics.
//! * [`exclusion`] / [`conversion`] – Keeping items out of mining, and
//!   generalizing items to groups before counting.
//! * [`mining`] – The three-stage parallel miner with stage and progress observers.
//! * [`setops`] – Intersection and difference of rule collections, optionally
//!   ignoring link direction.
//! * [`clique`] / [`tomita`] – Rule graphs and their maximal cliques, found
//!   with an iterative Bron-Kerbosch search with Tomita pivoting.
//! * [`ruleset`] / [`catalog`] – Named rule sets, their chunked part stream and
//!   an in-memory catalog with transactional saves.
//! * [`interface`] – Background jobs with cooperative cancellation.
//! * [`settings`] – Layered configuration and logging setup.
//!
//! ## Quick Start
//! ```
//! use basket_analysis::{cancel::CancelToken, item::Item, mining::{Miner, MiningParameters}};
//! let (a, b) = (Item::new(1, "Bread", false), Item::new(2, "Butter", false));
//! let transactions = vec![vec![a.clone(), b.clone()], vec![a.clone()], vec![a, b]];
//! let parameters = MiningParameters::new(0.5, 0.5).expect("valid parameters");
//! let rules = Miner::new().mine(&transactions, &parameters, &CancelToken::new()).expect("mined");
//! assert_eq!(rules.len(), 2);
//! ```
//!
//! ## Concurrency
//! Mining runs on a dedicated worker pool whose size is the degree of
//! parallelism of the [`mining::MiningParameters`]. Counters are concurrent
//! maps updated per key, and per-transaction scratch sets come from
//! [`pool::ObjectPool`]s. Every long-running operation takes a
//! [`cancel::CancelToken`] and reports [`error::BasketError::Cancelled`]
//! instead of partial results once it is triggered.
//!
//! ## Logging
//! The library emits `tracing` events and never installs a subscriber itself;
//! see [`settings::LoggingSettings::init_tracing`].

pub mod cancel;
pub mod catalog;
pub mod clique;
pub mod conversion;
pub mod error;
pub mod exclusion;
pub mod interface;
pub mod item;
pub mod metrics;
pub mod mining;
pub mod pool;
pub mod rule;
pub mod ruleset;
pub mod settings;
pub mod setops;
pub mod tomita;
