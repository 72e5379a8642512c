//! Threaded interface for running mining and clique jobs in the background.
//!
//! Each submitted job gets its own thread and its own [`CancelToken`]. The
//! caller keeps a [`JobHandle`] to cancel or join the job, and the
//! [`JobInterface`] registry can cancel any running job by id. Cancellation is
//! cooperative: the engines poll the token between units of work and finish
//! with [`BasketError::Cancelled`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::clique::{MaximalCliqueFinder, MaximalCliqueFindingParameters};
use crate::error::{BasketError, Result};
use crate::item::Item;
use crate::mining::{Miner, MiningParameters};
use crate::rule::AssociationRule;

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn value(self) -> u64 {
        self.0
    }
}

type Registry = Arc<Mutex<HashMap<JobId, CancelToken>>>;

/// Handle to a running or completed job.
pub struct JobHandle<T> {
    pub id: JobId,
    token: CancelToken,
    started: Instant,
    join: JoinHandle<Result<T>>,
}

impl<T> JobHandle<T> {
    /// Request cancellation. The worker may take a short time to observe it.
    pub fn cancel(&self) {
        self.token.cancel();
    }
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
    /// Wait for the job and take its outcome.
    pub fn join(self) -> Result<T> {
        self.join
            .join()
            .map_err(|_| BasketError::InvalidOperation(format!("job {} panicked", self.id.0)))?
    }
}

/// Registry managing job lifecycles.
#[derive(Default)]
pub struct JobInterface {
    miner: Arc<Miner>,
    finder: Arc<MaximalCliqueFinder>,
    next_id: AtomicU64,
    active: Registry,
}

impl JobInterface {
    pub fn new(miner: Miner) -> Self {
        Self {
            miner: Arc::new(miner),
            ..Self::default()
        }
    }

    /// Mine `transactions` on a background thread.
    pub fn start_mining(
        &self,
        transactions: Vec<Vec<Item>>,
        parameters: MiningParameters,
    ) -> Result<JobHandle<Vec<AssociationRule>>> {
        let miner = Arc::clone(&self.miner);
        self.spawn("mining", move |token| {
            let rules = miner.mine(&transactions, &parameters, token)?;
            Ok(rules.into_iter().collect())
        })
    }

    /// Find maximal cliques among `rules` on a background thread.
    pub fn start_clique_search(
        &self,
        rules: Vec<AssociationRule>,
        parameters: MaximalCliqueFindingParameters,
    ) -> Result<JobHandle<Vec<Vec<AssociationRule>>>> {
        let finder = Arc::clone(&self.finder);
        self.spawn("clique", move |token| finder.find(&rules, &parameters, token))
    }

    /// Cancel a job by id. Returns false when it is not running.
    pub fn cancel(&self, id: JobId) -> Result<bool> {
        let active = self.active.lock()?;
        Ok(match active.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        })
    }

    pub fn active_jobs(&self) -> Result<Vec<JobId>> {
        let mut ids: Vec<JobId> = self.active.lock()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn spawn<T, F>(&self, kind: &'static str, work: F) -> Result<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T> + Send + 'static,
    {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let token = CancelToken::new();
        self.active.lock()?.insert(id, token.clone());

        let registry = Arc::clone(&self.active);
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name(format!("basket-{kind}-{}", id.0))
            .spawn(move || {
                let started = Instant::now();
                let outcome = work(&worker_token);
                let ms = started.elapsed().as_secs_f64() * 1000.0;
                match &outcome {
                    Ok(_) => info!(job = id.0, kind, ms, "job complete"),
                    Err(e) if e.is_cancelled() => info!(job = id.0, kind, ms, "job cancelled"),
                    Err(e) => warn!(job = id.0, kind, ms, error = %e, "job failed"),
                }
                if let Ok(mut active) = registry.lock() {
                    active.remove(&id);
                }
                outcome
            });
        let join = match spawned {
            Ok(join) => join,
            Err(e) => {
                self.active.lock()?.remove(&id);
                return Err(BasketError::InvalidOperation(format!("cannot start {kind} job: {e}")));
            }
        };
        debug!(job = id.0, kind, "job started");
        Ok(JobHandle {
            id,
            token,
            started: Instant::now(),
            join,
        })
    }
}
