//! An in-memory catalog of named rule sets with transactional, chunked saves.
//!
//! A save is a sequence of [`RuleSetPart`]s sent under a caller-chosen
//! transaction id. Nothing of it is visible to [`RuleSetCatalog::list`] or
//! [`RuleSetCatalog::load`] until the part flagged as last arrives and the
//! whole set checks out, at which point it replaces any set of the same name.
//! A failing part, a cancelled token or an explicit rollback throws the staged
//! parts away. Only one save per name may be in progress; saves of different
//! names do not wait on each other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{BasketError, Result};
use crate::ruleset::{AssociationRuleSet, RuleSetAssembler, RuleSetHeader, RuleSetPart};
use crate::settings::CatalogSettings;

pub type TransactionId = u64;

#[derive(Debug)]
struct PendingSave {
    name: String,
    assembler: RuleSetAssembler,
    touched: Instant,
}

#[derive(Debug)]
pub struct RuleSetCatalog {
    published: DashMap<String, Arc<AssociationRuleSet>>,
    pending: DashMap<TransactionId, PendingSave>,
    // name -> transaction currently saving it
    reserved: DashMap<String, TransactionId>,
    idle_timeout: Duration,
    chunk_size: usize,
}

impl RuleSetCatalog {
    pub fn new(idle_timeout: Duration, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(BasketError::invalid_argument("chunk_size", "chunk size must be positive"));
        }
        Ok(Self {
            published: DashMap::new(),
            pending: DashMap::new(),
            reserved: DashMap::new(),
            idle_timeout,
            chunk_size,
        })
    }

    pub fn from_settings(settings: &CatalogSettings) -> Result<Self> {
        Self::new(settings.idle_timeout(), settings.chunk_size)
    }

    /// Headers of all fully written rule sets, ordered by name.
    pub fn list(&self) -> Vec<RuleSetHeader> {
        let mut headers: Vec<RuleSetHeader> = self.published.iter().map(|set| set.header().clone()).collect();
        headers.sort_by(|a, b| a.name.cmp(&b.name));
        headers
    }

    pub fn get(&self, name: &str) -> Result<Arc<AssociationRuleSet>> {
        self.published
            .get(name)
            .map(|set| Arc::clone(set.value()))
            .ok_or_else(|| BasketError::NotFound(format!("rule set `{name}`")))
    }

    /// The parts of a stored rule set, chunked as configured.
    pub fn load(&self, name: &str) -> Result<Vec<RuleSetPart>> {
        self.get(name)?.to_parts(self.chunk_size)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        match self.published.remove(name) {
            Some(_) => {
                info!(name, "removed rule set");
                Ok(())
            }
            None => Err(BasketError::NotFound(format!("rule set `{name}`"))),
        }
    }

    pub fn begin_save(&self, transaction: TransactionId, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(BasketError::invalid_argument("name", "rule set name cannot be empty"));
        }
        let Entry::Vacant(slot) = self.pending.entry(transaction) else {
            return Err(BasketError::Conflict(format!("transaction {transaction} is already in use")));
        };
        match self.reserved.entry(name.to_string()) {
            Entry::Occupied(owner) => Err(BasketError::Conflict(format!(
                "rule set `{name}` is already being saved by transaction {}",
                owner.get()
            ))),
            Entry::Vacant(reservation) => {
                reservation.insert(transaction);
                slot.insert(PendingSave {
                    name: name.to_string(),
                    assembler: RuleSetAssembler::default(),
                    touched: Instant::now(),
                });
                debug!(transaction, name, "save started");
                Ok(())
            }
        }
    }

    /// Stages one part. With `is_last` the staged set is validated and published.
    pub fn save_part(
        &self,
        transaction: TransactionId,
        part: RuleSetPart,
        is_last: bool,
        token: &CancelToken,
    ) -> Result<()> {
        if let Err(e) = token.check() {
            self.discard(transaction, "cancelled");
            return Err(e);
        }
        let staged = self.stage(transaction, part);
        if let Err(e) = staged {
            self.discard(transaction, "invalid part");
            return Err(e);
        }
        if is_last {
            self.commit(transaction)?;
        }
        Ok(())
    }

    /// Saves a whole rule set as one transaction.
    pub fn save(&self, transaction: TransactionId, set: &AssociationRuleSet, token: &CancelToken) -> Result<()> {
        self.begin_save(transaction, set.name())?;
        let parts = match set.to_parts(self.chunk_size) {
            Ok(parts) => parts,
            Err(e) => {
                self.discard(transaction, "invalid chunking");
                return Err(e);
            }
        };
        let count = parts.len();
        for (index, part) in parts.into_iter().enumerate() {
            self.save_part(transaction, part, index + 1 == count, token)?;
        }
        Ok(())
    }

    pub fn rollback(&self, transaction: TransactionId) -> Result<()> {
        if self.discard(transaction, "rollback requested") {
            Ok(())
        } else {
            Err(BasketError::NotFound(format!("no save in progress for transaction {transaction}")))
        }
    }

    /// Rolls back every save that has not received a part within the idle timeout.
    pub fn reclaim_idle(&self) -> usize {
        let expired: Vec<TransactionId> = self
            .pending
            .iter()
            .filter(|save| save.touched.elapsed() >= self.idle_timeout)
            .map(|save| *save.key())
            .collect();
        let reclaimed = expired
            .into_iter()
            .filter(|&transaction| self.discard(transaction, "idle"))
            .count();
        if reclaimed > 0 {
            warn!(reclaimed, "reclaimed idle saves");
        }
        reclaimed
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn stage(&self, transaction: TransactionId, part: RuleSetPart) -> Result<()> {
        let mut save = self
            .pending
            .get_mut(&transaction)
            .ok_or_else(|| BasketError::NotFound(format!("no save in progress for transaction {transaction}")))?;
        save.touched = Instant::now();
        let stage = part.stage();
        if let RuleSetPart::Header(header) = &part {
            if header.name != save.name {
                return Err(BasketError::Save {
                    name: save.name.clone(),
                    stage: stage.to_string(),
                    message: format!("header names `{}`", header.name),
                });
            }
        }
        let name = save.name.clone();
        save.assembler.push(part).map_err(|e| BasketError::Save {
            name,
            stage: stage.to_string(),
            message: e.to_string(),
        })
    }

    fn commit(&self, transaction: TransactionId) -> Result<()> {
        let (_, save) = self
            .pending
            .remove(&transaction)
            .ok_or_else(|| BasketError::NotFound(format!("no save in progress for transaction {transaction}")))?;
        let name = save.name;
        let outcome = save.assembler.finish().map_err(|e| BasketError::Save {
            name: name.clone(),
            stage: "commit".to_string(),
            message: e.to_string(),
        });
        if let Ok(set) = &outcome {
            info!(
                transaction,
                name = %name,
                items = set.items().len(),
                rules = set.rules().len(),
                "rule set saved"
            );
        }
        let published = outcome.map(|set| {
            self.published.insert(name.clone(), Arc::new(set));
        });
        self.reserved.remove_if(&name, |_, owner| *owner == transaction);
        published
    }

    fn discard(&self, transaction: TransactionId, reason: &str) -> bool {
        match self.pending.remove(&transaction) {
            Some((_, save)) => {
                self.reserved.remove_if(&save.name, |_, owner| *owner == transaction);
                warn!(transaction, name = %save.name, reason, "save rolled back");
                true
            }
            None => false,
        }
    }
}
