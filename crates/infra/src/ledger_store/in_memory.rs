use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use utxo_core::{Address, OutputKey, OutputRecord};

use super::r#trait::{LedgerStore, LedgerStoreError, Mutation, MutationBatch};

#[derive(Debug, Default)]
struct LedgerState {
    outputs: HashMap<OutputKey, OutputRecord>,
    owners: HashMap<Address, BTreeSet<OutputKey>>,
}

impl LedgerState {
    /// Commit-time precondition of a single mutation against current state.
    fn check(&self, mutation: &Mutation) -> Result<(), LedgerStoreError> {
        match mutation {
            Mutation::Spend { key, owner } => {
                let record = self
                    .outputs
                    .get(key)
                    .ok_or_else(|| LedgerStoreError::Aborted(format!("{key} already spent")))?;
                if &record.owner != owner {
                    return Err(LedgerStoreError::Aborted(format!(
                        "{key} is not owned by {owner}"
                    )));
                }
                let listed = self.owners.get(owner).is_some_and(|set| set.contains(key));
                if !listed {
                    return Err(LedgerStoreError::Aborted(format!(
                        "{key} is not in the output set of {owner}"
                    )));
                }
                Ok(())
            }
            Mutation::Mint { key, .. } => {
                if self.outputs.contains_key(key) {
                    return Err(LedgerStoreError::Aborted(format!("{key} already exists")));
                }
                Ok(())
            }
        }
    }

    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Spend { key, owner } => {
                self.outputs.remove(key);
                if let Some(set) = self.owners.get_mut(owner) {
                    set.remove(key);
                    if set.is_empty() {
                        self.owners.remove(owner);
                    }
                }
            }
            Mutation::Mint { key, owner, amount } => {
                self.outputs.insert(
                    key.clone(),
                    OutputRecord {
                        owner: owner.clone(),
                        amount: *amount,
                    },
                );
                self.owners
                    .entry(owner.clone())
                    .or_default()
                    .insert(key.clone());
            }
        }
    }
}

/// In-memory ledger store.
///
/// A batch is checked and applied under a single write lock, so readers see
/// either none or all of it. Intended for tests, the demo harness and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every unspent output in the ledger.
    pub fn total_value(&self) -> Result<u128, LedgerStoreError> {
        let state = self.read()?;
        Ok(state.outputs.values().map(|r| r.amount as u128).sum())
    }

    /// Number of unspent outputs in the ledger.
    pub fn output_count(&self) -> Result<usize, LedgerStoreError> {
        Ok(self.read()?.outputs.len())
    }

    /// Verify that ownership sets and output records agree exactly.
    ///
    /// Every set entry must point at a record owned by that address, and every
    /// record must appear in its owner's set.
    pub fn check_consistency(&self) -> Result<(), LedgerStoreError> {
        let state = self.read()?;

        let mut listed = 0usize;
        for (owner, keys) in &state.owners {
            for key in keys {
                match state.outputs.get(key) {
                    Some(record) if &record.owner == owner => listed += 1,
                    Some(record) => {
                        return Err(LedgerStoreError::Corrupt(format!(
                            "{key} listed under {owner} but owned by {}",
                            record.owner
                        )));
                    }
                    None => {
                        return Err(LedgerStoreError::Corrupt(format!(
                            "{key} listed under {owner} has no record"
                        )));
                    }
                }
            }
        }

        if listed != state.outputs.len() {
            return Err(LedgerStoreError::Corrupt(format!(
                "{} records but {listed} ownership entries",
                state.outputs.len()
            )));
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, LedgerState>, LedgerStoreError> {
        self.state
            .read()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn list_outputs(&self, owner: &Address) -> Result<BTreeSet<OutputKey>, LedgerStoreError> {
        Ok(self.read()?.owners.get(owner).cloned().unwrap_or_default())
    }

    fn read_output(&self, key: &OutputKey) -> Result<Option<OutputRecord>, LedgerStoreError> {
        Ok(self.read()?.outputs.get(key).cloned())
    }

    fn apply_atomic(&self, batch: &MutationBatch) -> Result<(), LedgerStoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        batch.check_well_formed()?;

        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        // Check everything before touching anything.
        for mutation in batch.mutations() {
            state.check(mutation)?;
        }
        for mutation in batch.mutations() {
            state.apply(mutation);
        }

        tracing::debug!(mutations = batch.len(), "batch committed");
        Ok(())
    }
}
