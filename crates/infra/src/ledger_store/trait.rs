use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use utxo_core::{Address, Output, OutputKey, OutputRecord, TransferError, total_amount};

/// A single ledger mutation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Remove `key` from the ledger. Only valid if `owner` currently owns it.
    Spend { key: OutputKey, owner: Address },
    /// Create `key` owned by `owner`. Only valid if `key` is not in the ledger.
    Mint {
        key: OutputKey,
        owner: Address,
        amount: u64,
    },
}

impl Mutation {
    pub fn key(&self) -> &OutputKey {
        match self {
            Mutation::Spend { key, .. } | Mutation::Mint { key, .. } => key,
        }
    }

    pub fn owner(&self) -> &Address {
        match self {
            Mutation::Spend { owner, .. } | Mutation::Mint { owner, .. } => owner,
        }
    }
}

/// Ordered batch of mutations applied all-or-nothing by [`LedgerStore::apply_atomic`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationBatch {
    mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spend(&mut self, key: OutputKey, owner: Address) -> &mut Self {
        self.mutations.push(Mutation::Spend { key, owner });
        self
    }

    pub fn mint(&mut self, key: OutputKey, owner: Address, amount: u64) -> &mut Self {
        self.mutations.push(Mutation::Mint { key, owner, amount });
        self
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn spent_keys(&self) -> impl Iterator<Item = &OutputKey> + '_ {
        self.mutations.iter().filter_map(|m| match m {
            Mutation::Spend { key, .. } => Some(key),
            Mutation::Mint { .. } => None,
        })
    }

    /// Outputs this batch creates, in batch order.
    pub fn minted_outputs(&self) -> Vec<Output> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::Mint { key, owner, amount } => {
                    Some(Output::new(key.clone(), owner.clone(), *amount))
                }
                Mutation::Spend { .. } => None,
            })
            .collect()
    }

    pub fn minted_total(&self) -> u128 {
        total_amount(&self.minted_outputs())
    }

    /// Reject batches that cannot be applied regardless of ledger state: a key
    /// touched twice, or a zero-value mint.
    pub fn check_well_formed(&self) -> Result<(), LedgerStoreError> {
        let mut seen: HashSet<&OutputKey> = HashSet::with_capacity(self.mutations.len());
        for (idx, m) in self.mutations.iter().enumerate() {
            if !seen.insert(m.key()) {
                return Err(LedgerStoreError::InvalidBatch(format!(
                    "output {} touched more than once (index {idx})",
                    m.key()
                )));
            }
            if let Mutation::Mint { key, amount: 0, .. } = m {
                return Err(LedgerStoreError::InvalidBatch(format!(
                    "zero-value mint of {key} (index {idx})"
                )));
            }
        }
        Ok(())
    }
}

/// Ledger store operation error.
///
/// `Aborted` is the expected outcome of losing a race; the other variants are
/// faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerStoreError {
    /// A precondition of the batch did not hold at commit time; nothing was applied.
    #[error("commit aborted: {0}")]
    Aborted(String),

    /// The batch can never be applied (see [`MutationBatch::check_well_formed`]).
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be interpreted.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<LedgerStoreError> for TransferError {
    fn from(value: LedgerStoreError) -> Self {
        match value {
            LedgerStoreError::Aborted(msg) => TransferError::SettlementConflict(msg),
            LedgerStoreError::InvalidBatch(msg) => TransferError::Schema(msg),
            LedgerStoreError::Unavailable(msg) => TransferError::StoreUnavailable(msg),
            LedgerStoreError::Corrupt(msg) => {
                TransferError::StoreUnavailable(format!("corrupt record: {msg}"))
            }
        }
    }
}

/// Atomic key-value substrate holding the UTXO set.
///
/// Two kinds of state are kept:
///
/// - **Output records**: `OutputKey -> { owner, amount }`
/// - **Ownership sets**: `Address -> {OutputKey}`
///
/// An output key is in exactly one ownership set (its record's owner) while
/// unspent, and in none once spent.
///
/// ## Atomicity
///
/// `apply_atomic()` is the only write path. Implementations must:
/// - re-check at commit time that every spent output exists, is owned by the
///   stated owner, and is listed in that owner's set
/// - re-check that every minted key is free
/// - make all mutations of the batch visible together, or none of them
///
/// Reads never mutate state and may be served from a snapshot that is stale by
/// the time a batch commits; the commit-time checks are what prevent
/// double-spends.
pub trait LedgerStore: Send + Sync {
    /// Keys owned by `owner` (empty if the address is unknown).
    fn list_outputs(&self, owner: &Address) -> Result<BTreeSet<OutputKey>, LedgerStoreError>;

    /// Stored fields of `key`, or `None` if it does not exist (never minted or spent).
    fn read_output(&self, key: &OutputKey) -> Result<Option<OutputRecord>, LedgerStoreError>;

    /// Apply `batch` all-or-nothing. `Ok(())` means committed.
    fn apply_atomic(&self, batch: &MutationBatch) -> Result<(), LedgerStoreError>;

    /// Materialized outputs of `owner`, sorted by key.
    ///
    /// Set entries whose record vanished (spent between the two reads) or
    /// belongs to someone else are skipped.
    fn owned_outputs(&self, owner: &Address) -> Result<Vec<Output>, LedgerStoreError> {
        let mut outputs = Vec::new();
        for key in self.list_outputs(owner)? {
            match self.read_output(&key)? {
                Some(record) if &record.owner == owner => {
                    outputs.push(Output::from_record(key, record));
                }
                Some(record) => {
                    tracing::warn!(
                        output = %key,
                        listed_owner = %owner,
                        record_owner = %record.owner,
                        "ownership set entry points at a record with another owner"
                    );
                }
                None => {}
            }
        }
        Ok(outputs)
    }

    /// Sum of the amounts `owner` can spend.
    fn balance(&self, owner: &Address) -> Result<u128, LedgerStoreError> {
        Ok(total_amount(&self.owned_outputs(owner)?))
    }
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn list_outputs(&self, owner: &Address) -> Result<BTreeSet<OutputKey>, LedgerStoreError> {
        (**self).list_outputs(owner)
    }

    fn read_output(&self, key: &OutputKey) -> Result<Option<OutputRecord>, LedgerStoreError> {
        (**self).read_output(key)
    }

    fn apply_atomic(&self, batch: &MutationBatch) -> Result<(), LedgerStoreError> {
        (**self).apply_atomic(batch)
    }
}
