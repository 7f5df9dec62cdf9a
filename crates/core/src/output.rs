//! Unspent outputs.

use serde::{Deserialize, Serialize};

use crate::id::{Address, OutputKey};

/// Stored fields of an output (what the ledger keeps under its key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "address")]
    pub owner: Address,
    pub amount: u64,
}

/// An unspent output: immutable once minted, removed exactly once when spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub key: OutputKey,
    #[serde(rename = "address")]
    pub owner: Address,
    pub amount: u64,
}

impl Output {
    pub fn new(key: OutputKey, owner: Address, amount: u64) -> Self {
        Self { key, owner, amount }
    }

    pub fn from_record(key: OutputKey, record: OutputRecord) -> Self {
        Self {
            key,
            owner: record.owner,
            amount: record.amount,
        }
    }

    pub fn record(&self) -> OutputRecord {
        OutputRecord {
            owner: self.owner.clone(),
            amount: self.amount,
        }
    }
}

/// Total value of a set of outputs.
///
/// Accumulates in `u128` so summing any number of `u64` amounts cannot overflow.
pub fn total_amount<'a>(outputs: impl IntoIterator<Item = &'a Output>) -> u128 {
    outputs.into_iter().map(|o| o.amount as u128).sum()
}
