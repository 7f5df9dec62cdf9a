//! `utxo-core`: ledger domain building blocks.
//!
//! This crate contains **pure domain** types (no crypto, no storage).

pub mod error;
pub mod id;
pub mod output;
pub mod transaction;

pub use error::{TransferError, TransferResult};
pub use id::{Address, OutputKey, TxDigest};
pub use output::{Output, OutputRecord, total_amount};
pub use transaction::{SignedTransaction, Transaction};
