//! Transfer error model.

use thiserror::Error;

/// Result type used across the transfer pipeline.
pub type TransferResult<T> = Result<T, TransferError>;

/// Why a transfer attempt failed.
///
/// This is a closed taxonomy. Every variant leaves the ledger exactly as it was
/// before the attempt; none of them is fatal to the process.
///
/// Permanent rejections (`Schema`, `InvalidSignature`, `UnknownOrUnownedUtxo`,
/// `InsufficientBalance`) will fail again if resubmitted unchanged. Conflicts and
/// store faults are retryable: the caller may re-validate and resubmit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Malformed or missing fields; never reaches signature checks or the store.
    #[error("schema violation: {0}")]
    Schema(String),

    /// Digest, signature and public key do not match.
    #[error("invalid signature")]
    InvalidSignature,

    /// A referenced input does not exist or is not owned by the sender.
    #[error("utxo not found or not owned by sender: {utxo_id}")]
    UnknownOrUnownedUtxo { utxo_id: String },

    /// The supplied inputs do not cover `amount + fee`.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    /// The atomic commit was aborted because an input was spent (or an output
    /// key taken) between validation and commit.
    #[error("settlement conflict: {0}")]
    SettlementConflict(String),

    /// The underlying store could not be reached or returned unusable data.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl TransferError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn unknown_utxo(utxo_id: impl Into<String>) -> Self {
        Self::UnknownOrUnownedUtxo {
            utxo_id: utxo_id.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::SettlementConflict(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Whether resubmitting the same transfer could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferError::SettlementConflict(_) | TransferError::StoreUnavailable(_)
        )
    }

    /// Stable, machine-readable name of the failure kind (used in logs).
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::Schema(_) => "schema",
            TransferError::InvalidSignature => "invalid_signature",
            TransferError::UnknownOrUnownedUtxo { .. } => "unknown_or_unowned_utxo",
            TransferError::InsufficientBalance { .. } => "insufficient_balance",
            TransferError::SettlementConflict(_) => "settlement_conflict",
            TransferError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}
