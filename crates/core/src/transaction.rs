//! Transfer requests.
//!
//! Transactions are never stored: they are ephemeral inputs to settlement. The
//! wire shape is a camelCase JSON object:
//!
//! ```json
//! {
//!   "sender": "1...", "senderPubKey": "02...", "receiver": "1...",
//!   "amount": 10, "fee": 0, "utxoIds": ["<txid>:0"], "signature": "3044..."
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{TransferError, TransferResult};
use crate::id::{Address, OutputKey};

/// Unsigned transfer: the fields covered by the digest and the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub sender: Address,
    /// Compressed secp256k1 public key, hex encoded (66 chars).
    pub sender_pub_key: String,
    pub receiver: Address,
    pub amount: u64,
    pub fee: u64,
    /// Inputs offered for this transfer, in spending order.
    pub utxo_ids: Vec<OutputKey>,
}

/// A transfer together with the sender's signature over its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    /// DER-encoded ECDSA signature, hex encoded.
    pub signature: String,
}

impl Transaction {
    pub fn into_signed(self, signature: impl Into<String>) -> SignedTransaction {
        SignedTransaction {
            transaction: self,
            signature: signature.into(),
        }
    }

    /// `amount + fee`, or `None` if it does not fit in a `u64`.
    pub fn required_total(&self) -> Option<u64> {
        self.amount.checked_add(self.fee)
    }
}

impl SignedTransaction {
    /// Parse a signed transfer request from its JSON wire form.
    ///
    /// Any shape problem (missing field, wrong type, negative or fractional
    /// amount) is reported as [`TransferError::Schema`].
    pub fn from_json(input: &str) -> TransferResult<Self> {
        serde_json::from_str(input).map_err(|e| TransferError::schema(e.to_string()))
    }

    pub fn to_json(&self) -> TransferResult<String> {
        serde_json::to_string(self).map_err(|e| TransferError::schema(e.to_string()))
    }

    pub fn unsigned(&self) -> &Transaction {
        &self.transaction
    }
}

impl core::ops::Deref for SignedTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}
