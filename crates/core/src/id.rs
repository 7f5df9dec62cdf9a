//! Strongly-typed identifiers used across the ledger.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// Owner address of outputs (format rules are opaque to the ledger).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

/// Identifier of an output: `transaction_id ":" output_index`.
///
/// Caller-supplied ids are kept verbatim; only keys minted by the ledger are
/// guaranteed to follow the `id:index` shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputKey(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = TransferError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() {
                    return Err(TransferError::schema(concat!($name, " cannot be empty")));
                }
                Ok(Self(s.to_string()))
            }
        }
    };
}

impl_string_newtype!(Address, "address");
impl_string_newtype!(OutputKey, "utxo id");

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl OutputKey {
    /// Build the key of output `index` of transaction `txn_id`.
    pub fn new(txn_id: impl AsRef<str>, index: u32) -> Self {
        Self(format!("{}:{}", txn_id.as_ref(), index))
    }

    /// Wrap a caller-supplied id verbatim.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Split into `(transaction_id, output_index)` when the key has that shape.
    pub fn parts(&self) -> Option<(&str, u32)> {
        let (txn_id, index) = self.0.rsplit_once(':')?;
        let index = index.parse().ok()?;
        Some((txn_id, index))
    }
}

/// SHA-256 digest of a transaction's unsigned fields.
///
/// Rendered as 64 lowercase hex characters; that rendering is the transaction id
/// used for newly minted output keys.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxDigest([u8; 32]);

impl TxDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Key of the `index`-th output minted by this transaction.
    pub fn output_key(&self, index: u32) -> OutputKey {
        OutputKey::new(self.to_hex(), index)
    }
}

impl core::fmt::Display for TxDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl core::fmt::Debug for TxDigest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "TxDigest({})", self.to_hex())
    }
}

impl Serialize for TxDigest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
