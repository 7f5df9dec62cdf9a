//! Transaction validation.
//!
//! ```text
//! SignedTransaction
//!   ↓
//! 1. Structure  (fields, amounts, addresses, key length)  → Schema
//!   ↓
//! 2. Signature  (digest vs senderPubKey)                  → InvalidSignature
//!   ↓
//! 3. Inputs     (each id owned by sender, in order)       → UnknownOrUnownedUtxo
//!   ↓
//! 4. Balance    (Σ all inputs ≥ amount + fee)             → InsufficientBalance
//!   ↓
//! resolved inputs, caller order
//! ```
//!
//! Validation only reads the store. Its view may be stale by the time the
//! settlement commits; the commit re-checks ownership.

use std::collections::{HashMap, HashSet};

use utxo_core::{Output, OutputKey, SignedTransaction, TransferError, TransferResult, total_amount};
use utxo_crypto::{AddressValidator, BitcoinAddressValidator, COMPRESSED_PUBLIC_KEY_HEX_LEN};
use utxo_infra::LedgerStore;

#[derive(Debug, Clone)]
pub struct TransactionValidator<V = BitcoinAddressValidator> {
    addresses: V,
}

impl Default for TransactionValidator<BitcoinAddressValidator> {
    fn default() -> Self {
        Self::new(BitcoinAddressValidator::default())
    }
}

impl<V: AddressValidator> TransactionValidator<V> {
    pub fn new(addresses: V) -> Self {
        Self { addresses }
    }

    /// Run every check in order and return the resolved inputs.
    pub fn validate<S>(
        &self,
        transaction: &SignedTransaction,
        store: &S,
    ) -> TransferResult<Vec<Output>>
    where
        S: LedgerStore + ?Sized,
    {
        self.check_structure(transaction)?;
        check_signature(transaction)?;
        let inputs = resolve_inputs(transaction, store)?;
        check_balance(transaction, &inputs)?;
        Ok(inputs)
    }

    /// Step 1: field presence and shape.
    pub fn check_structure(&self, transaction: &SignedTransaction) -> TransferResult<()> {
        for (field, address) in [
            ("sender", &transaction.sender),
            ("receiver", &transaction.receiver),
        ] {
            if address.as_str().is_empty() {
                return Err(TransferError::schema(format!("{field} cannot be empty")));
            }
            if !self.addresses.is_valid_address(address.as_str()) {
                return Err(TransferError::schema(format!(
                    "{field} is not a valid address: {address}"
                )));
            }
        }

        if transaction.sender_pub_key.len() != COMPRESSED_PUBLIC_KEY_HEX_LEN {
            return Err(TransferError::schema(format!(
                "public key must be {COMPRESSED_PUBLIC_KEY_HEX_LEN} characters long"
            )));
        }

        if transaction.amount == 0 {
            return Err(TransferError::schema("amount must be greater than 0"));
        }
        if transaction.required_total().is_none() {
            return Err(TransferError::schema("amount + fee overflows"));
        }

        if transaction.utxo_ids.is_empty() {
            return Err(TransferError::schema("must have at least one utxo"));
        }
        let mut seen: HashSet<&OutputKey> = HashSet::with_capacity(transaction.utxo_ids.len());
        for id in &transaction.utxo_ids {
            if id.as_str().is_empty() {
                return Err(TransferError::schema("utxo id cannot be empty"));
            }
            if !seen.insert(id) {
                return Err(TransferError::schema(format!("utxo {id} listed more than once")));
            }
        }

        if transaction.signature.is_empty() {
            return Err(TransferError::schema("signature cannot be empty"));
        }

        Ok(())
    }
}

/// Step 2: the signature must match the digest and the declared public key.
pub fn check_signature(transaction: &SignedTransaction) -> TransferResult<()> {
    if utxo_crypto::verify(transaction) {
        Ok(())
    } else {
        Err(TransferError::InvalidSignature)
    }
}

/// Step 3: resolve every referenced id against the sender's current outputs.
///
/// Returns the inputs in the order the transaction lists them.
pub fn resolve_inputs<S>(transaction: &SignedTransaction, store: &S) -> TransferResult<Vec<Output>>
where
    S: LedgerStore + ?Sized,
{
    let owned: HashMap<OutputKey, Output> = store
        .owned_outputs(&transaction.sender)?
        .into_iter()
        .map(|o| (o.key.clone(), o))
        .collect();

    transaction
        .utxo_ids
        .iter()
        .map(|id| {
            owned
                .get(id)
                .cloned()
                .ok_or_else(|| TransferError::unknown_utxo(id.as_str()))
        })
        .collect()
}

/// Step 4: all supplied inputs together must cover `amount + fee`.
///
/// This looks at every input, even though settlement may spend only a prefix.
pub fn check_balance(transaction: &SignedTransaction, inputs: &[Output]) -> TransferResult<()> {
    let available = total_amount(inputs);
    let requested = transaction.amount as u128 + transaction.fee as u128;

    if available < requested {
        return Err(TransferError::InsufficientBalance {
            available,
            requested,
        });
    }
    Ok(())
}
