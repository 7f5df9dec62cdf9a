//! Canonical transaction digest.

use sha2::{Digest, Sha256};

use utxo_core::{OutputKey, Transaction, TxDigest};

/// The exact string that is hashed for a transaction.
///
/// `sender::receiver::amount::id1,id2,...::fee`. Input order is significant.
pub fn canonical_message(transaction: &Transaction) -> String {
    let utxo_ids = transaction
        .utxo_ids
        .iter()
        .map(OutputKey::as_str)
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{}::{}::{}::{}::{}",
        transaction.sender, transaction.receiver, transaction.amount, utxo_ids, transaction.fee
    )
}

/// SHA-256 of [`canonical_message`].
///
/// Used both as the signing message and as the transaction id of minted outputs.
pub fn digest(transaction: &Transaction) -> TxDigest {
    let hash = Sha256::digest(canonical_message(transaction).as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    TxDigest::from_bytes(bytes)
}
