//! ECDSA (secp256k1) signing and verification of transactions.
//!
//! The signed message is the 32-byte transaction digest itself (pre-hashed; no
//! second hashing pass). Signatures are DER encoded and carried as hex.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use utxo_core::{SignedTransaction, Transaction};

use crate::error::CryptoError;
use crate::hashing::digest;

/// Length of a hex-encoded compressed public key.
pub const COMPRESSED_PUBLIC_KEY_HEX_LEN: usize = 66;

/// Sign `transaction` with a hex-encoded 32-byte private key.
///
/// Returns the DER-encoded signature as lowercase hex.
pub fn sign(transaction: &Transaction, private_key_hex: &str) -> Result<String, CryptoError> {
    let key = signing_key_from_hex(private_key_hex)?;
    let message = digest(transaction);

    let signature: Signature = key
        .sign_prehash(message.as_bytes())
        .map_err(|e| CryptoError::Signing(e.to_string()))?;

    Ok(hex::encode(signature.to_der().as_bytes()))
}

/// Verify the signature of `transaction` against its `sender_pub_key`.
///
/// Any malformed key or signature yields `false`.
pub fn verify(transaction: &SignedTransaction) -> bool {
    verify_signature(
        transaction.unsigned(),
        &transaction.sender_pub_key,
        &transaction.signature,
    )
    .is_ok()
}

/// Like [`verify`], but reports why verification failed.
pub fn verify_signature(
    transaction: &Transaction,
    public_key_hex: &str,
    signature_hex: &str,
) -> Result<(), CryptoError> {
    let key = verifying_key_from_hex(public_key_hex)?;

    let der = hex::decode(signature_hex)
        .map_err(|e| CryptoError::InvalidSignatureEncoding(e.to_string()))?;
    let signature = Signature::from_der(&der)
        .map_err(|e| CryptoError::InvalidSignatureEncoding(e.to_string()))?;
    // Other signers do not always emit low-S signatures.
    let signature = signature.normalize_s().unwrap_or(signature);

    let message = digest(transaction);
    key.verify_prehash(message.as_bytes(), &signature)
        .map_err(|_| CryptoError::SignatureMismatch)
}

/// Compressed SEC1 public key (hex) belonging to a hex-encoded private key.
pub fn public_key_hex(private_key_hex: &str) -> Result<String, CryptoError> {
    let key = signing_key_from_hex(private_key_hex)?;
    Ok(compressed_hex(key.verifying_key()))
}

pub(crate) fn compressed_hex(key: &VerifyingKey) -> String {
    hex::encode(key.to_encoded_point(true).as_bytes())
}

pub(crate) fn signing_key_from_hex(private_key_hex: &str) -> Result<SigningKey, CryptoError> {
    let bytes =
        hex::decode(private_key_hex).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidPrivateKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
}

fn verifying_key_from_hex(public_key_hex: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes =
        hex::decode(public_key_hex).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}
