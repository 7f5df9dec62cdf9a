//! Minimal wallet collaborator: a secp256k1 keypair and its P2PKH address.
//!
//! Mnemonic/HD derivation is not provided; a wallet is either freshly random or
//! rebuilt from a raw private key.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use serde::Serialize;

use utxo_core::{Address, Transaction};

use crate::address::{P2PKH_VERSION, p2pkh_address};
use crate::error::CryptoError;
use crate::signing::{compressed_hex, sign, signing_key_from_hex};

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: Address,
    /// Compressed public key, hex (66 chars).
    pub public_key: String,
    /// Raw 32-byte private key, hex (64 chars).
    pub private_key: String,
}

impl Wallet {
    pub fn generate() -> Self {
        Self::from_signing_key(&SigningKey::random(&mut OsRng))
    }

    pub fn from_private_key(private_key_hex: &str) -> Result<Self, CryptoError> {
        let key = signing_key_from_hex(private_key_hex)?;
        Ok(Self::from_signing_key(&key))
    }

    fn from_signing_key(key: &SigningKey) -> Self {
        let public_key = compressed_hex(key.verifying_key());
        let public_bytes = key.verifying_key().to_encoded_point(true);

        Self {
            address: Address::new(p2pkh_address(public_bytes.as_bytes(), P2PKH_VERSION)),
            public_key,
            private_key: hex::encode(key.to_bytes()),
        }
    }

    /// Sign a transaction with this wallet's key.
    pub fn sign(&self, transaction: &Transaction) -> Result<String, CryptoError> {
        sign(transaction, &self.private_key)
    }
}

impl core::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
