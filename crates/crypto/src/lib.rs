//! `utxo-crypto`: canonical hashing, ECDSA signing and address handling.
//!
//! Everything here is deterministic except [`Wallet::generate`].

pub mod address;
pub mod error;
pub mod hashing;
pub mod signing;
pub mod wallet;

pub use address::{
    AddressValidator, Base58CheckValidator, BitcoinAddressValidator, SegwitValidator, p2pkh_address,
};
pub use error::CryptoError;
pub use hashing::{canonical_message, digest};
pub use signing::{COMPRESSED_PUBLIC_KEY_HEX_LEN, public_key_hex, sign, verify, verify_signature};
pub use wallet::Wallet;
