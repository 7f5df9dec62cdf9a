//! Address validation and derivation.
//!
//! The ledger treats addresses as opaque strings; the only thing it asks of an
//! address is whether it is well-formed, through [`AddressValidator`].
//! [`BitcoinAddressValidator`] accepts every Bitcoin format: legacy
//! Base58Check (P2PKH, P2SH) and segwit bech32/bech32m, on any network.

use bech32::Hrp;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Version byte of mainnet pay-to-pubkey-hash addresses.
pub const P2PKH_VERSION: u8 = 0x00;
/// Version byte of mainnet pay-to-script-hash addresses.
pub const P2SH_VERSION: u8 = 0x05;
/// Version byte of testnet (and regtest) pay-to-pubkey-hash addresses.
pub const TESTNET_P2PKH_VERSION: u8 = 0x6f;
/// Version byte of testnet (and regtest) pay-to-script-hash addresses.
pub const TESTNET_P2SH_VERSION: u8 = 0xc4;

/// Pure predicate deciding whether a string is a well-formed address.
pub trait AddressValidator: Send + Sync {
    fn is_valid_address(&self, address: &str) -> bool;
}

impl<F> AddressValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid_address(&self, address: &str) -> bool {
        self(address)
    }
}

/// Base58Check validator for legacy (P2PKH / P2SH) addresses.
///
/// An address is valid when it decodes with a correct checksum to a 21-byte
/// payload whose first byte is one of the accepted version bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base58CheckValidator {
    versions: Vec<u8>,
}

impl Base58CheckValidator {
    pub fn new(versions: impl Into<Vec<u8>>) -> Self {
        Self {
            versions: versions.into(),
        }
    }

    /// Mainnet P2PKH and P2SH.
    pub fn mainnet() -> Self {
        Self::new([P2PKH_VERSION, P2SH_VERSION])
    }

    /// Testnet and regtest P2PKH and P2SH.
    pub fn testnet() -> Self {
        Self::new([TESTNET_P2PKH_VERSION, TESTNET_P2SH_VERSION])
    }

    pub fn any_network() -> Self {
        Self::new([
            P2PKH_VERSION,
            P2SH_VERSION,
            TESTNET_P2PKH_VERSION,
            TESTNET_P2SH_VERSION,
        ])
    }
}

impl Default for Base58CheckValidator {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl AddressValidator for Base58CheckValidator {
    fn is_valid_address(&self, address: &str) -> bool {
        match bs58::decode(address).with_check(None).into_vec() {
            Ok(payload) => payload.len() == 21 && self.versions.contains(&payload[0]),
            Err(_) => false,
        }
    }
}

/// Segwit validator: bech32 for witness version 0, bech32m for 1 to 16.
///
/// Checksum variant, witness version and program length are all checked by
/// the decoder; the human-readable part must be one of the accepted ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegwitValidator {
    hrps: Vec<Hrp>,
}

impl SegwitValidator {
    pub fn new(hrps: impl Into<Vec<Hrp>>) -> Self {
        Self { hrps: hrps.into() }
    }

    /// `bc1...`
    pub fn mainnet() -> Self {
        Self::new([bech32::hrp::BC])
    }

    /// `tb1...` and regtest `bcrt1...`
    pub fn testnet() -> Self {
        Self::new([bech32::hrp::TB, bech32::hrp::BCRT])
    }

    pub fn any_network() -> Self {
        Self::new([bech32::hrp::BC, bech32::hrp::TB, bech32::hrp::BCRT])
    }
}

impl AddressValidator for SegwitValidator {
    fn is_valid_address(&self, address: &str) -> bool {
        match bech32::segwit::decode(address) {
            Ok((hrp, _version, _program)) => self.hrps.contains(&hrp),
            Err(_) => false,
        }
    }
}

/// Legacy or segwit: valid if either format accepts the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinAddressValidator {
    legacy: Base58CheckValidator,
    segwit: SegwitValidator,
}

impl BitcoinAddressValidator {
    pub fn new(legacy: Base58CheckValidator, segwit: SegwitValidator) -> Self {
        Self { legacy, segwit }
    }

    pub fn mainnet() -> Self {
        Self::new(Base58CheckValidator::mainnet(), SegwitValidator::mainnet())
    }

    pub fn testnet() -> Self {
        Self::new(Base58CheckValidator::testnet(), SegwitValidator::testnet())
    }

    pub fn any_network() -> Self {
        Self::new(
            Base58CheckValidator::any_network(),
            SegwitValidator::any_network(),
        )
    }
}

/// Any network, any format.
impl Default for BitcoinAddressValidator {
    fn default() -> Self {
        Self::any_network()
    }
}

impl AddressValidator for BitcoinAddressValidator {
    fn is_valid_address(&self, address: &str) -> bool {
        self.legacy.is_valid_address(address) || self.segwit.is_valid_address(address)
    }
}

/// P2PKH address of a SEC1-encoded public key: `base58check(version || ripemd160(sha256(key)))`.
pub fn p2pkh_address(public_key: &[u8], version: u8) -> String {
    let hash = Ripemd160::digest(Sha256::digest(public_key));
    bs58::encode(hash).with_check_version(version).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATOR_COMPRESSED: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn derives_the_known_address_of_private_key_one() {
        let key = hex::decode(GENERATOR_COMPRESSED).unwrap();
        assert_eq!(
            p2pkh_address(&key, P2PKH_VERSION),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
    }

    #[test]
    fn accepts_mainnet_p2pkh_and_p2sh() {
        let validator = Base58CheckValidator::mainnet();
        assert!(validator.is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"));
        assert!(validator.is_valid_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"));
    }

    #[test]
    fn rejects_bad_checksums_and_garbage() {
        let validator = Base58CheckValidator::mainnet();
        assert!(!validator.is_valid_address(""));
        assert!(!validator.is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN3"));
        assert!(!validator.is_valid_address("not an address"));
        assert!(!validator.is_valid_address("0OIl"));
    }

    #[test]
    fn rejects_unaccepted_versions() {
        let p2pkh_only = Base58CheckValidator::new([P2PKH_VERSION]);
        assert!(p2pkh_only.is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"));
        assert!(!p2pkh_only.is_valid_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"));
    }

    #[test]
    fn accepts_testnet_base58_versions() {
        let testnet = Base58CheckValidator::testnet();
        assert!(testnet.is_valid_address("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"));
        assert!(testnet.is_valid_address("2MzQwSSnBHWHqSAqtTVQ6v47XtaisrJa1Vc"));
        assert!(!testnet.is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"));
        assert!(!Base58CheckValidator::mainnet().is_valid_address("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"));
    }

    #[test]
    fn accepts_segwit_v0_and_taproot() {
        let mainnet = SegwitValidator::mainnet();
        assert!(mainnet.is_valid_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
        assert!(mainnet.is_valid_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
        assert!(mainnet.is_valid_address("BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4"));
        assert!(mainnet.is_valid_address(
            "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0"
        ));
        assert!(!mainnet.is_valid_address("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));
        assert!(SegwitValidator::testnet().is_valid_address("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));
    }

    #[test]
    fn rejects_broken_segwit_addresses() {
        let segwit = SegwitValidator::any_network();
        // checksum
        assert!(!segwit.is_valid_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5"));
        // mixed case
        assert!(!segwit.is_valid_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kV8f3t4"));
        // unknown human-readable part
        assert!(!segwit.is_valid_address("ltc1qw508d6qejxtdg4y5r3zarvary0c5xw7kgmn4n9"));
        assert!(!segwit.is_valid_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"));
        assert!(!segwit.is_valid_address(""));
    }

    #[test]
    fn bitcoin_validator_accepts_every_format_on_any_network() {
        let any = BitcoinAddressValidator::default();
        for address in [
            "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2",
            "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
            "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn",
            "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
            "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
            "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0",
        ] {
            assert!(any.is_valid_address(address), "{address}");
        }
        assert!(!any.is_valid_address("not an address"));

        let mainnet = BitcoinAddressValidator::mainnet();
        assert!(mainnet.is_valid_address("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
        assert!(!mainnet.is_valid_address("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"));
    }

    #[test]
    fn closures_are_validators() {
        let non_empty = |a: &str| !a.is_empty();
        assert!(non_empty.is_valid_address("anything"));
        assert!(!non_empty.is_valid_address(""));
    }
}
