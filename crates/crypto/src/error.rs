use thiserror::Error;

/// Failure while handling keys, producing signatures or checking them.
///
/// [`crate::verify`] folds every one of these into `false`; use
/// [`crate::verify_signature`] to see which check failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("signature does not match digest and public key")]
    SignatureMismatch,

    #[error("signing failed: {0}")]
    Signing(String),
}
