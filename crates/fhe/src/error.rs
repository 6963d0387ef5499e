//! Error types for FHE engine operations.

use auction_types::FheType;
use thiserror::Error;

/// Errors that can occur inside the FHE engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FheError {
    #[error("Malformed input proof: {0}")]
    MalformedProof(String),

    #[error("Input proof is not bound to this contract and user")]
    ProofBindingMismatch,

    #[error("Input handle {0} is not covered by the proof")]
    HandleNotInProof(String),

    #[error("Unknown ciphertext handle {0}")]
    UnknownHandle(String),

    #[error("Type mismatch. Expected: {expected:?}, Got: {got:?}")]
    TypeMismatch { expected: FheType, got: FheType },

    #[error("Access denied: {identity} is not allowed on {handle}")]
    AccessDenied { handle: String, identity: String },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Key derivation failed")]
    KeyDerivationFailed,

    #[error("Decryption request signature is invalid")]
    InvalidSignature,

    #[error("Decryption request is not valid yet")]
    RequestNotYetValid,

    #[error("Decryption request expired")]
    RequestExpired,

    #[error("Invalid decryption request: {0}")]
    InvalidRequest(String),
}
