//! FHE engine boundary for sealed-bid auctions.
//!
//! The auction state machine never sees a plaintext bid. It talks to an FHE
//! engine through the [`FheEngine`] trait:
//!
//! 1. **Input import**: a bidder encrypts an amount for one contract and one
//!    sender and attaches a proof. The engine verifies the proof and hands the
//!    contract an encrypted value.
//!
//! 2. **Computation**: `lt` and `select` run on ciphertexts and produce new
//!    ciphertext handles. Conditions are never decrypted.
//!
//! 3. **Access control**: every handle carries an ACL. Contracts compute only on
//!    handles they are allowed on and may extend access to other identities.
//!
//! 4. **User decryption**: happens out of band, directly between an allowed
//!    identity and the engine, never through the contract. Requests are signed
//!    by the identity's wallet and results come back sealed to a key only the
//!    requester holds.
//!
//! [`LocalCoprocessor`] is an in-process engine used for development and tests.

pub mod coprocessor;
pub mod decrypt;
pub mod engine;
pub mod error;
pub mod input;

pub use coprocessor::LocalCoprocessor;
pub use decrypt::{SealedValue, UserDecryptRequest, UserDecryptor, MAX_DURATION_DAYS};
pub use engine::FheEngine;
pub use error::FheError;
pub use input::{EncryptedInput, EncryptedInputBuilder};
