//! The FHE engine boundary consumed by the auction state machine.
//!
//! Everything behind this trait is a black box to the auction: encrypted-input
//! verification, homomorphic comparison and selection, and the access-control
//! list that gates who may use or decrypt a ciphertext.
//!
//! Access rules mirror a coprocessor-backed FHE chain:
//! - A contract may only compute on handles it is allowed on.
//! - Every handle an operation produces is allowed to the computing contract
//!   until the end of the current transaction. Use [`FheEngine::allow`] with
//!   the contract itself as the grantee to keep access across transactions.
//! - A contract may only extend access to handles it is allowed on.

use auction_types::{Address, CipherHandle, Eaddress, Ebool, Euint64, ExternalEuint64, InputProof};

use crate::error::FheError;

/// Homomorphic operations and ACL management.
pub trait FheEngine {
    /// Verify a client-encrypted 64-bit input and import it for `contract`.
    ///
    /// The proof must bind the handle to exactly this `contract` and `user`.
    fn import_u64(
        &mut self,
        contract: &Address,
        user: &Address,
        input: ExternalEuint64,
        proof: &InputProof,
    ) -> Result<Euint64, FheError>;

    /// Encrypt a public 64-bit constant.
    fn trivial_u64(&mut self, contract: &Address, value: u64) -> Euint64;

    /// Encrypt a public identity.
    fn trivial_address(&mut self, contract: &Address, value: Address) -> Eaddress;

    /// Encrypted `lhs < rhs`.
    fn lt(&mut self, contract: &Address, lhs: Euint64, rhs: Euint64) -> Result<Ebool, FheError>;

    /// Encrypted `if cond { if_true } else { if_false }`.
    fn select_u64(
        &mut self,
        contract: &Address,
        cond: Ebool,
        if_true: Euint64,
        if_false: Euint64,
    ) -> Result<Euint64, FheError>;

    /// Encrypted `if cond { if_true } else { if_false }` over identities.
    fn select_address(
        &mut self,
        contract: &Address,
        cond: Ebool,
        if_true: Eaddress,
        if_false: Eaddress,
    ) -> Result<Eaddress, FheError>;

    /// Persistently allow `grantee` to use and request decryption of `handle`.
    ///
    /// Granting an identity that is already allowed is a no-op.
    fn allow(
        &mut self,
        contract: &Address,
        handle: CipherHandle,
        grantee: &Address,
    ) -> Result<(), FheError>;

    /// Whether `identity` holds a persistent grant on `handle`.
    fn is_allowed(&self, handle: CipherHandle, identity: &Address) -> bool;

    /// Drop per-transaction allowances. Called by the ledger on commit.
    fn end_transaction(&mut self) {}
}
