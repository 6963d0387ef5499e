//! In-process FHE coprocessor.
//!
//! `LocalCoprocessor` stands in for the off-chain coprocessor network of an FHE
//! chain. It keeps the value behind every handle in its own store, evaluates
//! operations on request and enforces the ACL exactly as the auction sees it
//! through [`FheEngine`]. Values never leave the store except through an
//! authorized [`LocalCoprocessor::user_decrypt`].

use std::collections::{BTreeSet, HashMap, HashSet};

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

use auction_types::{
    Address, CipherHandle, ClearValue, Eaddress, Ebool, Euint64, ExternalEuint64, FheType,
    InputProof,
};

use crate::engine::FheEngine;
use crate::error::FheError;
use crate::input::{
    binding_tag, derive_input_key, input_handle, open_entry, EncryptedInputBuilder, ProofPayload,
};

/// Simulated coprocessor with a plaintext-backed ciphertext store.
#[derive(Clone)]
pub struct LocalCoprocessor {
    network_key: [u8; 32],
    values: HashMap<CipherHandle, ClearValue>,
    acl: HashMap<CipherHandle, BTreeSet<Address>>,
    transient: HashSet<(CipherHandle, Address)>,
    nonce: u64,
}

impl std::fmt::Debug for LocalCoprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCoprocessor")
            .field("ciphertexts", &self.values.len())
            .field("acl_entries", &self.acl.len())
            .finish_non_exhaustive()
    }
}

impl LocalCoprocessor {
    /// Create a coprocessor with a fixed network key.
    pub fn new(network_key: [u8; 32]) -> Self {
        Self {
            network_key,
            values: HashMap::new(),
            acl: HashMap::new(),
            transient: HashSet::new(),
            nonce: 0,
        }
    }

    /// Create a coprocessor with a fresh random network key.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut network_key = [0u8; 32];
        rng.fill_bytes(&mut network_key);
        Self::new(network_key)
    }

    /// Start an encrypted input batch for `user` calling `contract`.
    pub fn create_encrypted_input(
        &self,
        contract: &Address,
        user: &Address,
    ) -> Result<EncryptedInputBuilder, FheError> {
        let key = derive_input_key(&self.network_key, contract, user)?;
        Ok(EncryptedInputBuilder::new(key, *contract, *user))
    }

    /// Number of ciphertexts held.
    pub fn ciphertext_count(&self) -> usize {
        self.values.len()
    }

    /// Identities holding a persistent grant on `handle`.
    pub fn allowed_identities(&self, handle: CipherHandle) -> Vec<Address> {
        self.acl
            .get(&handle)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn value(&self, handle: CipherHandle) -> Result<&ClearValue, FheError> {
        self.values
            .get(&handle)
            .ok_or_else(|| FheError::UnknownHandle(handle.to_hex()))
    }

    fn can_use(&self, handle: CipherHandle, identity: &Address) -> bool {
        self.is_allowed(handle, identity) || self.transient.contains(&(handle, *identity))
    }

    fn require_use(&self, handle: CipherHandle, contract: &Address) -> Result<(), FheError> {
        self.value(handle)?;
        if self.can_use(handle, contract) {
            Ok(())
        } else {
            Err(FheError::AccessDenied {
                handle: handle.to_hex(),
                identity: hex::encode(contract),
            })
        }
    }

    fn operand_u64(&self, contract: &Address, operand: Euint64) -> Result<u64, FheError> {
        self.require_use(operand.0, contract)?;
        match self.value(operand.0)? {
            ClearValue::Uint64(v) => Ok(*v),
            other => Err(FheError::TypeMismatch {
                expected: FheType::Uint64,
                got: other.fhe_type(),
            }),
        }
    }

    fn operand_bool(&self, contract: &Address, operand: Ebool) -> Result<bool, FheError> {
        self.require_use(operand.0, contract)?;
        match self.value(operand.0)? {
            ClearValue::Bool(v) => Ok(*v),
            other => Err(FheError::TypeMismatch {
                expected: FheType::Bool,
                got: other.fhe_type(),
            }),
        }
    }

    fn operand_address(&self, contract: &Address, operand: Eaddress) -> Result<Address, FheError> {
        self.require_use(operand.0, contract)?;
        match self.value(operand.0)? {
            ClearValue::Address(v) => Ok(*v),
            other => Err(FheError::TypeMismatch {
                expected: FheType::Address,
                got: other.fhe_type(),
            }),
        }
    }

    /// Store a computed value under a fresh handle owned by `contract` for this transaction.
    fn store(
        &mut self,
        contract: &Address,
        op: &[u8],
        operands: &[CipherHandle],
        value: ClearValue,
    ) -> CipherHandle {
        self.nonce += 1;

        let mut hasher = Sha256::new();
        hasher.update(b"FHE_COMPUTED_HANDLE_V1:");
        hasher.update(op);
        for operand in operands {
            hasher.update(operand.0);
        }
        hasher.update(contract);
        hasher.update(self.nonce.to_le_bytes());
        let mut raw: [u8; 32] = hasher.finalize().into();
        raw[31] = value.fhe_type().tag();

        let handle = CipherHandle(raw);
        self.values.insert(handle, value);
        self.transient.insert((handle, *contract));
        handle
    }
}

impl FheEngine for LocalCoprocessor {
    fn import_u64(
        &mut self,
        contract: &Address,
        user: &Address,
        input: ExternalEuint64,
        proof: &InputProof,
    ) -> Result<Euint64, FheError> {
        let payload = ProofPayload::decode(proof)?;
        if payload.contract != *contract || payload.user != *user {
            return Err(FheError::ProofBindingMismatch);
        }

        let key = derive_input_key(&self.network_key, contract, user)?;
        if binding_tag(&key, contract, user, &payload.handles()) != payload.binding {
            return Err(FheError::ProofBindingMismatch);
        }

        let (index, entry) = payload
            .entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.handle == input.0)
            .ok_or_else(|| FheError::HandleNotInProof(input.0.to_hex()))?;

        let value = open_entry(&key, entry)?;
        if input_handle(&entry.ciphertext, &entry.nonce, index, value.fhe_type()) != entry.handle {
            return Err(FheError::MalformedProof("handle does not match sealed value".into()));
        }
        if value.fhe_type() != FheType::Uint64 {
            return Err(FheError::TypeMismatch {
                expected: FheType::Uint64,
                got: value.fhe_type(),
            });
        }

        self.values.insert(input.0, value);
        self.transient.insert((input.0, *contract));

        debug!(
            handle = input.0.to_hex(),
            contract = hex::encode(contract),
            user = hex::encode(user),
            "Imported encrypted input"
        );
        Ok(Euint64(input.0))
    }

    fn trivial_u64(&mut self, contract: &Address, value: u64) -> Euint64 {
        let handle = self.store(contract, b"trivial_u64", &[], ClearValue::Uint64(value));
        Euint64(handle)
    }

    fn trivial_address(&mut self, contract: &Address, value: Address) -> Eaddress {
        let handle = self.store(contract, b"trivial_address", &[], ClearValue::Address(value));
        Eaddress(handle)
    }

    fn lt(&mut self, contract: &Address, lhs: Euint64, rhs: Euint64) -> Result<Ebool, FheError> {
        let a = self.operand_u64(contract, lhs)?;
        let b = self.operand_u64(contract, rhs)?;
        let handle = self.store(contract, b"lt", &[lhs.0, rhs.0], ClearValue::Bool(a < b));
        Ok(Ebool(handle))
    }

    fn select_u64(
        &mut self,
        contract: &Address,
        cond: Ebool,
        if_true: Euint64,
        if_false: Euint64,
    ) -> Result<Euint64, FheError> {
        let c = self.operand_bool(contract, cond)?;
        let t = self.operand_u64(contract, if_true)?;
        let f = self.operand_u64(contract, if_false)?;
        let value = ClearValue::Uint64(if c { t } else { f });
        let handle = self.store(contract, b"select", &[cond.0, if_true.0, if_false.0], value);
        Ok(Euint64(handle))
    }

    fn select_address(
        &mut self,
        contract: &Address,
        cond: Ebool,
        if_true: Eaddress,
        if_false: Eaddress,
    ) -> Result<Eaddress, FheError> {
        let c = self.operand_bool(contract, cond)?;
        let t = self.operand_address(contract, if_true)?;
        let f = self.operand_address(contract, if_false)?;
        let value = ClearValue::Address(if c { t } else { f });
        let handle = self.store(contract, b"select", &[cond.0, if_true.0, if_false.0], value);
        Ok(Eaddress(handle))
    }

    fn allow(
        &mut self,
        contract: &Address,
        handle: CipherHandle,
        grantee: &Address,
    ) -> Result<(), FheError> {
        self.require_use(handle, contract)?;
        if self.acl.entry(handle).or_default().insert(*grantee) {
            debug!(
                handle = handle.to_hex(),
                grantee = hex::encode(grantee),
                "ACL grant"
            );
        }
        Ok(())
    }

    fn is_allowed(&self, handle: CipherHandle, identity: &Address) -> bool {
        self.acl
            .get(&handle)
            .map(|set| set.contains(identity))
            .unwrap_or(false)
    }

    fn end_transaction(&mut self) {
        self.transient.clear();
        // Intermediates nobody was allowed on are unreachable from now on
        let acl = &self.acl;
        let before = self.values.len();
        self.values.retain(|handle, _| acl.contains_key(handle));
        debug!(pruned = before - self.values.len(), "Transaction closed");
    }
}
