//! Client-side encrypted inputs and their proofs.
//!
//! An input batch is built for one (contract, user) pair, the way a wallet
//! prepares `placeBid` arguments:
//!
//! 1. Derive the input key `K = HKDF(network_key, contract || user)`
//! 2. Seal each value with AES-256-GCM under `K`
//! 3. Hash each sealed value into a handle tagged with its FHE type
//! 4. Bind the handle list to (contract, user) with `SHA-256(K || ...)`
//!
//! The proof carries the sealed values and the binding. Replaying it for another
//! contract or another sender changes `K` and fails the binding check.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use borsh::{BorshDeserialize, BorshSerialize};
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use auction_types::{Address, CipherHandle, ClearValue, ExternalEuint64, FheType, InputProof};

use crate::error::FheError;

/// One sealed value inside an input proof.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct SealedEntry {
    pub handle: CipherHandle,
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

/// Decoded contents of an [`InputProof`].
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct ProofPayload {
    pub contract: Address,
    pub user: Address,
    pub entries: Vec<SealedEntry>,
    pub binding: [u8; 32],
}

impl ProofPayload {
    pub fn decode(proof: &InputProof) -> Result<Self, FheError> {
        borsh::from_slice(&proof.0).map_err(|e| FheError::MalformedProof(e.to_string()))
    }

    pub fn encode(&self) -> Result<InputProof, FheError> {
        borsh::to_vec(self)
            .map(InputProof)
            .map_err(|e| FheError::EncryptionFailed(e.to_string()))
    }

    pub fn handles(&self) -> Vec<CipherHandle> {
        self.entries.iter().map(|e| e.handle).collect()
    }
}

/// An encrypted input batch ready to be submitted with a call.
#[derive(Clone, Debug)]
pub struct EncryptedInput {
    pub handles: Vec<CipherHandle>,
    pub proof: InputProof,
}

impl EncryptedInput {
    /// The `index`-th handle as a 64-bit input, if it has that type.
    pub fn euint64(&self, index: usize) -> Option<ExternalEuint64> {
        self.handles
            .get(index)
            .filter(|h| h.fhe_type() == Some(FheType::Uint64))
            .copied()
            .map(ExternalEuint64)
    }
}

/// Builder for an [`EncryptedInput`] bound to one contract and one user.
pub struct EncryptedInputBuilder {
    key: [u8; 32],
    contract: Address,
    user: Address,
    values: Vec<ClearValue>,
}

impl std::fmt::Debug for EncryptedInputBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedInputBuilder")
            .field("contract", &hex::encode(self.contract))
            .field("user", &hex::encode(self.user))
            .field("values", &self.values.len())
            .finish_non_exhaustive()
    }
}

impl EncryptedInputBuilder {
    pub(crate) fn new(key: [u8; 32], contract: Address, user: Address) -> Self {
        Self {
            key,
            contract,
            user,
            values: Vec::new(),
        }
    }

    pub fn add_u64(&mut self, value: u64) -> &mut Self {
        self.values.push(ClearValue::Uint64(value));
        self
    }

    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.values.push(ClearValue::Bool(value));
        self
    }

    pub fn add_address(&mut self, value: Address) -> &mut Self {
        self.values.push(ClearValue::Address(value));
        self
    }

    /// Seal every added value and produce the handles and proof.
    pub fn encrypt<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<EncryptedInput, FheError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| FheError::EncryptionFailed(format!("Failed to create cipher: {}", e)))?;

        let mut entries = Vec::with_capacity(self.values.len());
        for (index, value) in self.values.iter().enumerate() {
            let plaintext =
                borsh::to_vec(value).map_err(|e| FheError::EncryptionFailed(e.to_string()))?;

            let mut nonce = [0u8; 12];
            rng.fill_bytes(&mut nonce);

            let ciphertext = cipher
                .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
                .map_err(|e| {
                    FheError::EncryptionFailed(format!("AES-GCM encryption failed: {}", e))
                })?;

            entries.push(SealedEntry {
                handle: input_handle(&ciphertext, &nonce, index, value.fhe_type()),
                nonce,
                ciphertext,
            });
        }

        let handles: Vec<CipherHandle> = entries.iter().map(|e| e.handle).collect();
        let payload = ProofPayload {
            contract: self.contract,
            user: self.user,
            binding: binding_tag(&self.key, &self.contract, &self.user, &handles),
            entries,
        };

        Ok(EncryptedInput {
            handles,
            proof: payload.encode()?,
        })
    }
}

/// Derive the symmetric key inputs for (contract, user) are sealed under.
pub(crate) fn derive_input_key(
    network_key: &[u8; 32],
    contract: &Address,
    user: &Address,
) -> Result<[u8; 32], FheError> {
    let hk = Hkdf::<Sha256>::new(Some(&b"FHE-INPUT-KEY-V1"[..]), network_key);
    let mut info = Vec::with_capacity(40);
    info.extend_from_slice(contract);
    info.extend_from_slice(user);

    let mut key = [0u8; 32];
    hk.expand(&info, &mut key)
        .map_err(|_| FheError::KeyDerivationFailed)?;
    Ok(key)
}

/// Open one sealed entry.
pub(crate) fn open_entry(key: &[u8; 32], entry: &SealedEntry) -> Result<ClearValue, FheError> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| FheError::KeyDerivationFailed)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&entry.nonce), entry.ciphertext.as_ref())
        .map_err(|_| FheError::AuthenticationFailed)?;
    borsh::from_slice(&plaintext).map_err(|e| FheError::MalformedProof(e.to_string()))
}

/// Handle of a sealed input value.
pub(crate) fn input_handle(
    ciphertext: &[u8],
    nonce: &[u8; 12],
    index: usize,
    fhe_type: FheType,
) -> CipherHandle {
    let mut hasher = Sha256::new();
    hasher.update(b"FHE_INPUT_HANDLE_V1:");
    hasher.update(ciphertext);
    hasher.update(nonce);
    hasher.update((index as u64).to_le_bytes());
    let mut raw: [u8; 32] = hasher.finalize().into();
    raw[31] = fhe_type.tag();
    CipherHandle(raw)
}

/// Tag binding a handle list to (contract, user) under the input key.
pub(crate) fn binding_tag(
    key: &[u8; 32],
    contract: &Address,
    user: &Address,
    handles: &[CipherHandle],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"FHE_INPUT_BINDING_V1:");
    hasher.update(key);
    hasher.update(contract);
    hasher.update(user);
    for handle in handles {
        hasher.update(handle.0);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    const NETWORK_KEY: [u8; 32] = [5u8; 32];

    fn builder(contract: Address, user: Address) -> EncryptedInputBuilder {
        let key = derive_input_key(&NETWORK_KEY, &contract, &user).unwrap();
        EncryptedInputBuilder::new(key, contract, user)
    }

    #[test]
    fn test_input_keys_differ_per_pair() {
        let k1 = derive_input_key(&NETWORK_KEY, &[1u8; 20], &[2u8; 20]).unwrap();
        let k2 = derive_input_key(&NETWORK_KEY, &[1u8; 20], &[3u8; 20]).unwrap();
        let k3 = derive_input_key(&NETWORK_KEY, &[4u8; 20], &[2u8; 20]).unwrap();

        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_handles_carry_type_tags() {
        let mut b = builder([1u8; 20], [2u8; 20]);
        b.add_u64(70).add_bool(true).add_address([9u8; 20]);
        let input = b.encrypt(&mut OsRng).unwrap();

        assert_eq!(input.handles.len(), 3);
        assert_eq!(input.handles[0].fhe_type(), Some(FheType::Uint64));
        assert_eq!(input.handles[1].fhe_type(), Some(FheType::Bool));
        assert_eq!(input.handles[2].fhe_type(), Some(FheType::Address));

        assert!(input.euint64(0).is_some());
        assert!(input.euint64(1).is_none());
        assert!(input.euint64(3).is_none());
    }

    #[test]
    fn test_sealed_entry_opens_under_same_key() {
        let contract = [1u8; 20];
        let user = [2u8; 20];
        let mut b = builder(contract, user);
        b.add_u64(50);
        let input = b.encrypt(&mut OsRng).unwrap();

        let payload = ProofPayload::decode(&input.proof).unwrap();
        let key = derive_input_key(&NETWORK_KEY, &contract, &user).unwrap();
        assert_eq!(open_entry(&key, &payload.entries[0]).unwrap(), ClearValue::Uint64(50));

        let other = derive_input_key(&NETWORK_KEY, &contract, &[3u8; 20]).unwrap();
        assert_eq!(
            open_entry(&other, &payload.entries[0]),
            Err(FheError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_garbage_proof_is_malformed() {
        let result = ProofPayload::decode(&InputProof(vec![1, 2, 3]));
        assert!(matches!(result, Err(FheError::MalformedProof(_))));
    }
}
