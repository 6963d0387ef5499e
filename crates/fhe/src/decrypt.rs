//! Out-of-band user decryption.
//!
//! An identity on a handle's ACL asks the coprocessor directly for the
//! plaintext, the way a wallet signs a decryption permit:
//!
//! 1. The client generates an X25519 reencryption keypair.
//! 2. The wallet signs `(reencryption key, contract, start, duration)` with its
//!    Ed25519 key. The requesting identity is derived from that key.
//! 3. The coprocessor checks the permit and the ACL, then seals the plaintext
//!    to the reencryption key: ephemeral X25519, HKDF-SHA256, AES-256-GCM.
//! 4. Only the holder of the reencryption secret can open the result.
//!
//! A permit is accepted when:
//! - `start_timestamp <= now < start_timestamp + duration_days * 86400`
//! - `1 <= duration_days <= MAX_DURATION_DAYS`
//! - the signature verifies under `wallet_key` and `user` is derived from it
//! - both the user and the contract hold a persistent grant on the handle

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::Sha256;
use tracing::{debug, warn};
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};

use auction_types::{derive_identity, Address, CipherHandle, ClearValue, FheType};

use crate::coprocessor::LocalCoprocessor;
use crate::engine::FheEngine;
use crate::error::FheError;

/// Longest validity a decryption request may ask for.
pub const MAX_DURATION_DAYS: u32 = 365;

const SECONDS_PER_DAY: u64 = 86_400;

/// A signed request to decrypt ciphertexts of one contract.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct UserDecryptRequest {
    pub user: Address,
    pub contract: Address,
    pub start_timestamp: u64,
    pub duration_days: u32,
    /// X25519 key the result is sealed to
    #[serde_as(as = "Hex")]
    pub reencryption_key: [u8; 32],
    /// Ed25519 verifying key `user` is derived from
    #[serde_as(as = "Hex")]
    pub wallet_key: [u8; 32],
    #[serde_as(as = "Hex")]
    pub signature: [u8; 64],
}

impl UserDecryptRequest {
    /// Sign a permit with `wallet` for results sealed to `reencryption_key`.
    pub fn sign(
        wallet: &SigningKey,
        contract: Address,
        start_timestamp: u64,
        duration_days: u32,
        reencryption_key: [u8; 32],
    ) -> Self {
        let wallet_key = wallet.verifying_key().to_bytes();
        let message = permit_message(&contract, start_timestamp, duration_days, &reencryption_key);
        Self {
            user: derive_identity(&wallet_key),
            contract,
            start_timestamp,
            duration_days,
            reencryption_key,
            wallet_key,
            signature: wallet.sign(&message).to_bytes(),
        }
    }

    /// Check the request is well formed and valid at `now`.
    pub fn validate(&self, now: u64) -> Result<(), FheError> {
        if self.duration_days == 0 || self.duration_days > MAX_DURATION_DAYS {
            return Err(FheError::InvalidRequest(format!(
                "duration must be 1..={} days",
                MAX_DURATION_DAYS
            )));
        }
        if self.user == self.contract {
            return Err(FheError::InvalidRequest(
                "user and contract must differ".into(),
            ));
        }
        if now < self.start_timestamp {
            return Err(FheError::RequestNotYetValid);
        }
        let expiry = self
            .start_timestamp
            .saturating_add(u64::from(self.duration_days) * SECONDS_PER_DAY);
        if now >= expiry {
            return Err(FheError::RequestExpired);
        }
        Ok(())
    }

    /// Check the permit was signed by the wallet that controls `user`.
    pub fn verify_signature(&self) -> Result<(), FheError> {
        if derive_identity(&self.wallet_key) != self.user {
            return Err(FheError::InvalidSignature);
        }
        let key =
            VerifyingKey::from_bytes(&self.wallet_key).map_err(|_| FheError::InvalidSignature)?;
        let message = permit_message(
            &self.contract,
            self.start_timestamp,
            self.duration_days,
            &self.reencryption_key,
        );
        key.verify_strict(&message, &Signature::from_bytes(&self.signature))
            .map_err(|_| FheError::InvalidSignature)
    }
}

fn permit_message(
    contract: &Address,
    start_timestamp: u64,
    duration_days: u32,
    reencryption_key: &[u8; 32],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(96);
    message.extend_from_slice(b"FHE_USER_DECRYPT_V1:");
    message.extend_from_slice(reencryption_key);
    message.extend_from_slice(contract);
    message.extend_from_slice(&start_timestamp.to_le_bytes());
    message.extend_from_slice(&duration_days.to_le_bytes());
    message
}

/// A plaintext sealed to a requester's reencryption key.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SealedValue {
    /// Coprocessor's one-time X25519 key
    #[serde_as(as = "Hex")]
    pub ephemeral_key: [u8; 32],
    #[serde_as(as = "Hex")]
    pub nonce: [u8; 12],
    #[serde_as(as = "Hex")]
    pub ciphertext: Vec<u8>,
}

/// Cipher for one sealed result, keyed by the exchange and bound to `handle`.
fn reencryption_cipher(
    shared: &SharedSecret,
    handle: CipherHandle,
    ephemeral_key: &[u8; 32],
) -> Result<Aes256Gcm, FheError> {
    if !shared.was_contributory() {
        return Err(FheError::InvalidRequest("low-order reencryption key".into()));
    }
    let hk = Hkdf::<Sha256>::new(Some(&b"FHE-REENCRYPT-V1"[..]), shared.as_bytes());
    let mut info = Vec::with_capacity(64);
    info.extend_from_slice(&handle.0);
    info.extend_from_slice(ephemeral_key);

    let mut key = [0u8; 32];
    hk.expand(&info, &mut key)
        .map_err(|_| FheError::KeyDerivationFailed)?;
    Aes256Gcm::new_from_slice(&key).map_err(|_| FheError::KeyDerivationFailed)
}

impl LocalCoprocessor {
    /// Serve a signed decryption request for `handle`.
    ///
    /// The plaintext is only ever returned sealed to the request's
    /// reencryption key.
    pub fn user_decrypt<R: RngCore + CryptoRng>(
        &self,
        handle: CipherHandle,
        request: &UserDecryptRequest,
        now: u64,
        rng: &mut R,
    ) -> Result<SealedValue, FheError> {
        request.validate(now)?;
        request.verify_signature().inspect_err(|_| {
            warn!(
                user = hex::encode(request.user),
                "Decryption request signature rejected"
            );
        })?;
        let value = *self.value(handle)?;

        for identity in [&request.user, &request.contract] {
            if !self.is_allowed(handle, identity) {
                warn!(
                    handle = handle.to_hex(),
                    identity = hex::encode(identity),
                    "Decryption refused by ACL"
                );
                return Err(FheError::AccessDenied {
                    handle: handle.to_hex(),
                    identity: hex::encode(identity),
                });
            }
        }

        let secret = EphemeralSecret::random_from_rng(&mut *rng);
        let ephemeral_key = PublicKey::from(&secret).to_bytes();
        let shared = secret.diffie_hellman(&PublicKey::from(request.reencryption_key));
        let cipher = reencryption_cipher(&shared, handle, &ephemeral_key)?;

        let plaintext =
            borsh::to_vec(&value).map_err(|e| FheError::EncryptionFailed(e.to_string()))?;
        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
            .map_err(|e| FheError::EncryptionFailed(format!("AES-GCM encryption failed: {}", e)))?;

        debug!(
            handle = handle.to_hex(),
            user = hex::encode(request.user),
            "User decryption served"
        );
        Ok(SealedValue {
            ephemeral_key,
            nonce,
            ciphertext,
        })
    }
}

/// Wallet side of user decryption: signs permits and opens sealed results.
pub struct UserDecryptor {
    wallet: SigningKey,
    secret: StaticSecret,
}

impl std::fmt::Debug for UserDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDecryptor")
            .field("identity", &hex::encode(self.identity()))
            .finish_non_exhaustive()
    }
}

impl UserDecryptor {
    /// Pair `wallet` with a fresh reencryption keypair.
    pub fn new<R: RngCore + CryptoRng>(wallet: SigningKey, rng: &mut R) -> Self {
        Self {
            wallet,
            secret: StaticSecret::random_from_rng(rng),
        }
    }

    /// Identity controlled by the wallet.
    pub fn identity(&self) -> Address {
        derive_identity(&self.wallet.verifying_key().to_bytes())
    }

    pub fn reencryption_key(&self) -> [u8; 32] {
        PublicKey::from(&self.secret).to_bytes()
    }

    /// Sign a permit covering `contract`.
    pub fn request(
        &self,
        contract: Address,
        start_timestamp: u64,
        duration_days: u32,
    ) -> UserDecryptRequest {
        UserDecryptRequest::sign(
            &self.wallet,
            contract,
            start_timestamp,
            duration_days,
            self.reencryption_key(),
        )
    }

    /// Open a result sealed to this decryptor for `handle`.
    pub fn open(&self, handle: CipherHandle, sealed: &SealedValue) -> Result<ClearValue, FheError> {
        let shared = self
            .secret
            .diffie_hellman(&PublicKey::from(sealed.ephemeral_key));
        let cipher = reencryption_cipher(&shared, handle, &sealed.ephemeral_key)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
            .map_err(|_| FheError::AuthenticationFailed)?;
        borsh::from_slice(&plaintext).map_err(|_| FheError::AuthenticationFailed)
    }

    /// Submit `request` to `engine` and open the answer.
    pub fn decrypt<R: RngCore + CryptoRng>(
        &self,
        engine: &LocalCoprocessor,
        handle: CipherHandle,
        request: &UserDecryptRequest,
        now: u64,
        rng: &mut R,
    ) -> Result<ClearValue, FheError> {
        let sealed = engine.user_decrypt(handle, request, now, rng)?;
        self.open(handle, &sealed)
    }

    pub fn decrypt_u64<R: RngCore + CryptoRng>(
        &self,
        engine: &LocalCoprocessor,
        handle: CipherHandle,
        request: &UserDecryptRequest,
        now: u64,
        rng: &mut R,
    ) -> Result<u64, FheError> {
        match self.decrypt(engine, handle, request, now, rng)? {
            ClearValue::Uint64(v) => Ok(v),
            other => Err(FheError::TypeMismatch {
                expected: FheType::Uint64,
                got: other.fhe_type(),
            }),
        }
    }

    pub fn decrypt_bool<R: RngCore + CryptoRng>(
        &self,
        engine: &LocalCoprocessor,
        handle: CipherHandle,
        request: &UserDecryptRequest,
        now: u64,
        rng: &mut R,
    ) -> Result<bool, FheError> {
        match self.decrypt(engine, handle, request, now, rng)? {
            ClearValue::Bool(v) => Ok(v),
            other => Err(FheError::TypeMismatch {
                expected: FheType::Bool,
                got: other.fhe_type(),
            }),
        }
    }

    pub fn decrypt_address<R: RngCore + CryptoRng>(
        &self,
        engine: &LocalCoprocessor,
        handle: CipherHandle,
        request: &UserDecryptRequest,
        now: u64,
        rng: &mut R,
    ) -> Result<Address, FheError> {
        match self.decrypt(engine, handle, request, now, rng)? {
            ClearValue::Address(v) => Ok(v),
            other => Err(FheError::TypeMismatch {
                expected: FheType::Address,
                got: other.fhe_type(),
            }),
        }
    }
}
