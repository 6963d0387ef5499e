//! Core type definitions for FHE sealed-bid auctions.
//!
//! This crate provides the shared data structures used across the auction system:
//! identities, typed ciphertext handles, encrypted-input proofs, the public
//! auction snapshot and the event log entries.
//!
//! Nothing in here carries a plaintext bid amount. Ciphertext handles are opaque
//! 32-byte references into the FHE engine and are safe to hand to anyone.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

// =========================
// IDENTITIES
// =========================

/// Account / contract identity (20 bytes, EVM-style).
pub type Address = [u8; 20];

/// The all-zero identity. Used as the encrypted "no leader yet" sentinel.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Parse a hex identity, with or without a `0x` prefix.
pub fn parse_address(s: &str) -> Option<Address> {
    let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
    bytes.try_into().ok()
}

/// Format an identity as `0x`-prefixed hex.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Derive the address of a contract instance from its deployer and nonce.
pub fn derive_contract_address(deployer: &Address, nonce: u64) -> Address {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"SEALED_AUCTION_ADDRESS_V1:");
    hasher.update(deployer);
    hasher.update(nonce.to_le_bytes());
    let digest: [u8; 32] = hasher.finalize().into();

    let mut address = ZERO_ADDRESS;
    address.copy_from_slice(&digest[12..]);
    address
}

/// Derive the identity controlled by a wallet verifying key.
pub fn derive_identity(public_key: &[u8; 32]) -> Address {
    use sha2::{Digest, Sha256};
    let digest: [u8; 32] = Sha256::new()
        .chain_update(b"SEALED_AUCTION_IDENTITY_V1:")
        .chain_update(public_key)
        .finalize()
        .into();

    let mut address = ZERO_ADDRESS;
    address.copy_from_slice(&digest[12..]);
    address
}

// =========================
// CIPHERTEXT HANDLES
// =========================

/// Encrypted value types understood by the FHE engine.
///
/// The discriminants are the type tags stored in the last byte of every handle.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum FheType {
    Bool = 0,
    Uint64 = 5,
    Address = 7,
}

impl FheType {
    /// Decode a handle type tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Bool),
            5 => Some(Self::Uint64),
            7 => Some(Self::Address),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Opaque reference to a ciphertext held by the FHE engine.
#[serde_as]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct CipherHandle(#[serde_as(as = "Hex")] pub [u8; 32]);

impl CipherHandle {
    /// Type of the value behind this handle, if the tag is known.
    pub fn fhe_type(&self) -> Option<FheType> {
        FheType::from_tag(self.0[31])
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
        bytes.try_into().ok().map(Self)
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident => $ty:expr) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            PartialEq,
            Eq,
            Hash,
            BorshSerialize,
            BorshDeserialize,
            Serialize,
            Deserialize,
        )]
        pub struct $name(pub CipherHandle);

        impl $name {
            pub const FHE_TYPE: FheType = $ty;

            pub fn handle(&self) -> CipherHandle {
                self.0
            }
        }

        impl From<$name> for CipherHandle {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

typed_handle!(
    /// Encrypted boolean.
    Ebool => FheType::Bool
);
typed_handle!(
    /// Encrypted 64-bit unsigned integer.
    Euint64 => FheType::Uint64
);
typed_handle!(
    /// Encrypted identity.
    Eaddress => FheType::Address
);
typed_handle!(
    /// Client-supplied 64-bit input handle, not yet verified by the engine.
    ExternalEuint64 => FheType::Uint64
);

/// Proof that a batch of external input handles is well formed and was
/// encrypted for one specific (contract, user) pair.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct InputProof(#[serde_as(as = "Hex")] pub Vec<u8>);

/// Plaintext recovered through an authorized user decryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum ClearValue {
    Bool(bool),
    Uint64(u64),
    Address(Address),
}

impl ClearValue {
    pub fn fhe_type(&self) -> FheType {
        match self {
            ClearValue::Bool(_) => FheType::Bool,
            ClearValue::Uint64(_) => FheType::Uint64,
            ClearValue::Address(_) => FheType::Address,
        }
    }
}

// =========================
// AUCTION TYPES
// =========================

/// Auction lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Accepting bids until `end_time`
    Bidding,
    /// Finalized; results may be revealed to authorized viewers
    Ended,
}

/// What `place_bid` hands back to the bidder.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BidFeedback {
    /// Nothing is returned; bidders learn nothing until results are shared.
    #[default]
    Sealed,
    /// The encrypted "this bid took the lead" flag, decryptable by the bidder only.
    LeadingSignal,
}

/// Public view of an auction. Never carries ciphertext contents.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionSnapshot {
    pub is_bidding: bool,
    pub is_ended: bool,
    pub end_time: u64,
    pub bid_count: u64,
}

/// Events appended to the ledger log.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionEvent {
    BidPlaced { bidder: Address },
    Finalized { seller: Address },
}

impl AuctionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuctionEvent::BidPlaced { .. } => "BidPlaced",
            AuctionEvent::Finalized { .. } => "Finalized",
        }
    }
}
