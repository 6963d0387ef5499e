//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-serializable versions of the core auction types.
//! Identities, handles and proofs travel as `0x`-prefixed hex strings.

use auction_fhe::{EncryptedInput, SealedValue};
use auction_module::{CallOutput, LogEntry, Receipt};
use auction_types::{format_address, AuctionEvent, AuctionSnapshot, BidFeedback};
use serde::{Deserialize, Serialize};

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Parameters for deploying an auction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployAuctionParams {
    pub sender: String,
    /// Falls back to the genesis default
    pub bidding_duration: Option<u64>,
    /// "sealed" or "leading_signal"
    pub feedback: Option<BidFeedback>,
}

/// Parameters for submitting an encrypted bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidParams {
    pub sender: String,
    pub contract: String,
    /// Hex-encoded external input handle (32 bytes)
    pub handle: String,
    /// Hex-encoded input proof
    pub proof: String,
}

/// Parameters for encrypting a bid amount through the coprocessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptU64Params {
    pub contract: String,
    pub user: String,
    pub value: u64,
}

/// Encrypted input ready to be passed to `auction_placeBid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedInputRpc {
    pub handle: String,
    pub proof: String,
}

impl EncryptedInputRpc {
    pub fn from_input(input: &EncryptedInput) -> Option<Self> {
        let handle = input.handles.first()?;
        Some(Self {
            handle: handle.to_hex(),
            proof: format!("0x{}", hex::encode(&input.proof.0)),
        })
    }
}

/// Parameters for an out-of-band user decryption.
///
/// Mirrors a wallet-signed decryption permit. All byte fields are hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDecryptParams {
    pub handle: String,
    pub user: String,
    pub contract: String,
    pub start_timestamp: u64,
    pub duration_days: u32,
    /// X25519 key the result is sealed to (32 bytes)
    pub reencryption_key: String,
    /// Ed25519 verifying key of `user` (32 bytes)
    pub wallet_key: String,
    /// Ed25519 signature over the permit (64 bytes)
    pub signature: String,
}

/// Plaintext sealed to the requester's reencryption key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedValueRpc {
    pub ephemeral_key: String,
    pub nonce: String,
    pub ciphertext: String,
}

impl From<SealedValue> for SealedValueRpc {
    fn from(sealed: SealedValue) -> Self {
        Self {
            ephemeral_key: format!("0x{}", hex::encode(sealed.ephemeral_key)),
            nonce: format!("0x{}", hex::encode(sealed.nonce)),
            ciphertext: format!("0x{}", hex::encode(&sealed.ciphertext)),
        }
    }
}

/// Public auction state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionStateRpc {
    pub is_bidding: bool,
    pub is_ended: bool,
    pub end_time: u64,
    pub bid_count: u64,
}

impl From<AuctionSnapshot> for AuctionStateRpc {
    fn from(s: AuctionSnapshot) -> Self {
        Self {
            is_bidding: s.is_bidding,
            is_ended: s.is_ended,
            end_time: s.end_time,
            bid_count: s.bid_count,
        }
    }
}

/// Emitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRpc {
    pub name: String,
    /// Bidder for `BidPlaced`, seller for `Finalized`
    pub identity: String,
}

impl From<&AuctionEvent> for EventRpc {
    fn from(event: &AuctionEvent) -> Self {
        let identity = match event {
            AuctionEvent::BidPlaced { bidder } => bidder,
            AuctionEvent::Finalized { seller } => seller,
        };
        Self {
            name: event.name().to_string(),
            identity: format_address(identity),
        }
    }
}

/// Logged event with its position in the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntryRpc {
    pub contract: String,
    pub block_height: u64,
    pub timestamp: u64,
    #[serde(flatten)]
    pub event: EventRpc,
}

impl From<&LogEntry> for LogEntryRpc {
    fn from(entry: &LogEntry) -> Self {
        Self {
            contract: format_address(&entry.contract),
            block_height: entry.block_height,
            timestamp: entry.timestamp,
            event: EventRpc::from(&entry.event),
        }
    }
}

/// Receipt of a committed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRpc {
    pub block_height: u64,
    /// Encrypted "took the lead" flag, only in leading-signal auctions
    pub leading: Option<String>,
    pub newly_granted: Option<usize>,
    pub events: Vec<EventRpc>,
}

impl From<Receipt> for ReceiptRpc {
    fn from(receipt: Receipt) -> Self {
        let (leading, newly_granted) = match receipt.output {
            CallOutput::Unit => (None, None),
            CallOutput::BidPlaced { leading } => (leading.map(|h| h.handle().to_hex()), None),
            CallOutput::ViewsGranted { newly_granted } => (None, Some(newly_granted)),
        };
        Self {
            block_height: receipt.block_height,
            leading,
            newly_granted,
            events: receipt.events.iter().map(EventRpc::from).collect(),
        }
    }
}
