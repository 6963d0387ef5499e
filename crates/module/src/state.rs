//! On-chain state structures for the auction module.

use auction_types::{
    Address, AuctionEvent, AuctionSnapshot, AuctionStatus, BidFeedback, Eaddress, Euint64,
};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One deployed sealed-bid auction.
///
/// `highest_bid` and `winner` always refer to ciphertexts the auction itself is
/// allowed on. Their plaintexts are never held here.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SealedAuction {
    /// Identity of this auction contract
    pub address: Address,
    /// Deployer; the only identity that may grant result access
    pub seller: Address,
    /// Bids are accepted while `now < end_time`
    pub end_time: u64,
    /// Number of accepted bids
    pub bid_count: u64,
    /// Encrypted running maximum
    pub highest_bid: Euint64,
    /// Encrypted identity holding `highest_bid`
    pub winner: Eaddress,
    /// Set once by finalize
    pub ended: bool,
    pub feedback: BidFeedback,
    /// Distinct bidders in first-bid order
    bidders: Vec<Address>,
    /// Identities granted result access after the auction ended
    view_permissions: BTreeSet<Address>,
}

impl SealedAuction {
    pub fn new(
        address: Address,
        seller: Address,
        end_time: u64,
        highest_bid: Euint64,
        winner: Eaddress,
        feedback: BidFeedback,
    ) -> Self {
        Self {
            address,
            seller,
            end_time,
            bid_count: 0,
            highest_bid,
            winner,
            ended: false,
            feedback,
            bidders: Vec::new(),
            view_permissions: BTreeSet::new(),
        }
    }

    pub fn status(&self) -> AuctionStatus {
        if self.ended {
            AuctionStatus::Ended
        } else {
            AuctionStatus::Bidding
        }
    }

    /// Whether a bid submitted at `now` would be inside the bidding window.
    pub fn is_bidding(&self, now: u64) -> bool {
        !self.ended && now < self.end_time
    }

    pub fn is_seller(&self, identity: &Address) -> bool {
        self.seller == *identity
    }

    /// Whether `identity` may view results once the auction has ended.
    ///
    /// The seller always can; anyone else only after an explicit grant.
    pub fn can_view_after_end(&self, identity: &Address) -> bool {
        self.is_seller(identity) || self.view_permissions.contains(identity)
    }

    pub fn bidders(&self) -> &[Address] {
        &self.bidders
    }

    pub fn view_permissions(&self) -> impl Iterator<Item = &Address> {
        self.view_permissions.iter()
    }

    /// Add `bidder` to the registry unless already present.
    pub(crate) fn record_bidder(&mut self, bidder: Address) {
        if !self.bidders.contains(&bidder) {
            self.bidders.push(bidder);
        }
    }

    /// Returns `true` if `viewer` was not already permitted.
    pub(crate) fn add_view_permission(&mut self, viewer: Address) -> bool {
        self.view_permissions.insert(viewer)
    }

    pub fn snapshot(&self, now: u64) -> AuctionSnapshot {
        AuctionSnapshot {
            is_bidding: self.is_bidding(now),
            is_ended: self.ended,
            end_time: self.end_time,
            bid_count: self.bid_count,
        }
    }
}

/// A committed event together with where it was emitted.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct LogEntry {
    pub contract: Address,
    pub block_height: u64,
    pub timestamp: u64,
    pub event: AuctionEvent,
}

/// Auction module state.
///
/// Holds every deployed auction plus the append-only event log. In-memory
/// representation for development.
#[derive(Clone, Debug, Default)]
pub struct AuctionState {
    /// All auctions by contract address
    pub auctions: HashMap<Address, SealedAuction>,

    /// Deploy count per deployer, used to derive contract addresses
    pub deploy_nonces: HashMap<Address, u64>,

    /// Committed events in emission order
    pub log: Vec<LogEntry>,
}

impl AuctionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the next deploy nonce for `deployer` and increment.
    pub fn allocate_nonce(&mut self, deployer: &Address) -> u64 {
        let nonce = self.deploy_nonces.entry(*deployer).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }

    pub fn get_auction(&self, address: &Address) -> Option<&SealedAuction> {
        self.auctions.get(address)
    }

    /// Events emitted by one contract, oldest first.
    pub fn events_for(&self, contract: &Address) -> impl Iterator<Item = &LogEntry> {
        let contract = *contract;
        self.log.iter().filter(move |entry| entry.contract == contract)
    }

    /// Distinct bidders reconstructed from `BidPlaced` events.
    pub fn bidders_from_events(&self, contract: &Address) -> Vec<Address> {
        let mut bidders = Vec::new();
        for entry in self.events_for(contract) {
            if let AuctionEvent::BidPlaced { bidder } = entry.event {
                if !bidders.contains(&bidder) {
                    bidders.push(bidder);
                }
            }
        }
        bidders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::CipherHandle;

    const SELLER: Address = [0x5eu8; 20];
    const ALICE: Address = [0xa1u8; 20];
    const BOB: Address = [0xb0u8; 20];

    fn auction() -> SealedAuction {
        SealedAuction::new(
            [0xc0u8; 20],
            SELLER,
            100,
            Euint64(CipherHandle::default()),
            Eaddress(CipherHandle::default()),
            BidFeedback::Sealed,
        )
    }

    #[test]
    fn test_bidding_window() {
        let mut auction = auction();
        assert!(auction.is_bidding(99));
        assert!(!auction.is_bidding(100));
        assert_eq!(auction.status(), AuctionStatus::Bidding);

        auction.ended = true;
        assert!(!auction.is_bidding(0));
        assert_eq!(auction.status(), AuctionStatus::Ended);
    }

    #[test]
    fn test_bidder_registry_dedups() {
        let mut auction = auction();
        auction.record_bidder(ALICE);
        auction.record_bidder(BOB);
        auction.record_bidder(ALICE);
        assert_eq!(auction.bidders(), &[ALICE, BOB]);
    }

    #[test]
    fn test_view_permissions() {
        let mut auction = auction();
        assert!(auction.can_view_after_end(&SELLER));
        assert!(!auction.can_view_after_end(&ALICE));

        assert!(auction.add_view_permission(ALICE));
        assert!(!auction.add_view_permission(ALICE));
        assert!(auction.can_view_after_end(&ALICE));
        assert_eq!(auction.view_permissions().count(), 1);
    }

    #[test]
    fn test_allocate_nonce() {
        let mut state = AuctionState::new();
        assert_eq!(state.allocate_nonce(&SELLER), 0);
        assert_eq!(state.allocate_nonce(&SELLER), 1);
        assert_eq!(state.allocate_nonce(&ALICE), 0);
    }

    #[test]
    fn test_bidders_from_events() {
        let contract = [0xc0u8; 20];
        let other = [0xc1u8; 20];
        let mut state = AuctionState::new();
        for (contract, bidder) in [(contract, ALICE), (other, BOB), (contract, ALICE), (contract, BOB)] {
            state.log.push(LogEntry {
                contract,
                block_height: 1,
                timestamp: 0,
                event: AuctionEvent::BidPlaced { bidder },
            });
        }
        assert_eq!(state.bidders_from_events(&contract), vec![ALICE, BOB]);
        assert_eq!(state.bidders_from_events(&other), vec![BOB]);
    }
}
