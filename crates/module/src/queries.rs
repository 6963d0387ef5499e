//! Query handlers for the auction module.
//!
//! These functions provide read-only access to auction state. Ciphertext
//! queries return opaque handles; reading the values behind them goes through
//! user decryption against the engine's ACL.

use crate::state::SealedAuction;
use auction_types::{Address, AuctionSnapshot, Eaddress, Euint64};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Public lifecycle summary.
    GetState,

    /// Handle of the encrypted highest bid.
    HighestBidCipher,

    /// Handle of the encrypted winner identity.
    WinnerCipher,

    /// Whether an identity may view results after the end.
    CanViewAfterEnd { identity: Address },

    /// Seller identity.
    Seller,

    /// Distinct bidders in first-bid order.
    Bidders,
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    State(AuctionSnapshot),
    HighestBidCipher(Euint64),
    WinnerCipher(Eaddress),
    CanViewAfterEnd(bool),
    Seller(Address),
    Bidders(Vec<Address>),
}

/// Handle a query request. `now` is the current ledger timestamp.
pub fn handle_query(auction: &SealedAuction, now: u64, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetState => AuctionQueryResponse::State(get_state(auction, now)),
        AuctionQuery::HighestBidCipher => AuctionQueryResponse::HighestBidCipher(auction.highest_bid),
        AuctionQuery::WinnerCipher => AuctionQueryResponse::WinnerCipher(auction.winner),
        AuctionQuery::CanViewAfterEnd { identity } => {
            AuctionQueryResponse::CanViewAfterEnd(auction.can_view_after_end(&identity))
        }
        AuctionQuery::Seller => AuctionQueryResponse::Seller(auction.seller),
        AuctionQuery::Bidders => AuctionQueryResponse::Bidders(auction.bidders().to_vec()),
    }
}

pub fn get_state(auction: &SealedAuction, now: u64) -> AuctionSnapshot {
    auction.snapshot(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::{BidFeedback, CipherHandle};

    const SELLER: Address = [0x5eu8; 20];
    const ALICE: Address = [0xa1u8; 20];

    fn auction() -> SealedAuction {
        SealedAuction::new(
            [0xc0u8; 20],
            SELLER,
            100,
            Euint64(CipherHandle([1u8; 32])),
            Eaddress(CipherHandle([2u8; 32])),
            BidFeedback::Sealed,
        )
    }

    #[test]
    fn test_get_state() {
        let mut auction = auction();
        assert_eq!(
            get_state(&auction, 50),
            AuctionSnapshot {
                is_bidding: true,
                is_ended: false,
                end_time: 100,
                bid_count: 0,
            }
        );

        // Deadline passed but nobody finalized yet
        let state = get_state(&auction, 100);
        assert!(!state.is_bidding);
        assert!(!state.is_ended);

        auction.ended = true;
        assert!(get_state(&auction, 100).is_ended);
    }

    #[test]
    fn test_cipher_queries() {
        let auction = auction();
        assert_eq!(
            handle_query(&auction, 0, AuctionQuery::HighestBidCipher),
            AuctionQueryResponse::HighestBidCipher(auction.highest_bid)
        );
        assert_eq!(
            handle_query(&auction, 0, AuctionQuery::WinnerCipher),
            AuctionQueryResponse::WinnerCipher(auction.winner)
        );
    }

    #[test]
    fn test_can_view_after_end() {
        let auction = auction();
        assert_eq!(
            handle_query(&auction, 0, AuctionQuery::CanViewAfterEnd { identity: SELLER }),
            AuctionQueryResponse::CanViewAfterEnd(true)
        );
        assert_eq!(
            handle_query(&auction, 0, AuctionQuery::CanViewAfterEnd { identity: ALICE }),
            AuctionQueryResponse::CanViewAfterEnd(false)
        );
    }

    #[test]
    fn test_seller_and_bidders() {
        let mut auction = auction();
        auction.record_bidder(ALICE);
        assert_eq!(
            handle_query(&auction, 0, AuctionQuery::Seller),
            AuctionQueryResponse::Seller(SELLER)
        );
        assert_eq!(
            handle_query(&auction, 0, AuctionQuery::Bidders),
            AuctionQueryResponse::Bidders(vec![ALICE])
        );
    }
}
