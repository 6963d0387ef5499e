//! Call message types for the auction module.

use auction_types::{Address, BidFeedback, Ebool, ExternalEuint64, InputProof};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Parameters for deploying a new auction. Unset fields fall back to the
/// genesis defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct DeployParams {
    /// Bidding window length in seconds
    pub bidding_duration: Option<u64>,
    pub feedback: Option<BidFeedback>,
}

/// Call messages for a deployed auction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionCall {
    /// Submit an encrypted bid.
    PlaceBid {
        amount: ExternalEuint64,
        proof: InputProof,
    },

    /// Close bidding (permissionless, once `end_time` has passed).
    Finalize,

    /// Let one identity decrypt the results (seller only).
    GrantView { viewer: Address },

    /// Grant view to every identity in a caller-supplied list (seller only).
    GrantViewToAllBidders { bidders: Vec<Address> },

    /// Grant view to every identity in the on-chain bidder registry (seller only).
    GrantViewToRegisteredBidders,
}

impl AuctionCall {
    pub fn name(&self) -> &'static str {
        match self {
            AuctionCall::PlaceBid { .. } => "placeBid",
            AuctionCall::Finalize => "finalize",
            AuctionCall::GrantView { .. } => "grantView",
            AuctionCall::GrantViewToAllBidders { .. } => "grantViewToAllBidders",
            AuctionCall::GrantViewToRegisteredBidders => "grantViewToRegisteredBidders",
        }
    }
}

/// Return value of a successful call.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum CallOutput {
    /// The call has no return value.
    Unit,
    /// `leading` is set only for auctions deployed with [`BidFeedback::LeadingSignal`].
    BidPlaced { leading: Option<Ebool> },
    /// Number of identities that did not already have view permission.
    ViewsGranted { newly_granted: usize },
}
