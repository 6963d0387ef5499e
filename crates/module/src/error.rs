//! Auction module error types.

use auction_fhe::FheError;
use thiserror::Error;

/// Errors that can occur in the auction module.
///
/// Every variant reverts the whole transaction. [`AuctionError::reason`] gives
/// the stable machine-readable reason returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Auction closed")]
    AuctionClosed,

    #[error("Bidding window closed at {end_time}")]
    NotInBiddingWindow { end_time: u64 },

    #[error("Too early to finalize, bidding ends at {end_time}")]
    TooEarly { end_time: u64 },

    #[error("Auction already ended")]
    AlreadyEnded,

    #[error("Auction not ended")]
    NotEnded,

    #[error("Caller is not the seller")]
    NotSeller,

    #[error("Auction has no bids")]
    NoBids,

    #[error("Invalid encrypted input: {0}")]
    InvalidInput(FheError),

    #[error("FHE engine error: {0}")]
    Fhe(#[from] FheError),

    #[error("Invalid bidding duration: {0}")]
    InvalidDuration(u64),

    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    #[error("Arithmetic overflow")]
    Overflow,
}

impl AuctionError {
    /// Machine-readable reason identifying the failed precondition.
    pub fn reason(&self) -> &'static str {
        match self {
            AuctionError::AuctionClosed => "AuctionClosed",
            AuctionError::NotInBiddingWindow { .. } => "NotInBiddingWindow",
            AuctionError::TooEarly { .. } => "TooEarly",
            AuctionError::AlreadyEnded => "AlreadyEnded",
            AuctionError::NotEnded => "NotEnded",
            AuctionError::NotSeller => "NotSeller",
            AuctionError::NoBids => "NoBids",
            AuctionError::InvalidInput(_) => "InvalidInput",
            AuctionError::Fhe(_) => "FheError",
            AuctionError::InvalidDuration(_) => "InvalidDuration",
            AuctionError::ContractNotFound(_) => "ContractNotFound",
            AuctionError::Overflow => "Overflow",
        }
    }

    /// Bid or finalize attempted outside its time window.
    pub fn is_timing_violation(&self) -> bool {
        matches!(
            self,
            AuctionError::AuctionClosed
                | AuctionError::NotInBiddingWindow { .. }
                | AuctionError::TooEarly { .. }
                | AuctionError::AlreadyEnded
                | AuctionError::NotEnded
        )
    }

    pub fn is_authorization_violation(&self) -> bool {
        matches!(self, AuctionError::NotSeller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasons_are_distinct() {
        let errors = [
            AuctionError::AuctionClosed,
            AuctionError::NotInBiddingWindow { end_time: 1 },
            AuctionError::TooEarly { end_time: 1 },
            AuctionError::AlreadyEnded,
            AuctionError::NotEnded,
            AuctionError::NotSeller,
            AuctionError::NoBids,
            AuctionError::InvalidInput(FheError::ProofBindingMismatch),
            AuctionError::Fhe(FheError::AuthenticationFailed),
            AuctionError::InvalidDuration(0),
            AuctionError::ContractNotFound("0x00".into()),
            AuctionError::Overflow,
        ];
        let mut reasons: Vec<&str> = errors.iter().map(|e| e.reason()).collect();
        reasons.sort_unstable();
        reasons.dedup();
        assert_eq!(reasons.len(), errors.len());
    }

    #[test]
    fn test_error_kinds() {
        assert!(AuctionError::TooEarly { end_time: 5 }.is_timing_violation());
        assert!(AuctionError::AlreadyEnded.is_timing_violation());
        assert!(!AuctionError::NotSeller.is_timing_violation());
        assert!(AuctionError::NotSeller.is_authorization_violation());
    }
}
