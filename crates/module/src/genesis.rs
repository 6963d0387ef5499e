//! Genesis configuration for the auction module.
//!
//! This module defines the defaults and bounds applied when auctions are
//! deployed on a ledger.

use auction_types::BidFeedback;
use serde::{Deserialize, Serialize};

/// Genesis configuration for the auction module.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionGenesisConfig {
    /// Parameters used when a deploy call leaves them unset
    pub default_params: DefaultAuctionParams,

    /// Allowed range for bidding durations
    pub duration_limits: DurationLimits,
}

/// Default parameters for new auctions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultAuctionParams {
    /// Bidding window length (seconds)
    pub bidding_duration: u64,
    /// Whether bidders get an encrypted "leading" flag back
    pub feedback: BidFeedback,
}

/// Bounds on the bidding window.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationLimits {
    /// Shortest bidding window (seconds)
    pub min: u64,
    /// Longest bidding window (seconds)
    pub max: u64,
}

impl Default for DefaultAuctionParams {
    fn default() -> Self {
        Self {
            bidding_duration: 3600, // 1 hour
            feedback: BidFeedback::Sealed,
        }
    }
}

impl Default for DurationLimits {
    fn default() -> Self {
        Self {
            min: 60,             // 1 minute
            max: 30 * 24 * 3600, // 30 days
        }
    }
}

impl DurationLimits {
    pub fn contains(&self, duration: u64) -> bool {
        (self.min..=self.max).contains(&duration)
    }
}

impl AuctionGenesisConfig {
    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.duration_limits.min == 0 {
            return Err(GenesisValidationError::InvalidDurationLimits(
                "Minimum duration cannot be zero".into(),
            ));
        }
        if self.duration_limits.min > self.duration_limits.max {
            return Err(GenesisValidationError::InvalidDurationLimits(
                "Minimum duration cannot exceed maximum".into(),
            ));
        }
        if !self
            .duration_limits
            .contains(self.default_params.bidding_duration)
        {
            return Err(GenesisValidationError::DefaultDurationOutOfRange {
                duration: self.default_params.bidding_duration,
                min: self.duration_limits.min,
                max: self.duration_limits.max,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid duration limits: {0}")]
    InvalidDurationLimits(String),

    #[error("Default duration {duration} outside [{min}, {max}]")]
    DefaultDurationOutOfRange { duration: u64, min: u64, max: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuctionGenesisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_params.feedback, BidFeedback::Sealed);
    }

    #[test]
    fn test_invalid_min_zero() {
        let mut config = AuctionGenesisConfig::default();
        config.duration_limits.min = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidDurationLimits(_))
        ));
    }

    #[test]
    fn test_invalid_min_exceeds_max() {
        let mut config = AuctionGenesisConfig::default();
        config.duration_limits.min = 100;
        config.duration_limits.max = 50;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidDurationLimits(_))
        ));
    }

    #[test]
    fn test_default_duration_out_of_range() {
        let mut config = AuctionGenesisConfig::default();
        config.default_params.bidding_duration = 10;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::DefaultDurationOutOfRange { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AuctionGenesisConfig = serde_json::from_str(
            r#"{ "default_params": { "feedback": "leading_signal" } }"#,
        )
        .unwrap();
        assert_eq!(config.default_params.feedback, BidFeedback::LeadingSignal);
        assert_eq!(config.default_params.bidding_duration, 3600);
        assert!(config.validate().is_ok());
    }
}
