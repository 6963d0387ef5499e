//! Sealed-bid auction module over an FHE engine.
//!
//! This module implements the on-chain logic of a sealed-bid auction whose bids
//! stay encrypted for their whole life:
//!
//! - Deployment with a fixed bidding window
//! - Encrypted bid ingestion with a homomorphic running maximum and winner
//! - Permissionless finalization after the deadline
//! - Seller-controlled result access for other identities
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: On-chain state structures
//! - `genesis`: Deploy defaults and bounds
//! - `runtime`: Ledger with clock, atomic transactions and the event log
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{AuctionCall, AuctionGenesisConfig, DeployParams, Ledger};
//! use auction_fhe::LocalCoprocessor;
//!
//! let mut ledger = Ledger::new(LocalCoprocessor::new(key), AuctionGenesisConfig::default(), now)?;
//! let auction = ledger.deploy(&seller, DeployParams::default())?;
//!
//! let input = ledger.engine().create_encrypted_input(&auction, &bidder)?.add_u64(100).encrypt(&mut rng)?;
//! let call = AuctionCall::PlaceBid { amount: input.euint64(0).unwrap(), proof: input.proof };
//! ledger.execute(&auction, &bidder, call)?;
//! ```

pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod runtime;
pub mod state;

pub use call::{AuctionCall, CallOutput, DeployParams};
pub use error::AuctionError;
pub use genesis::{AuctionGenesisConfig, DefaultAuctionParams, DurationLimits, GenesisValidationError};
pub use handlers::{CallContext, HandlerResult};
pub use queries::{AuctionQuery, AuctionQueryResponse};
pub use runtime::{Ledger, Receipt};
pub use state::{AuctionState, LogEntry, SealedAuction};
