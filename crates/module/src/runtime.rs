//! In-process execution environment for auctions.
//!
//! [`Ledger`] plays the role of the chain: it owns the clock, the deployed
//! auctions, the FHE engine and the event log. Every call runs as one
//! transaction against copies of the auction and engine, and is committed only
//! when the handler succeeds. A failed call leaves no state change, ACL grant or
//! event behind.

use crate::call::{AuctionCall, CallOutput, DeployParams};
use crate::error::AuctionError;
use crate::genesis::{AuctionGenesisConfig, GenesisValidationError};
use crate::handlers::{self, CallContext, HandlerResult};
use crate::queries::{self, AuctionQuery, AuctionQueryResponse};
use crate::state::{AuctionState, LogEntry, SealedAuction};
use auction_fhe::FheEngine;
use auction_types::{derive_contract_address, format_address, Address, AuctionEvent};
use tracing::{info, warn};

/// Outcome of a committed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub block_height: u64,
    pub output: CallOutput,
    pub events: Vec<AuctionEvent>,
}

/// A single-node chain hosting any number of independent auctions.
#[derive(Debug)]
pub struct Ledger<E> {
    config: AuctionGenesisConfig,
    state: AuctionState,
    engine: E,
    block_height: u64,
    timestamp: u64,
}

impl<E: FheEngine + Clone> Ledger<E> {
    /// Start a ledger at block 0 with the given genesis config.
    pub fn new(
        engine: E,
        config: AuctionGenesisConfig,
        timestamp: u64,
    ) -> Result<Self, GenesisValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            state: AuctionState::new(),
            engine,
            block_height: 0,
            timestamp,
        })
    }

    pub fn config(&self) -> &AuctionGenesisConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn advance_time(&mut self, seconds: u64) -> HandlerResult<u64> {
        self.timestamp = self
            .timestamp
            .checked_add(seconds)
            .ok_or(AuctionError::Overflow)?;
        Ok(self.timestamp)
    }

    /// Deploy a new auction with `sender` as seller. Returns its address.
    pub fn deploy(&mut self, sender: &Address, params: DeployParams) -> HandlerResult<Address> {
        let nonce = self
            .state
            .deploy_nonces
            .get(sender)
            .copied()
            .unwrap_or_default();
        let address = derive_contract_address(sender, nonce);

        let mut engine = self.engine.clone();
        let ctx = CallContext::new(*sender, self.block_height + 1, self.timestamp);
        let auction = handlers::handle_deploy(&mut engine, &ctx, address, &self.config, params)
            .inspect_err(|e| {
                warn!(sender = hex::encode(sender), reason = e.reason(), "Deploy reverted");
            })?;

        engine.end_transaction();
        self.engine = engine;
        self.state.allocate_nonce(sender);
        self.state.auctions.insert(address, auction);
        self.block_height += 1;
        Ok(address)
    }

    /// Execute `call` on the auction at `contract` as one transaction.
    pub fn execute(
        &mut self,
        contract: &Address,
        sender: &Address,
        call: AuctionCall,
    ) -> HandlerResult<Receipt> {
        let mut auction = self.auction(contract)?.clone();
        let mut engine = self.engine.clone();
        let mut ctx = CallContext::new(*sender, self.block_height + 1, self.timestamp);
        let name = call.name();

        let output = handlers::dispatch(&mut auction, &mut engine, &mut ctx, call).inspect_err(|e| {
            warn!(
                contract = hex::encode(contract),
                sender = hex::encode(sender),
                call = name,
                reason = e.reason(),
                "Transaction reverted"
            );
        })?;

        engine.end_transaction();
        self.engine = engine;
        self.state.auctions.insert(*contract, auction);
        self.block_height += 1;

        let events = ctx.into_events();
        for event in &events {
            self.state.log.push(LogEntry {
                contract: *contract,
                block_height: self.block_height,
                timestamp: self.timestamp,
                event: event.clone(),
            });
        }

        info!(
            contract = hex::encode(contract),
            call = name,
            block_height = self.block_height,
            events = events.len(),
            "Transaction committed"
        );

        Ok(Receipt {
            block_height: self.block_height,
            output,
            events,
        })
    }

    /// Read-only query against one auction at the current timestamp.
    pub fn query(&self, contract: &Address, query: AuctionQuery) -> HandlerResult<AuctionQueryResponse> {
        Ok(queries::handle_query(self.auction(contract)?, self.timestamp, query))
    }

    pub fn auction(&self, contract: &Address) -> HandlerResult<&SealedAuction> {
        self.state
            .get_auction(contract)
            .ok_or_else(|| AuctionError::ContractNotFound(format_address(contract)))
    }

    /// Committed events of one contract, oldest first.
    pub fn events(&self, contract: &Address) -> Vec<LogEntry> {
        self.state.events_for(contract).cloned().collect()
    }

    /// Bidder list recovered from the event log, as an off-chain indexer would.
    pub fn bidders_from_events(&self, contract: &Address) -> Vec<Address> {
        self.state.bidders_from_events(contract)
    }
}
