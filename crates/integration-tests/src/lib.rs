//! End-to-end integration tests for FHE sealed-bid auctions.
//!
//! These tests drive complete auction lifecycles through the [`Ledger`]:
//! 1. Deployment
//! 2. Client-side bid encryption and submission
//! 3. Finalization
//! 4. Result sharing and user decryption

use auction_fhe::{FheError, LocalCoprocessor, UserDecryptRequest, UserDecryptor};
use auction_module::{AuctionCall, AuctionError, AuctionGenesisConfig, DeployParams, Ledger, Receipt};
use auction_types::{derive_identity, Address, BidFeedback, Ebool};
use ed25519_dalek::SigningKey;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Chain start time used by every harness.
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// Bidding window used by [`Harness::deploy`].
pub const BIDDING_DURATION: u64 = 3_600;

/// Deterministic test wallet.
pub fn wallet(n: u8) -> SigningKey {
    SigningKey::from_bytes(&[n; 32])
}

/// Identity controlled by [`wallet`]`(n)`.
pub fn identity(n: u8) -> Address {
    derive_identity(&wallet(n).verifying_key().to_bytes())
}

/// A ledger plus a seeded client RNG for encrypting bids.
pub struct Harness {
    pub ledger: Ledger<LocalCoprocessor>,
    rng: StdRng,
}

impl Harness {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let engine = LocalCoprocessor::random(&mut rng);
        let ledger = Ledger::new(engine, AuctionGenesisConfig::default(), GENESIS_TIME)
            .expect("default genesis is valid");
        Self { ledger, rng }
    }

    pub fn deploy(&mut self, seller: Address, feedback: BidFeedback) -> Address {
        let params = DeployParams {
            bidding_duration: Some(BIDDING_DURATION),
            feedback: Some(feedback),
        };
        self.ledger.deploy(&seller, params).expect("deploy succeeds")
    }

    /// Encrypt `amount` for `(encrypt_for, bidder)` and build the call.
    pub fn bid_call(&mut self, encrypt_for: &Address, bidder: &Address, amount: u64) -> AuctionCall {
        let input = self
            .ledger
            .engine()
            .create_encrypted_input(encrypt_for, bidder)
            .and_then(|mut builder| builder.add_u64(amount).encrypt(&mut self.rng))
            .expect("encryption succeeds");
        AuctionCall::PlaceBid {
            amount: input.euint64(0).expect("one u64 input"),
            proof: input.proof,
        }
    }

    pub fn bid(&mut self, contract: &Address, bidder: &Address, amount: u64) -> Result<Receipt, AuctionError> {
        let call = self.bid_call(contract, bidder, amount);
        self.ledger.execute(contract, bidder, call)
    }

    pub fn end_bidding(&mut self, contract: &Address) {
        let end_time = self.ledger.auction(contract).expect("deployed").end_time;
        self.ledger.set_timestamp(end_time);
    }

    pub fn finalize(&mut self, contract: &Address, caller: &Address) -> Result<Receipt, AuctionError> {
        self.ledger.execute(contract, caller, AuctionCall::Finalize)
    }

    pub fn grant_view(&mut self, contract: &Address, caller: &Address, viewer: Address) -> Result<Receipt, AuctionError> {
        self.ledger
            .execute(contract, caller, AuctionCall::GrantView { viewer })
    }

    /// Decryptor for [`wallet`]`(viewer)` with a fresh reencryption key.
    pub fn decryptor(&mut self, viewer: u8) -> UserDecryptor {
        UserDecryptor::new(wallet(viewer), &mut self.rng)
    }

    /// Permit signed by `decryptor` for `contract`, valid for one day from now.
    pub fn request(&self, decryptor: &UserDecryptor, contract: &Address) -> UserDecryptRequest {
        decryptor.request(*contract, self.ledger.timestamp(), 1)
    }

    /// Decrypt `(highest bid, winner)` as `viewer`.
    pub fn decrypt_results(&mut self, contract: &Address, viewer: u8) -> Result<(u64, Address), FheError> {
        let decryptor = self.decryptor(viewer);
        let request = self.request(&decryptor, contract);
        let auction = self.ledger.auction(contract).expect("deployed");
        let (price, winner) = (auction.highest_bid.handle(), auction.winner.handle());
        let now = self.ledger.timestamp();
        let engine = self.ledger.engine();
        let price = decryptor.decrypt_u64(engine, price, &request, now, &mut self.rng)?;
        let winner = decryptor.decrypt_address(engine, winner, &request, now, &mut self.rng)?;
        Ok((price, winner))
    }

    pub fn decrypt_leading(&mut self, contract: &Address, viewer: u8, flag: Ebool) -> Result<bool, FheError> {
        let decryptor = self.decryptor(viewer);
        let request = self.request(&decryptor, contract);
        let now = self.ledger.timestamp();
        decryptor.decrypt_bool(self.ledger.engine(), flag.handle(), &request, now, &mut self.rng)
    }
}
