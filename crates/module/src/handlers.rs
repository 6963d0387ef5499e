//! Call handlers for the auction module.
//!
//! These functions implement the business logic for each call type. They
//! mutate the auction and the engine in place; the ledger runs them against
//! snapshots and commits only on success.

use crate::call::{AuctionCall, CallOutput, DeployParams};
use crate::error::AuctionError;
use crate::genesis::AuctionGenesisConfig;
use crate::state::SealedAuction;
use auction_fhe::FheEngine;
use auction_types::{
    Address, AuctionEvent, BidFeedback, Ebool, ExternalEuint64, InputProof, ZERO_ADDRESS,
};
use tracing::{debug, info};

/// Context provided by the runtime for each call.
#[derive(Debug)]
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
    /// Current timestamp
    pub timestamp: u64,
    /// Events emitted so far in this call
    events: Vec<AuctionEvent>,
}

impl CallContext {
    pub fn new(sender: Address, block_height: u64, timestamp: u64) -> Self {
        Self {
            sender,
            block_height,
            timestamp,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: AuctionEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AuctionEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<AuctionEvent> {
        self.events
    }
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// Deploy a new auction at `address` with the caller as seller.
pub fn handle_deploy<E: FheEngine>(
    engine: &mut E,
    ctx: &CallContext,
    address: Address,
    config: &AuctionGenesisConfig,
    params: DeployParams,
) -> HandlerResult<SealedAuction> {
    let duration = params
        .bidding_duration
        .unwrap_or(config.default_params.bidding_duration);
    if !config.duration_limits.contains(duration) {
        return Err(AuctionError::InvalidDuration(duration));
    }
    let end_time = ctx
        .timestamp
        .checked_add(duration)
        .ok_or(AuctionError::InvalidDuration(duration))?;
    let feedback = params.feedback.unwrap_or(config.default_params.feedback);

    let highest_bid = engine.trivial_u64(&address, 0);
    let winner = engine.trivial_address(&address, ZERO_ADDRESS);
    engine.allow(&address, highest_bid.handle(), &address)?;
    engine.allow(&address, winner.handle(), &address)?;

    info!(
        contract = hex::encode(address),
        seller = hex::encode(ctx.sender),
        end_time,
        ?feedback,
        "Auction deployed"
    );

    Ok(SealedAuction::new(
        address,
        ctx.sender,
        end_time,
        highest_bid,
        winner,
        feedback,
    ))
}

/// Handle PlaceBid call.
///
/// Folds the bid into the encrypted running maximum without learning whether
/// it took the lead. A bid equal to the current maximum keeps the earlier
/// leader.
pub fn handle_place_bid<E: FheEngine>(
    auction: &mut SealedAuction,
    engine: &mut E,
    ctx: &mut CallContext,
    amount: ExternalEuint64,
    proof: &InputProof,
) -> HandlerResult<Option<Ebool>> {
    if auction.ended {
        return Err(AuctionError::AuctionClosed);
    }
    if ctx.timestamp >= auction.end_time {
        return Err(AuctionError::NotInBiddingWindow {
            end_time: auction.end_time,
        });
    }

    let this = auction.address;
    let bid = engine
        .import_u64(&this, &ctx.sender, amount, proof)
        .map_err(AuctionError::InvalidInput)?;

    let is_higher = engine.lt(&this, auction.highest_bid, bid)?;
    let bidder = engine.trivial_address(&this, ctx.sender);
    let highest_bid = engine.select_u64(&this, is_higher, bid, auction.highest_bid)?;
    let winner = engine.select_address(&this, is_higher, bidder, auction.winner)?;

    engine.allow(&this, highest_bid.handle(), &this)?;
    engine.allow(&this, winner.handle(), &this)?;

    let leading = match auction.feedback {
        BidFeedback::Sealed => None,
        BidFeedback::LeadingSignal => {
            engine.allow(&this, is_higher.handle(), &this)?;
            engine.allow(&this, is_higher.handle(), &ctx.sender)?;
            Some(is_higher)
        }
    };

    let bid_count = auction
        .bid_count
        .checked_add(1)
        .ok_or(AuctionError::Overflow)?;

    auction.highest_bid = highest_bid;
    auction.winner = winner;
    auction.bid_count = bid_count;
    auction.record_bidder(ctx.sender);
    ctx.emit(AuctionEvent::BidPlaced { bidder: ctx.sender });

    debug!(
        contract = hex::encode(this),
        bidder = hex::encode(ctx.sender),
        bid_count,
        "Bid placed"
    );

    Ok(leading)
}

/// Handle Finalize call (permissionless).
pub fn handle_finalize<E: FheEngine>(
    auction: &mut SealedAuction,
    engine: &mut E,
    ctx: &mut CallContext,
) -> HandlerResult<()> {
    if auction.ended {
        return Err(AuctionError::AlreadyEnded);
    }
    if ctx.timestamp < auction.end_time {
        return Err(AuctionError::TooEarly {
            end_time: auction.end_time,
        });
    }

    // With no bids the results are the deploy-time sentinels; nothing to reveal.
    if auction.bid_count > 0 {
        let this = auction.address;
        engine.allow(&this, auction.highest_bid.handle(), &auction.seller)?;
        engine.allow(&this, auction.winner.handle(), &auction.seller)?;
    }

    auction.ended = true;
    ctx.emit(AuctionEvent::Finalized {
        seller: auction.seller,
    });

    info!(
        contract = hex::encode(auction.address),
        caller = hex::encode(ctx.sender),
        bid_count = auction.bid_count,
        "Auction finalized"
    );

    Ok(())
}

/// Handle GrantView call.
///
/// Returns `true` if `viewer` did not already have view permission.
pub fn handle_grant_view<E: FheEngine>(
    auction: &mut SealedAuction,
    engine: &mut E,
    ctx: &CallContext,
    viewer: Address,
) -> HandlerResult<bool> {
    check_can_grant(auction, ctx)?;
    grant_view(auction, engine, viewer)
}

/// Handle GrantViewToAllBidders call.
///
/// Duplicates and already-permitted identities are skipped silently. Returns
/// the number of newly permitted identities.
pub fn handle_grant_view_to_all_bidders<E: FheEngine>(
    auction: &mut SealedAuction,
    engine: &mut E,
    ctx: &CallContext,
    bidders: &[Address],
) -> HandlerResult<usize> {
    check_can_grant(auction, ctx)?;

    let mut newly_granted = 0;
    for bidder in bidders {
        if grant_view(auction, engine, *bidder)? {
            newly_granted += 1;
        }
    }

    info!(
        contract = hex::encode(auction.address),
        requested = bidders.len(),
        newly_granted,
        "View granted to bidders"
    );

    Ok(newly_granted)
}

/// Handle GrantViewToRegisteredBidders call.
pub fn handle_grant_view_to_registered_bidders<E: FheEngine>(
    auction: &mut SealedAuction,
    engine: &mut E,
    ctx: &CallContext,
) -> HandlerResult<usize> {
    let bidders = auction.bidders().to_vec();
    handle_grant_view_to_all_bidders(auction, engine, ctx, &bidders)
}

/// Route a call message to its handler.
pub fn dispatch<E: FheEngine>(
    auction: &mut SealedAuction,
    engine: &mut E,
    ctx: &mut CallContext,
    call: AuctionCall,
) -> HandlerResult<CallOutput> {
    match call {
        AuctionCall::PlaceBid { amount, proof } => {
            let leading = handle_place_bid(auction, engine, ctx, amount, &proof)?;
            Ok(CallOutput::BidPlaced { leading })
        }
        AuctionCall::Finalize => {
            handle_finalize(auction, engine, ctx)?;
            Ok(CallOutput::Unit)
        }
        AuctionCall::GrantView { viewer } => {
            let newly_granted = usize::from(handle_grant_view(auction, engine, ctx, viewer)?);
            Ok(CallOutput::ViewsGranted { newly_granted })
        }
        AuctionCall::GrantViewToAllBidders { bidders } => {
            let newly_granted = handle_grant_view_to_all_bidders(auction, engine, ctx, &bidders)?;
            Ok(CallOutput::ViewsGranted { newly_granted })
        }
        AuctionCall::GrantViewToRegisteredBidders => {
            let newly_granted = handle_grant_view_to_registered_bidders(auction, engine, ctx)?;
            Ok(CallOutput::ViewsGranted { newly_granted })
        }
    }
}

fn check_can_grant(auction: &SealedAuction, ctx: &CallContext) -> HandlerResult<()> {
    if !auction.is_seller(&ctx.sender) {
        return Err(AuctionError::NotSeller);
    }
    if !auction.ended {
        return Err(AuctionError::NotEnded);
    }
    if auction.bid_count == 0 {
        return Err(AuctionError::NoBids);
    }
    Ok(())
}

fn grant_view<E: FheEngine>(
    auction: &mut SealedAuction,
    engine: &mut E,
    viewer: Address,
) -> HandlerResult<bool> {
    let this = auction.address;
    engine.allow(&this, auction.highest_bid.handle(), &viewer)?;
    engine.allow(&this, auction.winner.handle(), &viewer)?;

    let added = auction.add_view_permission(viewer);
    if added {
        debug!(
            contract = hex::encode(this),
            viewer = hex::encode(viewer),
            "View granted"
        );
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_fhe::{LocalCoprocessor, UserDecryptRequest, UserDecryptor};
    use auction_types::derive_identity;
    use ed25519_dalek::SigningKey;
    use rand::rngs::{OsRng, StdRng};
    use rand::SeedableRng;

    const CONTRACT: Address = [0xc0u8; 20];
    const SELLER: u8 = 0x5e;
    const ALICE: u8 = 0xa1;
    const BOB: u8 = 0xb0;
    const CAROL: u8 = 0xca;

    const START: u64 = 1_000;
    const DURATION: u64 = 3_600;

    fn decryptor(seed: u8) -> UserDecryptor {
        UserDecryptor::new(SigningKey::from_bytes(&[seed; 32]), &mut OsRng)
    }

    fn identity(seed: u8) -> Address {
        derive_identity(&SigningKey::from_bytes(&[seed; 32]).verifying_key().to_bytes())
    }

    fn test_context(sender: Address, timestamp: u64) -> CallContext {
        CallContext::new(sender, 1, timestamp)
    }

    fn setup(feedback: BidFeedback) -> (SealedAuction, LocalCoprocessor) {
        let mut engine = LocalCoprocessor::new([7u8; 32]);
        let params = DeployParams {
            bidding_duration: Some(DURATION),
            feedback: Some(feedback),
        };
        let auction = handle_deploy(
            &mut engine,
            &test_context(identity(SELLER), START),
            CONTRACT,
            &AuctionGenesisConfig::default(),
            params,
        )
        .unwrap();
        engine.end_transaction();
        (auction, engine)
    }

    fn bid(
        auction: &mut SealedAuction,
        engine: &mut LocalCoprocessor,
        bidder: Address,
        amount: u64,
        timestamp: u64,
    ) -> HandlerResult<Option<Ebool>> {
        let mut rng = StdRng::seed_from_u64(amount);
        let input = engine
            .create_encrypted_input(&CONTRACT, &bidder)
            .unwrap()
            .add_u64(amount)
            .encrypt(&mut rng)
            .unwrap();
        let mut ctx = test_context(bidder, timestamp);
        let result = handle_place_bid(
            auction,
            engine,
            &mut ctx,
            input.euint64(0).unwrap(),
            &input.proof,
        );
        engine.end_transaction();
        result
    }

    fn finalize(auction: &mut SealedAuction, engine: &mut LocalCoprocessor) {
        let mut ctx = test_context(identity(ALICE), START + DURATION);
        handle_finalize(auction, engine, &mut ctx).unwrap();
        engine.end_transaction();
    }

    fn reveal(auction: &SealedAuction, engine: &LocalCoprocessor, viewer: u8) -> (u64, Address) {
        let viewer = decryptor(viewer);
        let request = viewer.request(CONTRACT, START, 1);
        let now = START + DURATION;
        let price = viewer
            .decrypt_u64(engine, auction.highest_bid.handle(), &request, now, &mut OsRng)
            .unwrap();
        let winner = viewer
            .decrypt_address(engine, auction.winner.handle(), &request, now, &mut OsRng)
            .unwrap();
        (price, winner)
    }

    #[test]
    fn test_deploy() {
        let (auction, engine) = setup(BidFeedback::Sealed);
        assert_eq!(auction.seller, identity(SELLER));
        assert_eq!(auction.end_time, START + DURATION);
        assert_eq!(auction.bid_count, 0);
        assert!(!auction.ended);
        assert!(engine.is_allowed(auction.highest_bid.handle(), &CONTRACT));
        assert!(engine.is_allowed(auction.winner.handle(), &CONTRACT));
        assert!(!engine.is_allowed(auction.highest_bid.handle(), &identity(SELLER)));
    }

    #[test]
    fn test_deploy_invalid_duration() {
        let mut engine = LocalCoprocessor::new([7u8; 32]);
        let config = AuctionGenesisConfig::default();
        for duration in [0, config.duration_limits.max + 1] {
            let params = DeployParams {
                bidding_duration: Some(duration),
                feedback: None,
            };
            let result = handle_deploy(
                &mut engine,
                &test_context(identity(SELLER), START),
                CONTRACT,
                &config,
                params,
            );
            assert_eq!(result.unwrap_err(), AuctionError::InvalidDuration(duration));
        }
    }

    #[test]
    fn test_deploy_end_time_overflow() {
        let mut engine = LocalCoprocessor::new([7u8; 32]);
        let result = handle_deploy(
            &mut engine,
            &test_context(identity(SELLER), u64::MAX - 10),
            CONTRACT,
            &AuctionGenesisConfig::default(),
            DeployParams::default(),
        );
        assert!(matches!(result, Err(AuctionError::InvalidDuration(_))));
    }

    #[test]
    fn test_place_bid_success() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        let leading = bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap();

        assert!(leading.is_none());
        assert_eq!(auction.bid_count, 1);
        assert_eq!(auction.bidders(), &[identity(ALICE)]);
        assert!(engine.is_allowed(auction.highest_bid.handle(), &CONTRACT));
        assert!(engine.is_allowed(auction.winner.handle(), &CONTRACT));
        assert!(!engine.is_allowed(auction.highest_bid.handle(), &identity(ALICE)));
    }

    #[test]
    fn test_place_bid_emits_event() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        let input = engine
            .create_encrypted_input(&CONTRACT, &identity(ALICE))
            .unwrap()
            .add_u64(10)
            .encrypt(&mut StdRng::seed_from_u64(1))
            .unwrap();
        let mut ctx = test_context(identity(ALICE), START);
        handle_place_bid(&mut auction, &mut engine, &mut ctx, input.euint64(0).unwrap(), &input.proof)
            .unwrap();
        assert_eq!(ctx.events(), &[AuctionEvent::BidPlaced { bidder: identity(ALICE) }]);
    }

    #[test]
    fn test_place_bid_after_end_time() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        let result = bid(&mut auction, &mut engine, identity(ALICE), 50, START + DURATION);
        assert_eq!(
            result.unwrap_err(),
            AuctionError::NotInBiddingWindow {
                end_time: START + DURATION
            }
        );
        assert_eq!(auction.bid_count, 0);
    }

    #[test]
    fn test_place_bid_after_finalize() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        finalize(&mut auction, &mut engine);
        let result = bid(&mut auction, &mut engine, identity(ALICE), 50, START);
        assert_eq!(result.unwrap_err(), AuctionError::AuctionClosed);
    }

    #[test]
    fn test_place_bid_wrong_sender() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        let input = engine
            .create_encrypted_input(&CONTRACT, &identity(ALICE))
            .unwrap()
            .add_u64(10)
            .encrypt(&mut StdRng::seed_from_u64(1))
            .unwrap();
        let mut ctx = test_context(identity(BOB), START);
        let result = handle_place_bid(
            &mut auction,
            &mut engine,
            &mut ctx,
            input.euint64(0).unwrap(),
            &input.proof,
        );
        assert!(matches!(result, Err(AuctionError::InvalidInput(_))));
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_highest_bid_wins() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap();
        bid(&mut auction, &mut engine, identity(BOB), 80, START + 1).unwrap();
        bid(&mut auction, &mut engine, identity(CAROL), 70, START + 2).unwrap();
        finalize(&mut auction, &mut engine);

        assert_eq!(reveal(&auction, &engine, SELLER), (80, identity(BOB)));
    }

    #[test]
    fn test_tie_keeps_first_bidder() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 100, START).unwrap();
        bid(&mut auction, &mut engine, identity(BOB), 100, START + 1).unwrap();
        finalize(&mut auction, &mut engine);

        assert_eq!(reveal(&auction, &engine, SELLER), (100, identity(ALICE)));
    }

    #[test]
    fn test_zero_bid_keeps_sentinel() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 0, START).unwrap();
        finalize(&mut auction, &mut engine);

        assert_eq!(auction.bid_count, 1);
        assert_eq!(reveal(&auction, &engine, SELLER), (0, ZERO_ADDRESS));
    }

    #[test]
    fn test_leading_signal() {
        let (mut auction, mut engine) = setup(BidFeedback::LeadingSignal);
        let first = bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap().unwrap();
        let second = bid(&mut auction, &mut engine, identity(BOB), 40, START + 1).unwrap().unwrap();

        let now = START + 1;
        let (alice, bob) = (decryptor(ALICE), decryptor(BOB));
        let alice_request = alice.request(CONTRACT, START, 1);
        let bob_request = bob.request(CONTRACT, START, 1);
        let leading = |who: &UserDecryptor, request: &UserDecryptRequest, flag: Ebool| {
            who.decrypt_bool(&engine, flag.handle(), request, now, &mut OsRng)
        };
        assert_eq!(leading(&alice, &alice_request, first), Ok(true));
        assert_eq!(leading(&bob, &bob_request, second), Ok(false));
        assert!(leading(&alice, &alice_request, second).is_err());
    }

    #[test]
    fn test_finalize_too_early() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        let mut ctx = test_context(identity(ALICE), START + DURATION - 1);
        let result = handle_finalize(&mut auction, &mut engine, &mut ctx);
        assert_eq!(
            result.unwrap_err(),
            AuctionError::TooEarly {
                end_time: START + DURATION
            }
        );
        assert!(!auction.ended);
    }

    #[test]
    fn test_finalize_twice() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        finalize(&mut auction, &mut engine);

        let mut ctx = test_context(identity(SELLER), START + DURATION + 100);
        let result = handle_finalize(&mut auction, &mut engine, &mut ctx);
        assert_eq!(result.unwrap_err(), AuctionError::AlreadyEnded);
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_finalize_grants_seller() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap();

        let mut ctx = test_context(identity(BOB), START + DURATION);
        handle_finalize(&mut auction, &mut engine, &mut ctx).unwrap();
        assert_eq!(ctx.events(), &[AuctionEvent::Finalized { seller: identity(SELLER) }]);
        assert!(engine.is_allowed(auction.highest_bid.handle(), &identity(SELLER)));
        assert!(engine.is_allowed(auction.winner.handle(), &identity(SELLER)));
        assert!(!engine.is_allowed(auction.winner.handle(), &identity(BOB)));
    }

    #[test]
    fn test_finalize_without_bids() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        finalize(&mut auction, &mut engine);
        assert!(auction.ended);
        assert!(!engine.is_allowed(auction.highest_bid.handle(), &identity(SELLER)));
    }

    #[test]
    fn test_grant_view_checks() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap();

        let ctx = test_context(identity(SELLER), START + 1);
        let result = handle_grant_view(&mut auction, &mut engine, &ctx, identity(ALICE));
        assert_eq!(result.unwrap_err(), AuctionError::NotEnded);

        finalize(&mut auction, &mut engine);

        let ctx = test_context(identity(ALICE), START + DURATION);
        let result = handle_grant_view(&mut auction, &mut engine, &ctx, identity(ALICE));
        assert_eq!(result.unwrap_err(), AuctionError::NotSeller);
        assert!(!auction.can_view_after_end(&identity(ALICE)));
    }

    #[test]
    fn test_grant_view_without_bids() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        finalize(&mut auction, &mut engine);

        let ctx = test_context(identity(SELLER), START + DURATION);
        let result = handle_grant_view(&mut auction, &mut engine, &ctx, identity(ALICE));
        assert_eq!(result.unwrap_err(), AuctionError::NoBids);
        let bidders = [identity(ALICE)];
        let result = handle_grant_view_to_all_bidders(&mut auction, &mut engine, &ctx, &bidders);
        assert_eq!(result.unwrap_err(), AuctionError::NoBids);
    }

    #[test]
    fn test_grant_view_idempotent() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap();
        finalize(&mut auction, &mut engine);

        let ctx = test_context(identity(SELLER), START + DURATION);
        assert!(handle_grant_view(&mut auction, &mut engine, &ctx, identity(CAROL)).unwrap());
        assert!(!handle_grant_view(&mut auction, &mut engine, &ctx, identity(CAROL)).unwrap());
        assert!(auction.can_view_after_end(&identity(CAROL)));
        assert_eq!(auction.view_permissions().count(), 1);
        assert_eq!(reveal(&auction, &engine, CAROL), (50, identity(ALICE)));
    }

    #[test]
    fn test_grant_view_to_all_bidders() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap();
        bid(&mut auction, &mut engine, identity(BOB), 60, START + 1).unwrap();
        finalize(&mut auction, &mut engine);

        let ctx = test_context(identity(SELLER), START + DURATION);
        let bidders = [identity(ALICE), identity(BOB), identity(ALICE)];
        let granted =
            handle_grant_view_to_all_bidders(&mut auction, &mut engine, &ctx, &bidders).unwrap();
        assert_eq!(granted, 2);
        assert_eq!(reveal(&auction, &engine, ALICE), (60, identity(BOB)));
        assert_eq!(reveal(&auction, &engine, BOB), (60, identity(BOB)));
    }

    #[test]
    fn test_grant_view_to_registered_bidders() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        bid(&mut auction, &mut engine, identity(ALICE), 50, START).unwrap();
        bid(&mut auction, &mut engine, identity(BOB), 60, START + 1).unwrap();
        bid(&mut auction, &mut engine, identity(ALICE), 70, START + 2).unwrap();
        finalize(&mut auction, &mut engine);

        let ctx = test_context(identity(SELLER), START + DURATION);
        handle_grant_view(&mut auction, &mut engine, &ctx, identity(BOB)).unwrap();
        let granted =
            handle_grant_view_to_registered_bidders(&mut auction, &mut engine, &ctx).unwrap();
        assert_eq!(granted, 1);
        assert!(auction.can_view_after_end(&identity(ALICE)));
        assert!(auction.can_view_after_end(&identity(BOB)));
        assert!(!auction.can_view_after_end(&identity(CAROL)));
    }

    #[test]
    fn test_dispatch() {
        let (mut auction, mut engine) = setup(BidFeedback::Sealed);
        let mut ctx = test_context(identity(ALICE), START + DURATION);
        let output = dispatch(&mut auction, &mut engine, &mut ctx, AuctionCall::Finalize).unwrap();
        assert_eq!(output, CallOutput::Unit);
        assert_eq!(ctx.into_events(), vec![AuctionEvent::Finalized { seller: identity(SELLER) }]);
    }
}
