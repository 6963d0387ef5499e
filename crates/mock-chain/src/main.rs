//! Mock chain server for local testing of sealed-bid auctions.
//!
//! This provides a JSON-RPC server that hosts a [`Ledger`] together with a
//! simulated FHE coprocessor, so front ends can deploy auctions, submit
//! encrypted bids and run user decryptions without a real chain.

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use auction_fhe::{LocalCoprocessor, UserDecryptRequest};
use auction_module::{
    AuctionCall, AuctionError, AuctionGenesisConfig, AuctionQuery, AuctionQueryResponse,
    DeployParams, Ledger,
};
use auction_types::{format_address, parse_address, Address, CipherHandle, ExternalEuint64, InputProof};

mod types;
use types::*;

#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "Local dev node for FHE sealed-bid auctions")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// JSON file with the auction genesis config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial chain timestamp (defaults to wall-clock time)
    #[arg(long)]
    timestamp: Option<u64>,
}

/// Shared chain state.
struct ChainState {
    ledger: Ledger<LocalCoprocessor>,
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Move the clock forward.
    #[method(name = "admin_advanceTime")]
    async fn admin_advance_time(&self, seconds: u64) -> Result<BlockInfo, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Deploy a new auction. Returns its address.
    #[method(name = "auction_deploy")]
    async fn auction_deploy(&self, params: DeployAuctionParams) -> Result<String, ErrorObjectOwned>;

    /// Submit an encrypted bid.
    #[method(name = "auction_placeBid")]
    async fn auction_place_bid(&self, params: PlaceBidParams) -> Result<ReceiptRpc, ErrorObjectOwned>;

    /// Close bidding.
    #[method(name = "auction_finalize")]
    async fn auction_finalize(
        &self,
        sender: String,
        contract: String,
    ) -> Result<ReceiptRpc, ErrorObjectOwned>;

    /// Grant one identity access to the results.
    #[method(name = "auction_grantView")]
    async fn auction_grant_view(
        &self,
        sender: String,
        contract: String,
        viewer: String,
    ) -> Result<ReceiptRpc, ErrorObjectOwned>;

    /// Grant result access to a list of identities, or to every registered
    /// bidder when `bidders` is omitted.
    #[method(name = "auction_grantViewToAllBidders")]
    async fn auction_grant_view_to_all_bidders(
        &self,
        sender: String,
        contract: String,
        bidders: Option<Vec<String>>,
    ) -> Result<ReceiptRpc, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    #[method(name = "auction_getState")]
    async fn auction_get_state(&self, contract: String) -> Result<AuctionStateRpc, ErrorObjectOwned>;

    #[method(name = "auction_highestBidCipher")]
    async fn auction_highest_bid_cipher(&self, contract: String) -> Result<String, ErrorObjectOwned>;

    #[method(name = "auction_winnerCipher")]
    async fn auction_winner_cipher(&self, contract: String) -> Result<String, ErrorObjectOwned>;

    #[method(name = "auction_canViewAfterEnd")]
    async fn auction_can_view_after_end(
        &self,
        contract: String,
        identity: String,
    ) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "auction_seller")]
    async fn auction_seller(&self, contract: String) -> Result<String, ErrorObjectOwned>;

    /// Bidder registry as stored by the auction.
    #[method(name = "auction_bidders")]
    async fn auction_bidders(&self, contract: String) -> Result<Vec<String>, ErrorObjectOwned>;

    /// Committed events of an auction, oldest first.
    #[method(name = "auction_events")]
    async fn auction_events(&self, contract: String) -> Result<Vec<LogEntryRpc>, ErrorObjectOwned>;

    // ============ Coprocessor Methods ============

    /// Encrypt a bid amount for one (contract, user) pair.
    #[method(name = "fhe_encryptU64")]
    async fn fhe_encrypt_u64(
        &self,
        params: EncryptU64Params,
    ) -> Result<EncryptedInputRpc, ErrorObjectOwned>;

    /// Decrypt a handle for the signer of a permit, sealed to the permit's key.
    #[method(name = "fhe_userDecrypt")]
    async fn fhe_user_decrypt(
        &self,
        params: UserDecryptParams,
    ) -> Result<SealedValueRpc, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(ledger: Ledger<LocalCoprocessor>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChainState { ledger })),
        }
    }

    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }

    /// Reverted transaction; `data` carries the machine-readable reason.
    fn auction_error(e: AuctionError) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32001, e.to_string(), Some(e.reason()))
    }

    fn parse_address(s: &str) -> Result<Address, ErrorObjectOwned> {
        parse_address(s).ok_or_else(|| Self::rpc_error(&format!("Invalid address: {}", s)))
    }

    fn parse_handle(s: &str) -> Result<CipherHandle, ErrorObjectOwned> {
        CipherHandle::from_hex(s).ok_or_else(|| Self::rpc_error(&format!("Invalid handle: {}", s)))
    }

    fn parse_bytes<const N: usize>(s: &str, what: &str) -> Result<[u8; N], ErrorObjectOwned> {
        hex::decode(s.trim_start_matches("0x"))
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| Self::rpc_error(&format!("Invalid {}: {}", what, s)))
    }

    fn block_info(state: &ChainState) -> BlockInfo {
        BlockInfo {
            height: state.ledger.block_height(),
            timestamp: state.ledger.timestamp(),
        }
    }

    fn execute(&self, contract: &str, sender: &str, call: AuctionCall) -> Result<ReceiptRpc, ErrorObjectOwned> {
        let contract = Self::parse_address(contract)?;
        let sender = Self::parse_address(sender)?;
        let mut state = self.state.write();
        let receipt = state
            .ledger
            .execute(&contract, &sender, call)
            .map_err(Self::auction_error)?;
        Ok(ReceiptRpc::from(receipt))
    }

    fn query(&self, contract: &str, query: AuctionQuery) -> Result<AuctionQueryResponse, ErrorObjectOwned> {
        let contract = Self::parse_address(contract)?;
        let state = self.state.read();
        state.ledger.query(&contract, query).map_err(Self::auction_error)
    }

    fn unexpected_response() -> ErrorObjectOwned {
        Self::rpc_error("Unexpected query response")
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.ledger.set_timestamp(timestamp);
        info!(timestamp, "Timestamp set");
        Ok(Self::block_info(&state))
    }

    async fn admin_advance_time(&self, seconds: u64) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        let timestamp = state
            .ledger
            .advance_time(seconds)
            .map_err(Self::auction_error)?;
        info!(timestamp, "Time advanced");
        Ok(Self::block_info(&state))
    }

    async fn auction_deploy(&self, params: DeployAuctionParams) -> Result<String, ErrorObjectOwned> {
        let sender = Self::parse_address(&params.sender)?;
        let deploy = DeployParams {
            bidding_duration: params.bidding_duration,
            feedback: params.feedback,
        };
        let mut state = self.state.write();
        let address = state
            .ledger
            .deploy(&sender, deploy)
            .map_err(Self::auction_error)?;
        Ok(format_address(&address))
    }

    async fn auction_place_bid(&self, params: PlaceBidParams) -> Result<ReceiptRpc, ErrorObjectOwned> {
        let handle = Self::parse_handle(&params.handle)?;
        let proof = hex::decode(params.proof.trim_start_matches("0x"))
            .map_err(|e| Self::rpc_error(&format!("Invalid proof: {}", e)))?;
        let call = AuctionCall::PlaceBid {
            amount: ExternalEuint64(handle),
            proof: InputProof(proof),
        };
        self.execute(&params.contract, &params.sender, call)
    }

    async fn auction_finalize(
        &self,
        sender: String,
        contract: String,
    ) -> Result<ReceiptRpc, ErrorObjectOwned> {
        self.execute(&contract, &sender, AuctionCall::Finalize)
    }

    async fn auction_grant_view(
        &self,
        sender: String,
        contract: String,
        viewer: String,
    ) -> Result<ReceiptRpc, ErrorObjectOwned> {
        let viewer = Self::parse_address(&viewer)?;
        self.execute(&contract, &sender, AuctionCall::GrantView { viewer })
    }

    async fn auction_grant_view_to_all_bidders(
        &self,
        sender: String,
        contract: String,
        bidders: Option<Vec<String>>,
    ) -> Result<ReceiptRpc, ErrorObjectOwned> {
        let call = match bidders {
            Some(list) => AuctionCall::GrantViewToAllBidders {
                bidders: list
                    .iter()
                    .map(|b| Self::parse_address(b))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            None => AuctionCall::GrantViewToRegisteredBidders,
        };
        self.execute(&contract, &sender, call)
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(Self::block_info(&state))
    }

    async fn auction_get_state(&self, contract: String) -> Result<AuctionStateRpc, ErrorObjectOwned> {
        match self.query(&contract, AuctionQuery::GetState)? {
            AuctionQueryResponse::State(snapshot) => Ok(snapshot.into()),
            _ => Err(Self::unexpected_response()),
        }
    }

    async fn auction_highest_bid_cipher(&self, contract: String) -> Result<String, ErrorObjectOwned> {
        match self.query(&contract, AuctionQuery::HighestBidCipher)? {
            AuctionQueryResponse::HighestBidCipher(h) => Ok(h.handle().to_hex()),
            _ => Err(Self::unexpected_response()),
        }
    }

    async fn auction_winner_cipher(&self, contract: String) -> Result<String, ErrorObjectOwned> {
        match self.query(&contract, AuctionQuery::WinnerCipher)? {
            AuctionQueryResponse::WinnerCipher(h) => Ok(h.handle().to_hex()),
            _ => Err(Self::unexpected_response()),
        }
    }

    async fn auction_can_view_after_end(
        &self,
        contract: String,
        identity: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let identity = Self::parse_address(&identity)?;
        match self.query(&contract, AuctionQuery::CanViewAfterEnd { identity })? {
            AuctionQueryResponse::CanViewAfterEnd(allowed) => Ok(allowed),
            _ => Err(Self::unexpected_response()),
        }
    }

    async fn auction_seller(&self, contract: String) -> Result<String, ErrorObjectOwned> {
        match self.query(&contract, AuctionQuery::Seller)? {
            AuctionQueryResponse::Seller(seller) => Ok(format_address(&seller)),
            _ => Err(Self::unexpected_response()),
        }
    }

    async fn auction_bidders(&self, contract: String) -> Result<Vec<String>, ErrorObjectOwned> {
        match self.query(&contract, AuctionQuery::Bidders)? {
            AuctionQueryResponse::Bidders(bidders) => {
                Ok(bidders.iter().map(format_address).collect())
            }
            _ => Err(Self::unexpected_response()),
        }
    }

    async fn auction_events(&self, contract: String) -> Result<Vec<LogEntryRpc>, ErrorObjectOwned> {
        let contract = Self::parse_address(&contract)?;
        let state = self.state.read();
        Ok(state
            .ledger
            .events(&contract)
            .iter()
            .map(LogEntryRpc::from)
            .collect())
    }

    async fn fhe_encrypt_u64(
        &self,
        params: EncryptU64Params,
    ) -> Result<EncryptedInputRpc, ErrorObjectOwned> {
        let contract = Self::parse_address(&params.contract)?;
        let user = Self::parse_address(&params.user)?;
        let state = self.state.read();
        let input = state
            .ledger
            .engine()
            .create_encrypted_input(&contract, &user)
            .and_then(|mut builder| builder.add_u64(params.value).encrypt(&mut OsRng))
            .map_err(|e| Self::rpc_error(&format!("Encryption failed: {}", e)))?;
        EncryptedInputRpc::from_input(&input).ok_or_else(|| Self::rpc_error("Empty input batch"))
    }

    async fn fhe_user_decrypt(
        &self,
        params: UserDecryptParams,
    ) -> Result<SealedValueRpc, ErrorObjectOwned> {
        let handle = Self::parse_handle(&params.handle)?;
        let request = UserDecryptRequest {
            user: Self::parse_address(&params.user)?,
            contract: Self::parse_address(&params.contract)?,
            start_timestamp: params.start_timestamp,
            duration_days: params.duration_days,
            reencryption_key: Self::parse_bytes(&params.reencryption_key, "reencryption key")?,
            wallet_key: Self::parse_bytes(&params.wallet_key, "wallet key")?,
            signature: Self::parse_bytes(&params.signature, "signature")?,
        };
        let state = self.state.read();
        let sealed = state
            .ledger
            .engine()
            .user_decrypt(handle, &request, state.ledger.timestamp(), &mut OsRng)
            .map_err(|e| Self::rpc_error(&format!("Decryption refused: {}", e)))?;
        Ok(sealed.into())
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AuctionGenesisConfig> {
    let Some(path) = path else {
        return Ok(AuctionGenesisConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("auction_module=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let timestamp = match cli.timestamp {
        Some(ts) => ts,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };
    let ledger = Ledger::new(LocalCoprocessor::random(&mut OsRng), config, timestamp)?;

    info!("Starting mock chain server on {}", cli.listen);

    let server = Server::builder().build(cli.listen).await?;
    let handle = server.start(MockChainServer::new(ledger).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
