//! Live RPC-backed implementations of the trait-abstracted lookups that
//! `stream-ingest` and `keeper-api` only see as `DecimalsLookup` /
//! `BinReserveLookup` — the counterpart to their `#[cfg(test)]` fakes.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dlmm_protocol::DecodedBinArray;
use keeper_api::BinReserveLookup;
use keeper_types::{KeeperError, KeeperResult};
use solana_client::nonblocking::rpc_client::RpcClient as AsyncRpcClient;
use solana_client::rpc_client::RpcClient as BlockingRpcClient;
use solana_program::pubkey::Pubkey;
use stream_ingest::DecimalsLookup;

/// SPL mint account layout offset for the `decimals` field (§6).
const MINT_DECIMALS_OFFSET: usize = 44;

pub struct RpcBinReserveLookup {
    rpc: Arc<AsyncRpcClient>,
}

impl RpcBinReserveLookup {
    pub fn new(rpc: Arc<AsyncRpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl BinReserveLookup for RpcBinReserveLookup {
    async fn fetch_bin_arrays(&self, pdas: &[Pubkey]) -> KeeperResult<Vec<DecodedBinArray>> {
        if pdas.is_empty() {
            return Ok(Vec::new());
        }
        let accounts = self
            .rpc
            .get_multiple_accounts(pdas)
            .await
            .map_err(|e| KeeperError::Network(e.to_string()))?;

        Ok(accounts
            .into_iter()
            .flatten()
            .filter_map(|account| dlmm_protocol::decode_bin_array(&account.data).ok())
            .collect())
    }
}

/// Mint decimals, resolved once per mint over a blocking RPC client and
/// cached thereafter. `stream-ingest`'s [`DecimalsLookup`] is synchronous
/// because the decode path it feeds never awaits, so this can't hold the
/// nonblocking client the rest of the keeper uses.
pub struct RpcDecimalsLookup {
    rpc: BlockingRpcClient,
    cache: RwLock<HashMap<Pubkey, u8>>,
}

impl RpcDecimalsLookup {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc: BlockingRpcClient::new(rpc_url),
            cache: RwLock::new(HashMap::new()),
        }
    }
}

/// Well-known mint addresses the keeper can label without a token registry.
/// Anything else surfaces with no symbol rather than a guessed one.
fn known_symbol(mint: &Pubkey) -> Option<&'static str> {
    match mint.to_string().as_str() {
        "So11111111111111111111111111111111111111112" => Some("SOL"),
        "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v" => Some("USDC"),
        "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB" => Some("USDT"),
        _ => None,
    }
}

impl DecimalsLookup for RpcDecimalsLookup {
    fn decimals_for(&self, mint: &Pubkey) -> Option<u8> {
        if let Some(decimals) = self.cache.read().unwrap().get(mint) {
            return Some(*decimals);
        }
        let account = self.rpc.get_account(mint).ok()?;
        let decimals = *account.data.get(MINT_DECIMALS_OFFSET)?;
        self.cache.write().unwrap().insert(*mint, decimals);
        Some(decimals)
    }

    fn symbol_for(&self, mint: &Pubkey) -> Option<String> {
        known_symbol(mint).map(str::to_string)
    }
}
