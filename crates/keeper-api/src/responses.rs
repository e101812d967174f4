//! JSON response shapes for the Public API (§4.G), modeled on the teacher's
//! `api/responses.rs` — one plain struct per endpoint, `camelCase` on the
//! wire to match the frontend's existing event/field naming convention
//! (`keeper_types::Event` uses the same `rename_all`).
use serde::Serialize;
use solana_program::pubkey::Pubkey;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshotResponse {
    pub address: Pubkey,
    pub active_bin_id: i32,
    pub bin_step: u16,
    pub token_x_mint: Pubkey,
    pub token_y_mint: Pubkey,
    pub symbol_x: Option<String>,
    pub symbol_y: Option<String>,
    pub decimals_x: u8,
    pub decimals_y: u8,
    pub last_updated_slot: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinReserveEntry {
    pub bin_id: i32,
    pub amount_x: u64,
    pub amount_y: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBinsResponse {
    pub pool: Pubkey,
    pub owner: Pubkey,
    pub bins: Vec<BinReserveEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingHarvestEntry {
    pub position_pda: Pubkey,
    pub lb_pair: Pubkey,
    pub owner: Pubkey,
    pub side: keeper_types::Side,
    pub safe_bin_count: usize,
    pub total_bins: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingHarvestsResponse {
    pub pending: Vec<PendingHarvestEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBookResponse {
    pub active: Vec<keeper_types::AddressBookEntry>,
    pub recent: Vec<keeper_types::AddressBookEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub position_count: usize,
    pub total_harvests: u64,
    pub stream_connected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransactionResponse {
    /// `bincode`-serialized, base64-encoded `Transaction` with the
    /// caller set as fee payer and no signatures attached yet (§4.I).
    pub transaction: String,
    pub expires_at_slot: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCrankResponse {
    pub signature: String,
}
