use solana_program::pubkey::Pubkey;

/// Transport-agnostic account update, decoupled from the Geyser wire format
/// so the classify/decode/diff pipeline never depends on `yellowstone` types.
#[derive(Debug, Clone)]
pub struct RawAccountUpdate {
    pub pubkey: Pubkey,
    pub data: Vec<u8>,
    pub slot: u64,
}

/// What kind of wrapper/DLMM account an update was classified as, by size
/// (§4.B "classify-by-size"). An update that matches none of the known
/// lengths is ignored rather than decoded speculatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Pool,
    Position,
    BinArray,
    Unknown,
}

pub fn classify_by_size(data: &[u8]) -> AccountKind {
    match data.len() {
        dlmm_protocol::POOL_ACCOUNT_LEN => AccountKind::Pool,
        dlmm_protocol::POSITION_ACCOUNT_LEN => AccountKind::Position,
        dlmm_protocol::BIN_ARRAY_ACCOUNT_LEN => AccountKind::BinArray,
        _ => AccountKind::Unknown,
    }
}
