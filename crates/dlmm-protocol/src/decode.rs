//! Fixed-offset account decoders for the wrapper and DLMM wire protocol (§4.A, §6).
//! Pure functions: no I/O, safe to call from any task. Every decoder fails
//! closed with `DecodeFailed` on a length mismatch rather than reading
//! out-of-bounds or guessing.
use keeper_types::{is_benign_log, KeeperError, KeeperResult, Pool, TokenProgramKind};
use solana_program::pubkey::Pubkey;

pub const POOL_ACCOUNT_LEN: usize = 904;
pub const POSITION_ACCOUNT_LEN: usize = 138;
pub const CONFIG_ACCOUNT_MIN_LEN: usize = 138;
pub const BIN_ARRAY_HEADER_LEN: usize = 56;
pub const BIN_ARRAY_BIN_LEN: usize = 144;
pub const BIN_ARRAY_BIN_COUNT: usize = 70;
pub const BIN_ARRAY_ACCOUNT_LEN: usize =
    BIN_ARRAY_HEADER_LEN + BIN_ARRAY_BIN_COUNT * BIN_ARRAY_BIN_LEN;

fn read_i32_le(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(data[offset..offset + 2].try_into().unwrap())
}

fn read_u64_le(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap())
}

fn read_i64_le(data: &[u8], offset: usize) -> i64 {
    i64::from_le_bytes(data[offset..offset + 8].try_into().unwrap())
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    Pubkey::new_from_array(data[offset..offset + 32].try_into().unwrap())
}

fn token_program_kind(flag: u8) -> TokenProgramKind {
    if flag == 0 {
        TokenProgramKind::Spl
    } else {
        TokenProgramKind::Token2022
    }
}

/// Decode an `LbPair` account (§6): `active_bin_id`@76 i32 LE, `bin_step`@80
/// u16 LE, token X/Y mint at 88/120, reserves at 152/184, token-program flags
/// at 880/881. Decimals and symbols aren't part of the pool account itself;
/// the caller supplies them from the already-fetched mint accounts.
#[allow(clippy::too_many_arguments)]
pub fn decode_pool(
    address: Pubkey,
    data: &[u8],
    decimals_x: u8,
    decimals_y: u8,
    symbol_x: Option<String>,
    symbol_y: Option<String>,
    last_updated_slot: u64,
) -> KeeperResult<Pool> {
    if data.len() != POOL_ACCOUNT_LEN {
        return Err(KeeperError::decode_failed(format!(
            "pool account length {} != {POOL_ACCOUNT_LEN}",
            data.len()
        )));
    }
    Ok(Pool {
        address,
        active_bin_id: read_i32_le(data, 76),
        bin_step: read_u16_le(data, 80),
        token_x_mint: read_pubkey(data, 88),
        token_y_mint: read_pubkey(data, 120),
        symbol_x,
        symbol_y,
        decimals_x,
        decimals_y,
        reserve_x: read_pubkey(data, 152),
        reserve_y: read_pubkey(data, 184),
        token_program_x: token_program_kind(data[880]),
        token_program_y: token_program_kind(data[881]),
        last_updated_slot,
    })
}

/// Decoded wrapper position account, prior to classification into
/// [`keeper_types::Position`] (which additionally needs the owning pool's
/// `active_bin_id` to validate the open-time invariants).
pub struct DecodedPosition {
    pub pda: Pubkey,
    pub owner: Pubkey,
    pub pool: Pubkey,
    pub liquidity_position: Pubkey,
    pub side_flag: u8,
    pub min_bin: i32,
    pub max_bin: i32,
    pub initial_deposit: u64,
    pub cumulative_harvested: u64,
    pub created_at: i64,
    pub bump: u8,
}

/// Decode a wrapper position account (§6, exactly 138 bytes): 8-byte
/// discriminator, owner/pool/liquidity_position pubkeys, a 1-byte side flag
/// (0 = Sell, 1 = Buy), min/max bin as i32 LE, two u64 LE amounts, an i64 LE
/// timestamp, and a trailing bump byte.
pub fn decode_position(address: Pubkey, data: &[u8]) -> KeeperResult<DecodedPosition> {
    if data.len() != POSITION_ACCOUNT_LEN {
        return Err(KeeperError::decode_failed(format!(
            "position account length {} != {POSITION_ACCOUNT_LEN}",
            data.len()
        )));
    }
    Ok(DecodedPosition {
        pda: address,
        owner: read_pubkey(data, 8),
        pool: read_pubkey(data, 40),
        liquidity_position: read_pubkey(data, 72),
        side_flag: data[104],
        min_bin: read_i32_le(data, 105),
        max_bin: read_i32_le(data, 109),
        initial_deposit: read_u64_le(data, 113),
        cumulative_harvested: read_u64_le(data, 121),
        created_at: read_i64_le(data, 129),
        bump: data[137],
    })
}

/// Config account fields the keeper actually reads: the admin authority and
/// an optional fee-bps override. The account reserves space up to at least
/// [`CONFIG_ACCOUNT_MIN_LEN`] bytes for forward-compatible fields the keeper
/// doesn't interpret.
pub struct DecodedConfig {
    pub authority: Pubkey,
    pub fee_bps_override: Option<u16>,
}

pub fn decode_config(data: &[u8]) -> KeeperResult<DecodedConfig> {
    if data.len() < CONFIG_ACCOUNT_MIN_LEN {
        return Err(KeeperError::decode_failed(format!(
            "config account length {} < {CONFIG_ACCOUNT_MIN_LEN}",
            data.len()
        )));
    }
    let authority = read_pubkey(data, 8);
    let override_flag = data[40];
    let fee_bps_override = if override_flag != 0 {
        Some(read_u16_le(data, 41))
    } else {
        None
    };
    Ok(DecodedConfig {
        authority,
        fee_bps_override,
    })
}

/// One bin's reserves within a bin-array account.
#[derive(Debug, Clone, Copy)]
pub struct BinAmounts {
    pub amount_x: u64,
    pub amount_y: u64,
}

#[derive(Debug, Clone)]
pub struct DecodedBinArray {
    pub index: i64,
    pub pool: Pubkey,
    pub bins: Vec<BinAmounts>,
}

/// Decode a bin-array account (§6): 56-byte header (discriminator 8, index 8
/// signed, version 1, padding 7, pool 32) followed by 70 bins of 144 bytes
/// each; `amount_x` at bin offset 0, `amount_y` at offset 8.
pub fn decode_bin_array(data: &[u8]) -> KeeperResult<DecodedBinArray> {
    if data.len() != BIN_ARRAY_ACCOUNT_LEN {
        return Err(KeeperError::decode_failed(format!(
            "bin-array account length {} != {BIN_ARRAY_ACCOUNT_LEN}",
            data.len()
        )));
    }
    let index = read_i64_le(data, 8);
    let pool = read_pubkey(data, 24);
    let mut bins = Vec::with_capacity(BIN_ARRAY_BIN_COUNT);
    for i in 0..BIN_ARRAY_BIN_COUNT {
        let bin_offset = BIN_ARRAY_HEADER_LEN + i * BIN_ARRAY_BIN_LEN;
        bins.push(BinAmounts {
            amount_x: read_u64_le(data, bin_offset),
            amount_y: read_u64_le(data, bin_offset + 8),
        });
    }
    Ok(DecodedBinArray { index, pool, bins })
}

/// True if `log` matches one of the protocol's recoverable program-error
/// markers (re-exported here so codec callers don't need a second import).
pub fn is_recoverable_log(log: &str) -> bool {
    is_benign_log(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_fixture() -> Vec<u8> {
        let mut data = vec![0u8; POOL_ACCOUNT_LEN];
        data[76..80].copy_from_slice(&115i32.to_le_bytes());
        data[80..82].copy_from_slice(&10u16.to_le_bytes());
        let mint_x = Pubkey::new_unique();
        let mint_y = Pubkey::new_unique();
        data[88..120].copy_from_slice(mint_x.as_ref());
        data[120..152].copy_from_slice(mint_y.as_ref());
        let reserve_x = Pubkey::new_unique();
        let reserve_y = Pubkey::new_unique();
        data[152..184].copy_from_slice(reserve_x.as_ref());
        data[184..216].copy_from_slice(reserve_y.as_ref());
        data[880] = 0;
        data[881] = 1;
        data
    }

    #[test]
    fn decode_pool_reads_fields_at_documented_offsets() {
        let data = pool_fixture();
        let pool = decode_pool(
            Pubkey::new_unique(),
            &data,
            9,
            6,
            Some("SOL".to_string()),
            Some("USDC".to_string()),
            42,
        )
        .unwrap();
        assert_eq!(pool.active_bin_id, 115);
        assert_eq!(pool.bin_step, 10);
        assert_eq!(pool.token_program_x, TokenProgramKind::Spl);
        assert_eq!(pool.token_program_y, TokenProgramKind::Token2022);
        assert_eq!(pool.last_updated_slot, 42);
    }

    #[test]
    fn decode_pool_rejects_wrong_length() {
        let data = vec![0u8; POOL_ACCOUNT_LEN - 1];
        let err = decode_pool(Pubkey::new_unique(), &data, 9, 6, None, None, 0).unwrap_err();
        assert!(matches!(err, KeeperError::DecodeFailed(_)));
    }

    #[test]
    fn decode_position_rejects_wrong_length() {
        let data = vec![0u8; POSITION_ACCOUNT_LEN + 1];
        assert!(decode_position(Pubkey::new_unique(), &data).is_err());
    }

    #[test]
    fn decode_position_reads_side_flag_and_bins() {
        let mut data = vec![0u8; POSITION_ACCOUNT_LEN];
        data[104] = 1; // Buy
        data[105..109].copy_from_slice(&10i32.to_le_bytes());
        data[109..113].copy_from_slice(&20i32.to_le_bytes());
        let decoded = decode_position(Pubkey::new_unique(), &data).unwrap();
        assert_eq!(decoded.side_flag, 1);
        assert_eq!(decoded.min_bin, 10);
        assert_eq!(decoded.max_bin, 20);
    }

    #[test]
    fn decode_bin_array_round_trips_amounts() {
        let mut data = vec![0u8; BIN_ARRAY_ACCOUNT_LEN];
        data[8..16].copy_from_slice(&(-3i64).to_le_bytes());
        let pool = Pubkey::new_unique();
        data[24..56].copy_from_slice(pool.as_ref());
        let bin5_offset = BIN_ARRAY_HEADER_LEN + 5 * BIN_ARRAY_BIN_LEN;
        data[bin5_offset..bin5_offset + 8].copy_from_slice(&1_000u64.to_le_bytes());
        data[bin5_offset + 8..bin5_offset + 16].copy_from_slice(&2_000u64.to_le_bytes());

        let decoded = decode_bin_array(&data).unwrap();
        assert_eq!(decoded.index, -3);
        assert_eq!(decoded.pool, pool);
        assert_eq!(decoded.bins.len(), BIN_ARRAY_BIN_COUNT);
        assert_eq!(decoded.bins[5].amount_x, 1_000);
        assert_eq!(decoded.bins[5].amount_y, 2_000);
    }

    #[test]
    fn decode_bin_array_rejects_short_buffer() {
        let data = vec![0u8; BIN_ARRAY_HEADER_LEN];
        assert!(decode_bin_array(&data).is_err());
    }
}
