pub mod decode;
pub mod instructions;
pub mod pda;

pub use decode::{
    decode_bin_array, decode_config, decode_pool, decode_position, is_recoverable_log,
    BinAmounts, DecodedBinArray, DecodedConfig, DecodedPosition, BIN_ARRAY_ACCOUNT_LEN,
    CONFIG_ACCOUNT_MIN_LEN, POOL_ACCOUNT_LEN, POSITION_ACCOUNT_LEN,
};
pub use pda::fee_rover_width;

use keeper_types::{KeeperError, KeeperResult, Position, Side};
use solana_program::pubkey::Pubkey;

/// Lift a freshly decoded position account into the domain type the rest of
/// the keeper operates on, resolving the wire-level side flag into [`Side`].
pub fn position_from_decoded(decoded: DecodedPosition) -> KeeperResult<Position> {
    let side = match decoded.side_flag {
        0 => Side::Sell,
        1 => Side::Buy,
        other => {
            return Err(KeeperError::decode_failed(format!(
                "unrecognized side flag {other}"
            )))
        }
    };
    Ok(Position {
        pda: decoded.pda,
        owner: decoded.owner,
        pool: decoded.pool,
        liquidity_position: decoded.liquidity_position,
        side,
        min_bin: decoded.min_bin,
        max_bin: decoded.max_bin,
        initial_deposit: decoded.initial_deposit,
        cumulative_harvested: decoded.cumulative_harvested,
        created_at: decoded.created_at,
    })
}

/// Resolve the bin-array PDA(s) covering an inclusive bin range, collapsing
/// adjacent bins that share an array into a single account (§4.A, §4.E).
pub fn bin_array_pdas_for_range(
    pool: &Pubkey,
    min_bin: i32,
    max_bin: i32,
    dlmm_program_id: &Pubkey,
) -> Vec<Pubkey> {
    let first_index = pda::bin_array_index_for_bin(min_bin);
    let last_index = pda::bin_array_index_for_bin(max_bin);
    (first_index..=last_index)
        .map(|index| pda::derive_bin_array_pda(pool, index, dlmm_program_id).0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_from_decoded_maps_side_flags() {
        let decoded = DecodedPosition {
            pda: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            liquidity_position: Pubkey::new_unique(),
            side_flag: 1,
            min_bin: 1,
            max_bin: 2,
            initial_deposit: 0,
            cumulative_harvested: 0,
            created_at: 0,
            bump: 255,
        };
        let position = position_from_decoded(decoded).unwrap();
        assert_eq!(position.side, Side::Buy);
    }

    #[test]
    fn position_from_decoded_rejects_unknown_flag() {
        let decoded = DecodedPosition {
            pda: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            liquidity_position: Pubkey::new_unique(),
            side_flag: 9,
            min_bin: 0,
            max_bin: 0,
            initial_deposit: 0,
            cumulative_harvested: 0,
            created_at: 0,
            bump: 0,
        };
        assert!(position_from_decoded(decoded).is_err());
    }

    #[test]
    fn bin_array_pdas_for_range_collapses_shared_arrays() {
        let pool = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let pdas = bin_array_pdas_for_range(&pool, 10, 20, &program);
        assert_eq!(pdas.len(), 1); // both bins fall in array index 0

        let pdas = bin_array_pdas_for_range(&pool, 65, 75, &program);
        assert_eq!(pdas.len(), 2); // spans arrays 0 and 1
    }
}
