//! PDA derivation for the wrapper and DLMM programs (§4.A, §6).
//! Single source of truth for every seed string the keeper needs.
use solana_program::pubkey::Pubkey;

pub const CONFIG_SEED: &[u8] = b"config";
pub const POSITION_SEED: &[u8] = b"position";
pub const VAULT_SEED: &[u8] = b"vault";
pub const ROVER_AUTHORITY_SEED: &[u8] = b"rover_authority";
pub const MONKE_STATE_SEED: &[u8] = b"monke_state";
pub const DIST_POOL_SEED: &[u8] = b"dist_pool";
pub const PROGRAM_VAULT_SEED: &[u8] = b"program_vault";
pub const BIN_ARRAY_SEED: &[u8] = b"bin_array";
pub const BITMAP_SEED: &[u8] = b"bitmap";
pub const EVENT_AUTHORITY_SEED: &[u8] = b"__event_authority";
pub const METADATA_SEED: &[u8] = b"metadata";

pub fn derive_config_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

pub fn derive_position_pda(position_key: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POSITION_SEED, position_key.as_ref()], program_id)
}

pub fn derive_vault_pda(position_key: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, position_key.as_ref()], program_id)
}

pub fn derive_rover_authority_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ROVER_AUTHORITY_SEED], program_id)
}

pub fn derive_monke_state_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MONKE_STATE_SEED], program_id)
}

pub fn derive_dist_pool_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[DIST_POOL_SEED], program_id)
}

pub fn derive_program_vault_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PROGRAM_VAULT_SEED], program_id)
}

/// `bin_array|<pool>|<i64 LE>`. The index is signed and two's-complement
/// encoded; negative indices are valid and distinct from their positive
/// counterparts (no sign-magnitude folding).
pub fn derive_bin_array_pda(pool: &Pubkey, index: i64, dlmm_program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[BIN_ARRAY_SEED, pool.as_ref(), &index.to_le_bytes()],
        dlmm_program_id,
    )
}

pub fn derive_bitmap_pda(pool: &Pubkey, dlmm_program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[BITMAP_SEED, pool.as_ref()], dlmm_program_id)
}

/// Resolve the account to pass for a pool's bin-array bitmap extension
/// (§6): the derived PDA when the pool actually carries one, else the DLMM
/// program id itself as a read-only placeholder. Callers check existence
/// with an RPC lookup before calling this; derivation alone can't tell
/// whether the account was ever initialized.
pub fn resolve_bitmap_extension(pool: &Pubkey, dlmm_program_id: &Pubkey, exists: bool) -> Pubkey {
    if exists {
        derive_bitmap_pda(pool, dlmm_program_id).0
    } else {
        *dlmm_program_id
    }
}

pub fn derive_event_authority_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[EVENT_AUTHORITY_SEED], program_id)
}

/// `metadata|<metaplex>|<mint>`, scoped to the Metaplex token-metadata program.
pub fn derive_metadata_pda(metaplex_program_id: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[METADATA_SEED, metaplex_program_id.as_ref(), mint.as_ref()],
        metaplex_program_id,
    )
}

/// Fee-rover open width per the protocol-given formula (§9 Open Question):
/// `width = min(70, max(1, 6931 / bin_step))`. Treated as protocol-given,
/// not derived here.
pub fn fee_rover_width(bin_step: u16) -> u32 {
    let raw = 6931u32 / (bin_step as u32).max(1);
    raw.clamp(1, 70)
}

/// Number of bins held per bin-array account (§6 bin-array layout).
pub const BINS_PER_ARRAY: i64 = 70;

/// Which bin-array index a given bin id falls into, matching the on-chain
/// convention of flooring toward negative infinity rather than truncating.
pub fn bin_array_index_for_bin(bin_id: i32) -> i64 {
    (bin_id as i64).div_euclid(BINS_PER_ARRAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_array_index_floors_toward_negative_infinity() {
        assert_eq!(bin_array_index_for_bin(0), 0);
        assert_eq!(bin_array_index_for_bin(69), 0);
        assert_eq!(bin_array_index_for_bin(70), 1);
        assert_eq!(bin_array_index_for_bin(-1), -1);
        assert_eq!(bin_array_index_for_bin(-70), -1);
        assert_eq!(bin_array_index_for_bin(-71), -2);
    }

    #[test]
    fn fee_rover_width_is_clamped_to_one_through_seventy() {
        assert_eq!(fee_rover_width(1), 70); // 6931 would overflow, clamp to 70
        assert_eq!(fee_rover_width(100), 69);
        assert_eq!(fee_rover_width(500), 13);
        assert_eq!(fee_rover_width(10_000), 1); // floor of 0 clamps up to 1
    }

    #[test]
    fn resolve_bitmap_extension_falls_back_to_program_id_when_absent() {
        let pool = Pubkey::new_unique();
        let dlmm_program = Pubkey::new_unique();
        assert_eq!(
            resolve_bitmap_extension(&pool, &dlmm_program, false),
            dlmm_program
        );
    }

    #[test]
    fn resolve_bitmap_extension_derives_pda_when_present() {
        let pool = Pubkey::new_unique();
        let dlmm_program = Pubkey::new_unique();
        let (expected, _) = derive_bitmap_pda(&pool, &dlmm_program);
        assert_eq!(
            resolve_bitmap_extension(&pool, &dlmm_program, true),
            expected
        );
    }

    #[test]
    fn bin_array_pda_is_deterministic_and_distinguishes_sign() {
        let pool = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let (pos, _) = derive_bin_array_pda(&pool, 3, &program);
        let (neg, _) = derive_bin_array_pda(&pool, -3, &program);
        assert_ne!(pos, neg);
        let (pos_again, _) = derive_bin_array_pda(&pool, 3, &program);
        assert_eq!(pos, pos_again);
    }
}
