use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Which SPL token-program variant governs transfers for a given reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenProgramKind {
    Spl,
    Token2022,
}

/// A supervised DLMM pool (`LbPair`).
///
/// Owned exclusively by the Position Registry (§3); the scheduler and API
/// only ever see snapshots (`Pool::clone()`), never a live handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub address: Pubkey,
    pub active_bin_id: i32,
    pub bin_step: u16,
    pub token_x_mint: Pubkey,
    pub token_y_mint: Pubkey,
    /// Ticker symbol for each mint, resolved the same place decimals are
    /// (§4.B); `None` when the mint carries no resolvable metadata.
    pub symbol_x: Option<String>,
    pub symbol_y: Option<String>,
    pub decimals_x: u8,
    pub decimals_y: u8,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub token_program_x: TokenProgramKind,
    pub token_program_y: TokenProgramKind,
    /// Slot at which this snapshot was observed; used to order frames.
    pub last_updated_slot: u64,
}

impl Pool {
    /// `price(bin_id) = (1 + bin_step/10000)^bin_id * 10^(dec_x - dec_y)` (§3 Pricing).
    pub fn price_at_bin(&self, bin_id: i32) -> f64 {
        let step = 1.0 + (self.bin_step as f64) / 10_000.0;
        let decimals_adjustment = 10f64.powi(self.decimals_x as i32 - self.decimals_y as i32);
        step.powi(bin_id) * decimals_adjustment
    }

    /// Inverse of [`Pool::price_at_bin`], rounded to the nearest bin.
    pub fn bin_at_price(&self, price: f64) -> i32 {
        let step = 1.0 + (self.bin_step as f64) / 10_000.0;
        let decimals_adjustment = 10f64.powi(self.decimals_x as i32 - self.decimals_y as i32);
        (price / decimals_adjustment).ln() / step.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> Pool {
        Pool {
            address: Pubkey::new_unique(),
            active_bin_id: 100,
            bin_step: 10,
            token_x_mint: Pubkey::new_unique(),
            token_y_mint: Pubkey::new_unique(),
            symbol_x: Some("SOL".to_string()),
            symbol_y: Some("USDC".to_string()),
            decimals_x: 9,
            decimals_y: 6,
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            token_program_x: TokenProgramKind::Spl,
            token_program_y: TokenProgramKind::Token2022,
            last_updated_slot: 1,
        }
    }

    #[test]
    fn price_round_trip() {
        let pool = sample_pool();
        for bin in [-500, -1, 0, 1, 500] {
            let price = pool.price_at_bin(bin);
            let round_tripped = pool.bin_at_price(price).round() as i32;
            assert_eq!(round_tripped, bin, "bin {bin} did not round-trip");
        }
    }
}
