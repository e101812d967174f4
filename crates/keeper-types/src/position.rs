use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::error::{KeeperError, KeeperResult};

/// Maximum inclusive bin-range width, and the hard per-transaction bin cap (§3, §6).
pub const MAX_BIN_RANGE_WIDTH: u32 = 70;
pub const MAX_BINS_PER_HARVEST: usize = 70;

/// Which side of the active bin a position was opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Buy,
    Sell,
}

/// A wrapper-owned position, keyed by its PDA.
///
/// Owned exclusively by the Position Registry; mutated only by harvest
/// (`cumulative_harvested`) and close (destruction) per §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub pda: Pubkey,
    pub owner: Pubkey,
    pub pool: Pubkey,
    pub liquidity_position: Pubkey,
    pub side: Side,
    pub min_bin: i32,
    pub max_bin: i32,
    pub initial_deposit: u64,
    pub cumulative_harvested: u64,
    pub created_at: i64,
}

impl Position {
    pub fn width(&self) -> u32 {
        (self.max_bin - self.min_bin + 1) as u32
    }

    /// Validate the open-time range invariants (§3, §6):
    /// `min_bin <= max_bin`, width <= 70, and the side-specific non-overlap rule.
    pub fn validate_open(&self, active_bin_id: i32) -> KeeperResult<()> {
        if self.min_bin > self.max_bin {
            return Err(KeeperError::invalid_parameter(
                "min_bin",
                self.min_bin.to_string(),
                format!("<= max_bin ({})", self.max_bin),
            ));
        }
        if self.width() > MAX_BIN_RANGE_WIDTH {
            return Err(KeeperError::invalid_parameter(
                "range_width",
                self.width().to_string(),
                format!("<= {MAX_BIN_RANGE_WIDTH}"),
            ));
        }
        match self.side {
            Side::Buy if self.max_bin >= active_bin_id => {
                Err(KeeperError::invalid_parameter(
                    "max_bin",
                    self.max_bin.to_string(),
                    format!("< active_bin_id ({active_bin_id})"),
                ))
            }
            Side::Sell if self.min_bin <= active_bin_id => {
                Err(KeeperError::invalid_parameter(
                    "min_bin",
                    self.min_bin.to_string(),
                    format!("> active_bin_id ({active_bin_id})"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Bin ids in `[min_bin, max_bin]` on the harvestable side of `active_bin_id`,
    /// ordered per the §4.D tie-break (lowest-first for Buy, highest-first for Sell),
    /// capped at [`MAX_BINS_PER_HARVEST`].
    pub fn safe_bins(&self, active_bin_id: i32) -> Vec<i32> {
        let mut bins: Vec<i32> = match self.side {
            Side::Sell => (self.min_bin..=self.max_bin)
                .filter(|&b| b < active_bin_id)
                .collect(),
            Side::Buy => (self.min_bin..=self.max_bin)
                .filter(|&b| b > active_bin_id)
                .collect(),
        };
        match self.side {
            // Sell fills from the top down as price falls through it; highest-first.
            Side::Sell => bins.sort_unstable_by(|a, b| b.cmp(a)),
            // Buy fills from the bottom up as price rises through it; lowest-first.
            Side::Buy => bins.sort_unstable(),
        }
        bins.truncate(MAX_BINS_PER_HARVEST);
        bins
    }

    pub fn safe_bin_count(&self, active_bin_id: i32) -> usize {
        match self.side {
            Side::Sell => (self.min_bin..=self.max_bin)
                .filter(|&b| b < active_bin_id)
                .count(),
            Side::Buy => (self.min_bin..=self.max_bin)
                .filter(|&b| b > active_bin_id)
                .count(),
        }
    }

    pub fn is_harvestable(&self, active_bin_id: i32) -> bool {
        self.safe_bin_count(active_bin_id) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sell_position(min: i32, max: i32) -> Position {
        Position {
            pda: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            liquidity_position: Pubkey::new_unique(),
            side: Side::Sell,
            min_bin: min,
            max_bin: max,
            initial_deposit: 1_000_000,
            cumulative_harvested: 0,
            created_at: 0,
        }
    }

    #[test]
    fn scenario_1_sell_safe_bins() {
        // §8 scenario 1: active=100 bin_step=10, Sell [110,120], push active=115.
        let pos = sell_position(110, 120);
        assert_eq!(pos.safe_bin_count(115), 5);
        assert_eq!(pos.safe_bins(115), vec![114, 113, 112, 111, 110]);
    }

    #[test]
    fn buy_safe_bins_are_lowest_first() {
        let mut pos = sell_position(80, 90);
        pos.side = Side::Buy;
        assert_eq!(pos.safe_bins(85), vec![86, 87, 88, 89, 90]);
    }

    #[test]
    fn boundary_active_equal_to_max_is_not_safe_for_sell() {
        let pos = sell_position(100, 110);
        assert_eq!(pos.safe_bin_count(110), 9); // 100..=109, strictly below 110
        assert_eq!(pos.safe_bin_count(111), 10);
    }

    #[test]
    fn width_exactly_70_is_valid() {
        let pos = sell_position(0, 69);
        assert_eq!(pos.width(), 70);
        assert!(pos.validate_open(-1).is_ok());
    }

    #[test]
    fn width_over_70_is_rejected() {
        let pos = sell_position(0, 70);
        assert!(pos.validate_open(-1).is_err());
    }

    #[test]
    fn scenario_5_buy_equal_to_active_is_rejected() {
        let mut pos = sell_position(90, 100);
        pos.side = Side::Buy;
        // max_bin == active_bin_id must be rejected, not just max_bin > active.
        assert!(pos.validate_open(100).is_err());
    }

    #[test]
    fn caps_bins_at_seventy_per_harvest() {
        let pos = sell_position(0, 200);
        let bins = pos.safe_bins(201);
        assert_eq!(bins.len(), MAX_BINS_PER_HARVEST);
    }
}
