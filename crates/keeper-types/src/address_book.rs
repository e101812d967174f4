use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Default number of most-recent entries kept per wallet once it has no more
/// open positions in a pool (§4.J "recent retention", K).
pub const DEFAULT_RECENT_RETENTION: usize = 16;

/// Default age after which a `Recent` entry is pruned (§4.J, T), in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressBookStatus {
    Active,
    Recent,
}

/// One `(wallet, pool)` relationship tracked for the UI's address book (§3, §4.J).
///
/// Persisted in RocksDB under key `wallet||pool`; promoted to `Active` the
/// instant `open_position_count` goes above zero and demoted to `Recent`
/// when it returns to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressBookEntry {
    pub wallet: Pubkey,
    pub pool: Pubkey,
    pub status: AddressBookStatus,
    pub open_position_count: u32,
    pub last_active: DateTime<Utc>,
    pub pool_name: Option<String>,
}

impl AddressBookEntry {
    pub fn new(wallet: Pubkey, pool: Pubkey, now: DateTime<Utc>) -> Self {
        Self {
            wallet,
            pool,
            status: AddressBookStatus::Active,
            open_position_count: 1,
            last_active: now,
            pool_name: None,
        }
    }

    pub fn storage_key(&self) -> Vec<u8> {
        storage_key(&self.wallet, &self.pool)
    }

    /// Apply a change in open-position count, updating status per the
    /// promotion rule (§4.J): `open_position_count > 0` implies `Active`.
    pub fn record_activity(&mut self, delta: i64, now: DateTime<Utc>) {
        self.open_position_count =
            (self.open_position_count as i64 + delta).max(0) as u32;
        self.last_active = now;
        self.status = if self.open_position_count > 0 {
            AddressBookStatus::Active
        } else {
            AddressBookStatus::Recent
        };
    }

    /// Whether this entry should be pruned in a compaction pass, given the
    /// retention window (§4.J). `Active` entries are never pruned.
    pub fn is_expired(&self, now: DateTime<Utc>, retention_days: i64) -> bool {
        matches!(self.status, AddressBookStatus::Recent)
            && now.signed_duration_since(self.last_active).num_days() >= retention_days
    }
}

pub fn storage_key(wallet: &Pubkey, pool: &Pubkey) -> Vec<u8> {
    let mut key = Vec::with_capacity(64);
    key.extend_from_slice(wallet.as_ref());
    key.extend_from_slice(pool.as_ref());
    key
}
