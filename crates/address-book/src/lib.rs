//! Per-wallet pool usage history, persisted across restarts (§3 AddressBookEntry, §4.J).
//!
//! Backed by a single RocksDB column family keyed `wallet || pool` (64
//! bytes); keys sort by wallet first, so every `(wallet, *)` entry is a
//! contiguous prefix scan. Append-then-compact is a property of RocksDB's
//! own compaction rather than hand-rolled log replay; [`AddressBook::compact`]
//! only prunes aged `Recent` entries on the ring retention policy, it doesn't
//! touch RocksDB's own on-disk compaction.
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use keeper_types::{
    address_book::{storage_key, DEFAULT_RECENT_RETENTION, DEFAULT_RETENTION_DAYS},
    AddressBookEntry, AddressBookStatus, KeeperError, KeeperResult,
};
use rocksdb::{IteratorMode, Options, DB};
use solana_program::pubkey::Pubkey;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct AddressBookConfig {
    pub recent_retention: usize,
    pub retention_days: i64,
}

impl Default for AddressBookConfig {
    fn default() -> Self {
        Self {
            recent_retention: DEFAULT_RECENT_RETENTION,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// `{active, recent}` listing shape returned by `GET /api/addressbook` (§4.G).
#[derive(Debug, Clone, Default)]
pub struct AddressBookListing {
    pub active: Vec<AddressBookEntry>,
    pub recent: Vec<AddressBookEntry>,
}

pub struct AddressBook {
    db: Arc<DB>,
    config: AddressBookConfig,
}

impl AddressBook {
    pub fn open(path: impl AsRef<Path>, config: AddressBookConfig) -> KeeperResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| KeeperError::invalid_config("address_book.path", e.to_string()))?;
        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    fn get_entry(&self, wallet: &Pubkey, pool: &Pubkey) -> KeeperResult<Option<AddressBookEntry>> {
        let key = storage_key(wallet, pool);
        match self
            .db
            .get(&key)
            .map_err(|e| KeeperError::Generic(e.to_string()))?
        {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(|e| KeeperError::Generic(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn put_entry(&self, entry: &AddressBookEntry) -> KeeperResult<()> {
        let key = entry.storage_key();
        let value =
            serde_json::to_vec(entry).map_err(|e| KeeperError::Generic(e.to_string()))?;
        self.db
            .put(key, value)
            .map_err(|e| KeeperError::Generic(e.to_string()))
    }

    /// Record a `positionChanged` observation for `(wallet, pool)` (§4.J):
    /// `delta` is `+1`/`-1` for an open/close, `0` for a plain touch that
    /// should only refresh `last_active` and (optionally) the cached pool name.
    pub fn record_activity(
        &self,
        wallet: Pubkey,
        pool: Pubkey,
        delta: i64,
        pool_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> KeeperResult<AddressBookEntry> {
        let mut entry = match self.get_entry(&wallet, &pool)? {
            Some(mut existing) => {
                existing.record_activity(delta, now);
                existing
            }
            None => {
                // `new` seeds open_position_count at 1; correct for it so
                // the net effect is exactly `delta`.
                let mut fresh = AddressBookEntry::new(wallet, pool, now);
                fresh.record_activity(delta - 1, now);
                fresh
            }
        };
        if let Some(name) = pool_name {
            entry.pool_name = Some(name.to_string());
        }
        self.put_entry(&entry)?;
        Ok(entry)
    }

    /// All entries for `wallet`, via the `wallet`-prefixed key range — no
    /// secondary index needed since the storage key is `wallet || pool`.
    pub fn entries_for_wallet(&self, wallet: &Pubkey) -> KeeperResult<Vec<AddressBookEntry>> {
        let prefix = wallet.as_ref().to_vec();
        let mut out = Vec::new();
        for item in self.db.prefix_iterator(&prefix) {
            let (key, value) = item.map_err(|e| KeeperError::Generic(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            out.push(
                serde_json::from_slice(&value).map_err(|e| KeeperError::Generic(e.to_string()))?,
            );
        }
        Ok(out)
    }

    /// `{active, recent}` listing for a wallet (§4.G, §8 scenario 6):
    /// `active` is every entry with `open_position_count > 0`; `recent` is
    /// the rest, sorted by `last_active` descending, capped at
    /// `recent_retention` and with aged-out entries excluded.
    pub fn listing_for_wallet(
        &self,
        wallet: &Pubkey,
        now: DateTime<Utc>,
    ) -> KeeperResult<AddressBookListing> {
        let entries = self.entries_for_wallet(wallet)?;
        let mut active = Vec::new();
        let mut recent = Vec::new();
        for entry in entries {
            if entry.is_expired(now, self.config.retention_days) {
                continue;
            }
            match entry.status {
                AddressBookStatus::Active => active.push(entry),
                AddressBookStatus::Recent => recent.push(entry),
            }
        }
        recent.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        recent.truncate(self.config.recent_retention);
        Ok(AddressBookListing { active, recent })
    }

    /// Periodic maintenance pass (§4.J "periodic compaction"): delete every
    /// `Recent` entry older than the retention window. Returns the count
    /// pruned. Run on a timer from the top-level binary, not per-request.
    pub fn compact(&self, now: DateTime<Utc>) -> KeeperResult<usize> {
        let mut pruned = 0usize;
        let mut stale_keys = Vec::new();
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, value) = item.map_err(|e| KeeperError::Generic(e.to_string()))?;
            let entry: AddressBookEntry =
                serde_json::from_slice(&value).map_err(|e| KeeperError::Generic(e.to_string()))?;
            if entry.is_expired(now, self.config.retention_days) {
                stale_keys.push(key);
            }
        }
        for key in stale_keys {
            self.db
                .delete(&key)
                .map_err(|e| KeeperError::Generic(e.to_string()))?;
            pruned += 1;
        }
        if pruned > 0 {
            info!(pruned, "compacted aged address-book entries");
        } else {
            debug!("address-book compaction found nothing to prune");
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_book() -> (AddressBook, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let book = AddressBook::open(dir.path(), AddressBookConfig::default()).unwrap();
        (book, dir)
    }

    #[test]
    fn scenario_6_three_open_in_a_one_closed_in_b() {
        let (book, _dir) = temp_book();
        let now = Utc::now();
        let wallet = Pubkey::new_unique();
        let pool_a = Pubkey::new_unique();
        let pool_b = Pubkey::new_unique();

        for _ in 0..3 {
            book.record_activity(wallet, pool_a, 1, Some("Pool A"), now)
                .unwrap();
        }
        book.record_activity(wallet, pool_b, 1, Some("Pool B"), now)
            .unwrap();
        book.record_activity(wallet, pool_b, -1, None, now).unwrap();

        let listing = book.listing_for_wallet(&wallet, now).unwrap();
        assert_eq!(listing.active.len(), 1);
        assert_eq!(listing.active[0].open_position_count, 3);
        assert_eq!(listing.active[0].pool, pool_a);
        assert_eq!(listing.recent.len(), 1);
        assert_eq!(listing.recent[0].pool, pool_b);
    }

    #[test]
    fn recent_entries_older_than_retention_are_excluded_from_listing() {
        let (book, _dir) = temp_book();
        let now = Utc::now();
        let wallet = Pubkey::new_unique();
        let pool = Pubkey::new_unique();

        let old = now - chrono::Duration::days(40);
        book.record_activity(wallet, pool, 1, None, old).unwrap();
        book.record_activity(wallet, pool, -1, None, old).unwrap();

        let listing = book.listing_for_wallet(&wallet, now).unwrap();
        assert!(listing.recent.is_empty());
        assert!(listing.active.is_empty());
    }

    #[test]
    fn recent_listing_is_capped_and_sorted_by_recency() {
        let (book, _dir) = temp_book();
        let now = Utc::now();
        let wallet = Pubkey::new_unique();

        for i in 0..20 {
            let pool = Pubkey::new_unique();
            let at = now - chrono::Duration::minutes(i);
            book.record_activity(wallet, pool, 1, None, at).unwrap();
            book.record_activity(wallet, pool, -1, None, at).unwrap();
        }

        let listing = book.listing_for_wallet(&wallet, now).unwrap();
        assert_eq!(listing.recent.len(), DEFAULT_RECENT_RETENTION);
        for pair in listing.recent.windows(2) {
            assert!(pair[0].last_active >= pair[1].last_active);
        }
    }

    #[test]
    fn compact_prunes_aged_recent_entries_from_disk() {
        let (book, _dir) = temp_book();
        let now = Utc::now();
        let wallet = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let old = now - chrono::Duration::days(40);

        book.record_activity(wallet, pool, 1, None, old).unwrap();
        book.record_activity(wallet, pool, -1, None, old).unwrap();

        let pruned = book.compact(now).unwrap();
        assert_eq!(pruned, 1);
        assert!(book.entries_for_wallet(&wallet).unwrap().is_empty());
    }
}
