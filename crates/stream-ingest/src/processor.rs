use dlmm_protocol::{decode_bin_array, decode_pool, decode_position, position_from_decoded};
use keeper_types::{Event, PositionChangeAction};
use position_registry::PositionRegistry;
use solana_program::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::types::{classify_by_size, AccountKind, RawAccountUpdate};

/// Mint decimals the codec needs but the pool account doesn't carry itself;
/// resolved once per mint and cached by the caller.
pub trait DecimalsLookup: Send + Sync {
    fn decimals_for(&self, mint: &Pubkey) -> Option<u8>;

    /// Ticker symbol for the mint, resolved at the same point as decimals
    /// (§4.G pool snapshot "token mints and symbols"). `None` by default;
    /// implementations that can't resolve a symbol for every mint should
    /// leave unknown ones as `None` rather than fail the whole lookup.
    fn symbol_for(&self, _mint: &Pubkey) -> Option<String> {
        None
    }
}

/// Consumes raw account updates, decodes them by size, reconciles against
/// the registry, and returns the events the change implies (§4.B).
pub struct StreamProcessor<'a> {
    registry: &'a PositionRegistry,
}

impl<'a> StreamProcessor<'a> {
    pub fn new(registry: &'a PositionRegistry) -> Self {
        Self { registry }
    }

    pub async fn process(
        &self,
        update: RawAccountUpdate,
        decimals: &dyn DecimalsLookup,
    ) -> Vec<Event> {
        match classify_by_size(&update.data) {
            AccountKind::Pool => self.process_pool(update, decimals).await,
            AccountKind::Position => self.process_position(update).await,
            AccountKind::BinArray => {
                // Bin-array reserves feed the fee-rover TVL surface; the
                // registry doesn't index them directly (§4.C only tracks
                // pools and positions), so decoding here only validates shape.
                if let Err(err) = decode_bin_array(&update.data) {
                    warn!(pubkey = %update.pubkey, %err, "failed to decode bin-array account");
                }
                Vec::new()
            }
            AccountKind::Unknown => {
                debug!(pubkey = %update.pubkey, len = update.data.len(), "ignoring account of unrecognized size");
                Vec::new()
            }
        }
    }

    async fn process_pool(
        &self,
        update: RawAccountUpdate,
        decimals: &dyn DecimalsLookup,
    ) -> Vec<Event> {
        let previous = self.registry.get_pool(&update.pubkey).await.ok();

        // The account itself doesn't carry mint decimals or symbols; look
        // them up from the already-decoded account if we have one, else
        // fall back to the provided lookup (populated from the mint
        // accounts at load time).
        let (decimals_x, decimals_y, symbol_x, symbol_y) = match &previous {
            Some(pool) => (
                pool.decimals_x,
                pool.decimals_y,
                pool.symbol_x.clone(),
                pool.symbol_y.clone(),
            ),
            None => {
                let mint_x = solana_program::pubkey::Pubkey::new_from_array(
                    update.data[88..120].try_into().unwrap_or([0u8; 32]),
                );
                let mint_y = solana_program::pubkey::Pubkey::new_from_array(
                    update.data[120..152].try_into().unwrap_or([0u8; 32]),
                );
                (
                    decimals.decimals_for(&mint_x).unwrap_or(9),
                    decimals.decimals_for(&mint_y).unwrap_or(9),
                    decimals.symbol_for(&mint_x),
                    decimals.symbol_for(&mint_y),
                )
            }
        };

        let pool = match decode_pool(
            update.pubkey,
            &update.data,
            decimals_x,
            decimals_y,
            symbol_x,
            symbol_y,
            update.slot,
        ) {
            Ok(pool) => pool,
            Err(err) => {
                warn!(pubkey = %update.pubkey, %err, "failed to decode pool account");
                return Vec::new();
            }
        };

        // Stale frame: a slower path delivered an update for a slot we've
        // already applied. Drop it rather than regressing active_bin_id.
        if let Some(prev) = &previous {
            if pool.last_updated_slot <= prev.last_updated_slot {
                return Vec::new();
            }
        }

        let previous_bin_id = previous.as_ref().map(|p| p.active_bin_id);
        self.registry.upsert_pool(pool.clone()).await;

        match previous_bin_id {
            Some(prev_bin) if prev_bin != pool.active_bin_id => vec![Event::ActiveBinChanged {
                pool: pool.address,
                previous_bin_id: prev_bin,
                active_bin_id: pool.active_bin_id,
                slot: pool.last_updated_slot,
            }],
            _ => Vec::new(),
        }
    }

    async fn process_position(&self, update: RawAccountUpdate) -> Vec<Event> {
        let decoded = match decode_position(update.pubkey, &update.data) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(pubkey = %update.pubkey, %err, "failed to decode position account");
                return Vec::new();
            }
        };
        let position = match position_from_decoded(decoded) {
            Ok(position) => position,
            Err(err) => {
                warn!(pubkey = %update.pubkey, %err, "failed to interpret position account");
                return Vec::new();
            }
        };

        let owner = position.owner;
        let pool = position.pool;
        let pda = position.pda;

        let active_bin_id = match self.registry.get_pool(&pool).await {
            Ok(p) => p.active_bin_id,
            Err(_) => {
                // Pool not loaded yet; registry upsert will load it on demand.
                0
            }
        };

        if let Err(err) = position.validate_open(active_bin_id) {
            return vec![Event::position_rejected(pda, owner, pool, &err.to_string())];
        }

        // First observation of this PDA is an on-chain open (§4.J "on each
        // observed positionChanged ... increment O's open count"); anything
        // already indexed is just a reconciling update to the same position.
        let is_new = self.registry.get_position(&pda).await.is_err();

        let result = self
            .registry
            .upsert_position(position, |missing_pool| async move {
                Err(keeper_types::KeeperError::Inconsistent(format!(
                    "pool {missing_pool} not loaded"
                )))
            })
            .await;

        match result {
            Ok(()) => vec![Event::PositionChanged {
                position: pda,
                owner,
                pool,
                action: if is_new {
                    PositionChangeAction::Opened
                } else {
                    PositionChangeAction::Updated
                },
                reason: None,
            }],
            Err(err) => {
                warn!(pubkey = %pda, %err, "dropping position update for unloaded pool");
                Vec::new()
            }
        }
    }

    /// Handle an account-gone notification: remove the position and emit a
    /// `positionClosed` event if it was known.
    pub async fn process_removal(&self, pda: &Pubkey) -> Vec<Event> {
        let Ok(position) = self.registry.get_position(pda).await else {
            return Vec::new();
        };
        let _ = self.registry.remove_position(pda).await;
        vec![Event::PositionClosed {
            position: *pda,
            owner: position.owner,
            pool: position.pool,
        }]
    }
}
