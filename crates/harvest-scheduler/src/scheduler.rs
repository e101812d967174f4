use std::collections::HashMap;

use keeper_types::{
    Event, HarvestIntent, Outcome, Position, SchedulerEntry, SchedulerState, Settlement,
};
use solana_program::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;

/// Owns one [`SchedulerEntry`] per supervised position and the global/
/// per-pool in-flight emission caps (§4.D). Single-owner: mutated only by
/// the task that drives the scheduler loop.
pub struct Scheduler {
    config: SchedulerConfig,
    entries: HashMap<Pubkey, SchedulerEntry>,
    next_intent_id: u64,
    /// position -> intent id, so a settlement callback can find its entry
    /// without the executor needing to know scheduler internals.
    inflight_intents: HashMap<u64, Pubkey>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            next_intent_id: 1,
            inflight_intents: HashMap::new(),
        }
    }

    pub fn entry(&self, position: &Pubkey) -> Option<&SchedulerEntry> {
        self.entries.get(position)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All tracked entries, for the Public API's pending-harvests listing (§4.G).
    pub fn entries(&self) -> impl Iterator<Item = &SchedulerEntry> {
        self.entries.values()
    }

    pub fn ensure_entry(&mut self, position: Pubkey, pool: Pubkey) {
        self.entries
            .entry(position)
            .or_insert_with(|| SchedulerEntry::new(position, pool));
    }

    /// Fatal error from decode/registry: drop the entry and emit an eviction
    /// event rather than letting it spin forever (§4.D failure semantics).
    pub fn evict(&mut self, position: &Pubkey, owner: Pubkey, pool: Pubkey, reason: &str) -> Event {
        self.entries.remove(position);
        self.inflight_intents.retain(|_, pda| pda != position);
        Event::position_evicted(*position, owner, pool, reason)
    }

    fn global_inflight_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.state == SchedulerState::InFlight)
            .count()
    }

    fn pool_inflight_count(&self, pool: &Pubkey) -> usize {
        self.entries
            .values()
            .filter(|e| e.state == SchedulerState::InFlight && &e.pool == pool)
            .count()
    }

    /// React to a new active bin for `pool` (§4.D): recompute safe bins for
    /// every position in the pool, advance debounce/candidate tracking, and
    /// emit `harvestNeeded` + a harvest intent once a position has cleared
    /// `DEBOUNCE` slots as a candidate and capacity allows.
    pub fn on_active_bin_changed(
        &mut self,
        pool: Pubkey,
        active_bin_id: i32,
        slot: u64,
        positions: &[Position],
    ) -> (Vec<HarvestIntent>, Vec<Event>) {
        let mut intents = Vec::new();
        let mut events = Vec::new();

        for position in positions {
            self.ensure_entry(position.pda, pool);
            let safe_bins = position.safe_bins(active_bin_id);
            let entry = self.entries.get_mut(&position.pda).expect("just ensured");

            if matches!(entry.state, SchedulerState::InFlight) {
                // Don't disturb an in-flight entry; the settlement callback
                // owns its next transition.
                continue;
            }

            if safe_bins.is_empty() {
                entry.state = SchedulerState::Watching;
                entry.candidate_since_slot = None;
                entry.safe_bin_cache.clear();
                continue;
            }

            entry.safe_bin_cache = safe_bins.clone();
            if entry.candidate_since_slot.is_none() {
                entry.candidate_since_slot = Some(slot);
            }
            entry.state = SchedulerState::Candidate;

            let candidate_since = entry.candidate_since_slot.unwrap_or(slot);
            let debounced = slot.saturating_sub(candidate_since) >= self.config.debounce_slots;

            if !debounced || entry.pending_intent {
                continue;
            }

            events.push(Event::HarvestNeeded {
                position: position.pda,
                pool,
                safe_bin_count: safe_bins.len(),
            });

            if self.global_inflight_count() >= self.config.global_inflight {
                debug!(position = %position.pda, "global in-flight cap reached, intent deferred");
                continue;
            }
            if self.pool_inflight_count(&pool) >= self.config.per_pool_inflight {
                debug!(position = %position.pda, %pool, "per-pool in-flight cap reached, intent deferred");
                continue;
            }

            let intent_id = self.next_intent_id;
            self.next_intent_id += 1;
            entry.pending_intent = true;
            entry.state = SchedulerState::InFlight;
            self.inflight_intents.insert(intent_id, position.pda);

            intents.push(HarvestIntent {
                intent_id,
                position: position.pda,
                pool,
                side: position.side,
                bins: safe_bins,
            });
        }

        (intents, events)
    }

    /// Apply an executor settlement callback (§4.E), transitioning the
    /// entry to Cooldown (success), back to Watching (benign skip), or
    /// toward Failed (transient failure, after `MAX_RETRIES`).
    pub fn on_settlement(&mut self, settlement: Settlement, now_slot: u64) -> Vec<Event> {
        let Some(position) = self.inflight_intents.remove(&settlement.intent_id) else {
            warn!(intent_id = settlement.intent_id, "settlement for unknown intent");
            return Vec::new();
        };
        let Some(entry) = self.entries.get_mut(&position) else {
            return Vec::new();
        };

        entry.pending_intent = false;

        match settlement.outcome {
            Outcome::Success => {
                entry.consecutive_failures = 0;
                entry.last_harvest_slot = Some(now_slot);
                entry.candidate_since_slot = None;
                entry.state = SchedulerState::Cooldown;
                entry.cooldown_expiry_slot = Some(now_slot + self.config.cooldown_slots);
                info!(position = %position, signature = ?settlement.signature, "harvest settled");
                vec![Event::HarvestExecuted {
                    position,
                    pool: entry.pool,
                    bins: std::mem::take(&mut entry.safe_bin_cache),
                    realized_amount: 0,
                    signature: settlement.signature.unwrap_or_default(),
                }]
            }
            Outcome::BenignSkip => {
                entry.candidate_since_slot = None;
                entry.state = SchedulerState::Watching;
                Vec::new()
            }
            Outcome::TransientRetry => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures >= self.config.max_retries {
                    let backoff = self.config.fail_backoff_base_slots
                        * 2u64.pow(entry.consecutive_failures - self.config.max_retries);
                    entry.state = SchedulerState::Failed;
                    entry.cooldown_expiry_slot = Some(now_slot + backoff);
                    warn!(position = %position, failures = entry.consecutive_failures, "entry failed, backing off");
                } else {
                    entry.state = SchedulerState::Candidate;
                }
                Vec::new()
            }
            Outcome::Fatal => {
                let owner_pool = entry.pool;
                self.entries.remove(&position);
                return vec![Event::position_evicted(
                    position,
                    Pubkey::default(),
                    owner_pool,
                    "fatal executor error",
                )];
            }
        }
    }

    /// Clock tick (§4.D inputs): re-arm any Cooldown/Failed entry whose
    /// backoff window has elapsed.
    pub fn on_clock_tick(&mut self, now_slot: u64) {
        for entry in self.entries.values_mut() {
            if matches!(entry.state, SchedulerState::Cooldown | SchedulerState::Failed) {
                if let Some(expiry) = entry.cooldown_expiry_slot {
                    if now_slot >= expiry {
                        entry.state = SchedulerState::Watching;
                        entry.cooldown_expiry_slot = None;
                    }
                }
            }
        }
    }
}
