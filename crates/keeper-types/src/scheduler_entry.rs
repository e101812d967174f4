use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Per-position scheduler state machine (§4.D):
/// `Idle -> Watching -> Candidate -> InFlight -> (Idle | Cooldown | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerState {
    Idle,
    Watching,
    Candidate,
    InFlight,
    Cooldown,
    Failed,
}

/// One entry per supervised position, owned exclusively by the Scheduler.
/// References its [`Position`](crate::Position) by key only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerEntry {
    pub position: Pubkey,
    pub pool: Pubkey,
    pub state: SchedulerState,
    pub last_harvest_slot: Option<u64>,
    pub consecutive_failures: u32,
    /// Slot at which the current Cooldown/Failed backoff expires.
    pub cooldown_expiry_slot: Option<u64>,
    /// Slot at which the position first became a harvest candidate;
    /// used to enforce the `DEBOUNCE` threshold (§4.D).
    pub candidate_since_slot: Option<u64>,
    pub safe_bin_cache: Vec<i32>,
    pub pending_intent: bool,
}

impl SchedulerEntry {
    pub fn new(position: Pubkey, pool: Pubkey) -> Self {
        Self {
            position,
            pool,
            state: SchedulerState::Idle,
            last_harvest_slot: None,
            consecutive_failures: 0,
            cooldown_expiry_slot: None,
            candidate_since_slot: None,
            safe_bin_cache: Vec::new(),
            pending_intent: false,
        }
    }
}
