use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::position::Side;

/// Discriminated event record (§3). Only the `type` tag is load-bearing for
/// routing; consumers that don't care about a particular variant's fields
/// can still match exhaustively on the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    ActiveBinChanged {
        pool: Pubkey,
        previous_bin_id: i32,
        active_bin_id: i32,
        slot: u64,
    },
    PositionChanged {
        position: Pubkey,
        owner: Pubkey,
        pool: Pubkey,
        action: PositionChangeAction,
        reason: Option<String>,
    },
    HarvestNeeded {
        position: Pubkey,
        pool: Pubkey,
        safe_bin_count: usize,
    },
    HarvestExecuted {
        position: Pubkey,
        pool: Pubkey,
        bins: Vec<i32>,
        realized_amount: u64,
        signature: String,
    },
    PositionClosed {
        position: Pubkey,
        owner: Pubkey,
        pool: Pubkey,
    },
    RoverTvlUpdated {
        rover: Pubkey,
        lamports: u64,
    },
    FeedHistory {
        events: Vec<Event>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionChangeAction {
    Opened,
    Updated,
    Evicted,
    Rejected,
}

impl Event {
    /// Stable short tag for logging/metrics; mirrors the `type` discriminant
    /// used on the wire without re-serializing the whole event.
    pub fn tag(&self) -> &'static str {
        match self {
            Event::ActiveBinChanged { .. } => "activeBinChanged",
            Event::PositionChanged { .. } => "positionChanged",
            Event::HarvestNeeded { .. } => "harvestNeeded",
            Event::HarvestExecuted { .. } => "harvestExecuted",
            Event::PositionClosed { .. } => "positionClosed",
            Event::RoverTvlUpdated { .. } => "roverTvlUpdated",
            Event::FeedHistory { .. } => "feedHistory",
        }
    }

    pub fn position_rejected(position: Pubkey, owner: Pubkey, pool: Pubkey, reason: &str) -> Self {
        Event::PositionChanged {
            position,
            owner,
            pool,
            action: PositionChangeAction::Rejected,
            reason: Some(reason.to_string()),
        }
    }

    pub fn position_evicted(position: Pubkey, owner: Pubkey, pool: Pubkey, reason: &str) -> Self {
        Event::PositionChanged {
            position,
            owner,
            pool,
            action: PositionChangeAction::Evicted,
            reason: Some(reason.to_string()),
        }
    }
}

/// A harvest intent handed from the Scheduler to the Executor (§4.D, §4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestIntent {
    pub intent_id: u64,
    pub position: Pubkey,
    pub pool: Pubkey,
    pub side: Side,
    pub bins: Vec<i32>,
}

/// Settlement callback from the Executor back to the Scheduler (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub intent_id: u64,
    pub outcome: Outcome,
    pub signature: Option<String>,
    pub logs: Vec<String>,
}

/// Classified executor outcome (§9 "Exception control flow" design note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    BenignSkip,
    TransientRetry,
    Fatal,
}
