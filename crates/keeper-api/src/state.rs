//! Shared state handed to every axum handler via `Router<ApiState>`, mirroring
//! the teacher's `ApiState { db_manager: Arc<DatabaseManager> }` (feels-indexer
//! `src/api/mod.rs`), generalized to the keeper's own set of owned components.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use address_book::AddressBook;
use event_bus::EventBus;
use harvest_scheduler::Scheduler;
use position_registry::PositionRegistry;
use solana_program::pubkey::Pubkey;
use tokio::sync::RwLock;
use tx_executor::Executor;

use crate::bin_lookup::BinReserveLookup;

/// Lightweight counters behind the `GET /api/stats` metrics surface (§2.1,
/// §4.G). `position_count` isn't tracked here — it's read straight off the
/// registry snapshot on each request, since the registry is the source of
/// truth and a duplicate counter would just be one more place to desync.
#[derive(Default)]
pub struct ApiStats {
    pub total_harvests: AtomicU64,
    pub stream_connected: AtomicBool,
}

impl ApiStats {
    pub fn record_harvest(&self) {
        self.total_harvests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_stream_connected(&self, connected: bool) {
        self.stream_connected.store(connected, Ordering::Relaxed);
    }
}

/// Program ids and derived PDAs the crank endpoints need to assemble
/// instructions on a caller's behalf (§4.I).
#[derive(Debug, Clone, Copy)]
pub struct ProgramIds {
    pub wrapper_program_id: Pubkey,
    pub dlmm_program_id: Pubkey,
    pub event_authority: Pubkey,
}

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<PositionRegistry>,
    pub scheduler: Arc<RwLock<Scheduler>>,
    pub address_book: Arc<AddressBook>,
    pub event_bus: Arc<EventBus>,
    pub executor: Arc<Executor>,
    pub bin_lookup: Arc<dyn BinReserveLookup>,
    pub program_ids: ProgramIds,
    pub stats: Arc<ApiStats>,
}
