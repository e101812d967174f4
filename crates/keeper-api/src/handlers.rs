//! Request handlers for the read-only Public API (§4.G), grounded in the
//! teacher's `api/handlers.rs` shape: `State<ApiState>` + `Path`/`Query`
//! extractors, a `Json<Response>` success type, errors mapped through a
//! single [`ApiError`] rather than a bare `StatusCode`.
use axum::extract::{Query, State};
use axum::Json;
use dlmm_protocol::bin_array_pdas_for_range;
use harvest_scheduler::Scheduler;
use keeper_types::SchedulerState;
use serde::Deserialize;
use std::collections::HashMap;

use crate::errors::{parse_pubkey, ApiResult};
use crate::responses::{
    AddressBookResponse, BinReserveEntry, PendingHarvestEntry, PendingHarvestsResponse,
    PoolSnapshotResponse, StatsResponse, UserBinsResponse,
};
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct PoolPath {
    pub address: String,
}

pub async fn get_pool(
    State(state): State<ApiState>,
    axum::extract::Path(path): axum::extract::Path<PoolPath>,
) -> ApiResult<PoolSnapshotResponse> {
    let address = parse_pubkey(&path.address)?;
    let pool = state.registry.get_pool(&address).await?;
    Ok(Json(PoolSnapshotResponse {
        address: pool.address,
        active_bin_id: pool.active_bin_id,
        bin_step: pool.bin_step,
        token_x_mint: pool.token_x_mint,
        token_y_mint: pool.token_y_mint,
        symbol_x: pool.symbol_x.clone(),
        symbol_y: pool.symbol_y.clone(),
        decimals_x: pool.decimals_x,
        decimals_y: pool.decimals_y,
        last_updated_slot: pool.last_updated_slot,
    }))
}

#[derive(Deserialize)]
pub struct UserBinsQuery {
    pub pool: String,
    pub owner: String,
}

/// Aggregate an owner's unharvested remaining amount per bin across every
/// position they hold in `pool` (§4.G). Each position only contributes the
/// bins inside its own `[min_bin, max_bin]` range; overlapping positions sum.
pub async fn get_user_bins(
    State(state): State<ApiState>,
    Query(query): Query<UserBinsQuery>,
) -> ApiResult<UserBinsResponse> {
    let pool = parse_pubkey(&query.pool)?;
    let owner = parse_pubkey(&query.owner)?;

    let positions: Vec<_> = state
        .registry
        .positions_by_owner(&owner)
        .await
        .into_iter()
        .filter(|p| p.pool == pool)
        .collect();

    let mut totals: HashMap<i32, (u64, u64)> = HashMap::new();
    for position in &positions {
        let pdas = bin_array_pdas_for_range(
            &pool,
            position.min_bin,
            position.max_bin,
            &state.program_ids.dlmm_program_id,
        );
        let arrays = state.bin_lookup.fetch_bin_arrays(&pdas).await?;
        for array in arrays {
            for (offset, amounts) in array.bins.iter().enumerate() {
                let bin_id = (array.index * dlmm_protocol::pda::BINS_PER_ARRAY) as i32 + offset as i32;
                if bin_id < position.min_bin || bin_id > position.max_bin {
                    continue;
                }
                let entry = totals.entry(bin_id).or_insert((0, 0));
                entry.0 += amounts.amount_x;
                entry.1 += amounts.amount_y;
            }
        }
    }

    let mut bins: Vec<BinReserveEntry> = totals
        .into_iter()
        .map(|(bin_id, (amount_x, amount_y))| BinReserveEntry {
            bin_id,
            amount_x,
            amount_y,
        })
        .collect();
    bins.sort_by_key(|b| b.bin_id);

    Ok(Json(UserBinsResponse { pool, owner, bins }))
}

async fn scheduler_pending(scheduler: &Scheduler, registry: &position_registry::PositionRegistry) -> Vec<PendingHarvestEntry> {
    let mut pending = Vec::new();
    for entry in scheduler.entries() {
        if entry.state == SchedulerState::InFlight || entry.safe_bin_cache.is_empty() {
            continue;
        }
        let Ok(position) = registry.get_position(&entry.position).await else {
            continue;
        };
        pending.push(PendingHarvestEntry {
            position_pda: entry.position,
            lb_pair: entry.pool,
            owner: position.owner,
            side: position.side,
            safe_bin_count: entry.safe_bin_cache.len(),
            total_bins: position.width(),
        });
    }
    pending
}

pub async fn get_pending_harvests(State(state): State<ApiState>) -> ApiResult<PendingHarvestsResponse> {
    let scheduler = state.scheduler.read().await;
    let pending = scheduler_pending(&scheduler, &state.registry).await;
    Ok(Json(PendingHarvestsResponse { pending }))
}

#[derive(Deserialize)]
pub struct AddressBookQuery {
    pub wallet: String,
}

pub async fn get_address_book(
    State(state): State<ApiState>,
    Query(query): Query<AddressBookQuery>,
) -> ApiResult<AddressBookResponse> {
    let wallet = parse_pubkey(&query.wallet)?;
    let listing = state
        .address_book
        .listing_for_wallet(&wallet, chrono::Utc::now())?;
    Ok(Json(AddressBookResponse {
        active: listing.active,
        recent: listing.recent,
    }))
}

pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<StatsResponse> {
    let position_count = state.registry.all_positions().await.len();
    Ok(Json(StatsResponse {
        position_count,
        total_harvests: state
            .stats
            .total_harvests
            .load(std::sync::atomic::Ordering::Relaxed),
        stream_connected: state
            .stats
            .stream_connected
            .load(std::sync::atomic::Ordering::Relaxed),
    }))
}
