//! Permissionless crank (§4.I): any external signer can trigger an
//! opportunistic harvest. The keeper never holds the caller's key, so this
//! splits into two round trips — build an unsigned transaction with the
//! caller as fee payer, then accept it back already signed for broadcast —
//! the same shape as the teacher's `build_swap_transaction` /
//! `simulate_transaction` pair in `api/transaction_builder.rs`, swapping
//! simulate-only for an actual submit-and-confirm since the crank path has
//! no separate settlement callback to report through.
use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dlmm_protocol::bin_array_pdas_for_range;
use dlmm_protocol::instructions::{build_crank_instruction, CrankAccounts};
use serde::Deserialize;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::message::Message;
use solana_sdk::transaction::Transaction;

use crate::errors::{parse_pubkey, ApiError, ApiResult};
use crate::responses::{SubmitCrankResponse, UnsignedTransactionResponse};
use crate::state::ApiState;

#[derive(Deserialize)]
pub struct BuildHarvestCrankRequest {
    pub position: String,
    pub caller: String,
}

/// Build an unsigned harvest transaction naming `caller` as fee payer. The
/// caller signs it client-side and posts the result to `/api/crank/submit`.
pub async fn build_harvest_crank(
    State(state): State<ApiState>,
    Json(request): Json<BuildHarvestCrankRequest>,
) -> ApiResult<UnsignedTransactionResponse> {
    let position_pda = parse_pubkey(&request.position)?;
    let caller = parse_pubkey(&request.caller)?;

    let position = state.registry.get_position(&position_pda).await?;
    let pool = state.registry.get_pool(&position.pool).await?;

    let bins = position.safe_bins(pool.active_bin_id);
    if bins.is_empty() {
        return Err(ApiError::bad_request("position has no safe bins to harvest"));
    }

    let bin_arrays = bin_array_pdas_for_range(
        &position.pool,
        position.min_bin,
        position.max_bin,
        &state.program_ids.dlmm_program_id,
    );

    let (bitmap_pda, _) =
        dlmm_protocol::pda::derive_bitmap_pda(&position.pool, &state.program_ids.dlmm_program_id);
    let bitmap_extension_exists = state.executor.account_exists(&bitmap_pda).await?;
    let bitmap_extension = dlmm_protocol::pda::resolve_bitmap_extension(
        &position.pool,
        &state.program_ids.dlmm_program_id,
        bitmap_extension_exists,
    );

    let accounts = CrankAccounts {
        program_id: state.program_ids.wrapper_program_id,
        position: position_pda,
        pool: position.pool,
        payer: caller,
        bin_arrays,
        bitmap_extension,
        bitmap_extension_exists,
        event_authority: state.program_ids.event_authority,
    };
    let crank_ix = build_crank_instruction(&accounts, &bins);
    let compute_ix = ComputeBudgetInstruction::set_compute_unit_limit(400_000);

    let blockhash = state.executor.latest_blockhash().await?;
    let message = Message::new(&[compute_ix, crank_ix], Some(&caller));
    let mut transaction = Transaction::new_unsigned(message);
    transaction.message.recent_blockhash = blockhash;

    let serialized = bincode::serialize(&transaction)
        .map_err(|e| ApiError::bad_request(format!("failed to serialize transaction: {e}")))?;

    Ok(Json(UnsignedTransactionResponse {
        transaction: BASE64.encode(serialized),
        expires_at_slot: pool.last_updated_slot,
    }))
}

#[derive(Deserialize)]
pub struct SubmitCrankRequest {
    /// `bincode`-serialized, base64-encoded, fully-signed `Transaction`.
    pub transaction: String,
}

pub async fn submit_crank(
    State(state): State<ApiState>,
    Json(request): Json<SubmitCrankRequest>,
) -> ApiResult<SubmitCrankResponse> {
    let bytes = BASE64
        .decode(&request.transaction)
        .map_err(|_| ApiError::bad_request("invalid base64 transaction"))?;
    let transaction: Transaction = bincode::deserialize(&bytes)
        .map_err(|_| ApiError::bad_request("invalid transaction encoding"))?;

    let signature = state.executor.submit_signed(transaction).await?;
    state.stats.record_harvest();
    Ok(Json(SubmitCrankResponse { signature }))
}
