//! REST + WebSocket surface for the frontend (§4.G), assembled the way the
//! teacher's `api/mod.rs` builds its router: one `Router<ApiState>` per
//! resource, merged, CORS + tracing layered on top, served via
//! `axum::serve` off a `tokio::net::TcpListener`.
pub mod bin_lookup;
pub mod crank;
pub mod errors;
pub mod handlers;
pub mod responses;
pub mod routes;
pub mod state;
pub mod websocket;

pub use bin_lookup::BinReserveLookup;
pub use state::{ApiState, ApiStats, ProgramIds};

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Request bodies larger than this are rejected outright (§4.G "bounded
/// request body size"); the crank endpoints are the only writers and their
/// payload is a single serialized transaction, which never approaches this.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn create_app(state: ApiState) -> Router {
    Router::new()
        .merge(routes::create_pool_routes())
        .merge(routes::create_scheduler_routes())
        .merge(routes::create_address_book_routes())
        .merge(routes::create_stats_routes())
        .merge(routes::create_crank_routes())
        .merge(routes::create_websocket_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES)),
        )
}

/// Bind and serve the Public API, returning the listening task's join handle
/// so the caller's `tokio::select!` supervision loop can await it alongside
/// the other components (§5 Task supervision).
pub async fn start_server(bind_address: &str, state: ApiState) -> Result<tokio::task::JoinHandle<()>> {
    let app = create_app(state);
    let listener = TcpListener::bind(bind_address).await?;
    info!(%bind_address, "keeper API listening");

    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(%err, "keeper API server error");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bin_lookup::fake::FakeBinReserveLookup;
    use address_book::{AddressBook, AddressBookConfig};
    use event_bus::{EventBus, EventBusConfig};
    use harvest_scheduler::{Scheduler, SchedulerConfig};
    use keeper_types::{Pool, Position, Side, TokenProgramKind};
    use position_registry::PositionRegistry;
    use solana_program::pubkey::Pubkey;
    use solana_sdk::signature::Keypair;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::util::ServiceExt;
    use tx_executor::{Executor, ExecutorConfig};

    async fn test_state() -> (ApiState, Pubkey, Pubkey) {
        let registry = Arc::new(PositionRegistry::new());
        let pool_address = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let position_pda = Pubkey::new_unique();

        registry
            .upsert_pool(Pool {
                address: pool_address,
                active_bin_id: 100,
                bin_step: 10,
                token_x_mint: Pubkey::new_unique(),
                token_y_mint: Pubkey::new_unique(),
                symbol_x: Some("SOL".to_string()),
                symbol_y: Some("USDC".to_string()),
                decimals_x: 9,
                decimals_y: 6,
                reserve_x: Pubkey::new_unique(),
                reserve_y: Pubkey::new_unique(),
                token_program_x: TokenProgramKind::Spl,
                token_program_y: TokenProgramKind::Spl,
                last_updated_slot: 42,
            })
            .await;
        registry
            .upsert_position(
                Position {
                    pda: position_pda,
                    owner,
                    pool: pool_address,
                    liquidity_position: Pubkey::new_unique(),
                    side: Side::Sell,
                    min_bin: 90,
                    max_bin: 99,
                    initial_deposit: 1_000_000,
                    cumulative_harvested: 0,
                    created_at: 0,
                },
                |_| async { unreachable!("pool already loaded") },
            )
            .await
            .unwrap();

        let rpc = Arc::new(solana_client::nonblocking::rpc_client::RpcClient::new(
            "http://127.0.0.1:8899".to_string(),
        ));
        let executor = Arc::new(Executor::new(rpc, Arc::new(Keypair::new()), ExecutorConfig::default()));

        let state = ApiState {
            registry,
            scheduler: Arc::new(RwLock::new(Scheduler::new(SchedulerConfig::default()))),
            address_book: Arc::new(
                AddressBook::open(
                    tempfile::tempdir().unwrap().into_path(),
                    AddressBookConfig::default(),
                )
                .unwrap(),
            ),
            event_bus: Arc::new(EventBus::new(EventBusConfig::default())),
            executor,
            bin_lookup: Arc::new(FakeBinReserveLookup::new()),
            program_ids: ProgramIds {
                wrapper_program_id: Pubkey::new_unique(),
                dlmm_program_id: Pubkey::new_unique(),
                event_authority: Pubkey::new_unique(),
            },
            stats: Arc::new(ApiStats::default()),
        };
        (state, pool_address, owner)
    }

    #[tokio::test]
    async fn pool_snapshot_roundtrips_through_the_router() {
        let (state, pool_address, _owner) = test_state().await;
        let app = create_app(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/api/pools/{pool_address}"))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn pool_snapshot_404s_for_unknown_address() {
        let (state, _pool_address, _owner) = test_state().await;
        let app = create_app(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/api/pools/{}", Pubkey::new_unique()))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_reports_position_count() {
        let (state, _pool_address, _owner) = test_state().await;
        let app = create_app(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/stats")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["positionCount"], 1);
    }
}
