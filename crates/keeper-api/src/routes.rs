//! Route tables, split by resource the way the teacher's `routes.rs` groups
//! `create_market_routes`/`create_swap_routes`/etc. and merges them in `mod.rs`.
use axum::routing::{get, post};
use axum::Router;

use crate::crank::{build_harvest_crank, submit_crank};
use crate::handlers::{get_address_book, get_pending_harvests, get_pool, get_stats, get_user_bins};
use crate::state::ApiState;
use crate::websocket::websocket_handler;

pub fn create_pool_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/pools/:address", get(get_pool))
        .route("/api/user-bins", get(get_user_bins))
}

pub fn create_scheduler_routes() -> Router<ApiState> {
    Router::new().route("/api/pending-harvests", get(get_pending_harvests))
}

pub fn create_address_book_routes() -> Router<ApiState> {
    Router::new().route("/api/addressbook", get(get_address_book))
}

pub fn create_stats_routes() -> Router<ApiState> {
    Router::new().route("/api/stats", get(get_stats))
}

pub fn create_crank_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/crank/harvest", post(build_harvest_crank))
        .route("/api/crank/submit", post(submit_crank))
}

pub fn create_websocket_routes() -> Router<ApiState> {
    Router::new().route("/api/events", get(websocket_handler))
}
