use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::core::prelude::*;

pub mod admin;
pub mod gateway;
pub mod transactions;
pub mod ws;

/// All HTTP and websocket routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::endpoint))
        .route("/api/transfers", post(transactions::create))
        .route("/api/transactions", get(transactions::list))
        .route("/api/transactions/{id}", get(transactions::read))
        .route("/api/transactions/{id}/status", put(transactions::advance))
        .route("/api/transactions/{id}/cancel", post(transactions::cancel))
        .route("/api/gateway/card/authorize", post(gateway::card_authorize))
        .route("/api/gateway/mpesa/stkpush", post(gateway::stk_push))
        .route("/api/gateway/mpesa/c2b/confirm", post(gateway::c2b_confirm))
        .route("/api/admin/reset", post(admin::reset))
        .with_state(state)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
