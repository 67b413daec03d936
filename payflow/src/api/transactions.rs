use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{core::prelude::*, domain::prelude::*};

#[derive(Deserialize, Debug)]
pub struct AdvanceRequest {
    pub status: TransactionStatus,
}

/// Opens a transfer and schedules its settlement.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewTransfer>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let Json(request) = body?;
    let transaction = state.store.create(request).await?;
    state.simulator.schedule(&transaction);
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(state.store.read(&id).await?))
}

/// Manual transition, subject to the same rules as the timers.
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AdvanceRequest>, JsonRejection>,
) -> Result<Json<Transaction>, ApiError> {
    let Json(AdvanceRequest { status }) = body?;
    Ok(Json(state.store.advance(&id, status).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(state.simulator.cancel(&id).await?))
}
