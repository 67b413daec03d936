use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{core::prelude::*, domain::prelude::*};

#[derive(Deserialize, Debug, Default)]
pub struct ResetParams {
    /// Insert the demo data set after clearing.
    #[serde(default)]
    pub seed: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub aborted_settlements: usize,
    pub seeded: Vec<Transaction>,
}

/// Stops every timer, empties the store, optionally reseeds it.
///
/// Seeded transfers that are not terminal get a fresh settlement timer.
pub async fn reset(
    State(state): State<AppState>,
    params: Result<Query<ResetParams>, QueryRejection>,
) -> Result<Json<ResetReport>, ApiError> {
    let Query(params) = params?;
    Ok(Json(reset_state(&state, params.seed).await?))
}

pub async fn reset_state(state: &AppState, seed: bool) -> Result<ResetReport, ApiError> {
    let aborted_settlements = state.simulator.abort_all();
    let seeded = state.store.reset(seed).await?;
    for transaction in &seeded {
        state.simulator.schedule(transaction);
    }

    info!(aborted_settlements, seeded = seeded.len(), "administrative reset");
    Ok(ResetReport {
        aborted_settlements,
        seeded,
    })
}
