use axum::{
    extract::{Path, State},
    Json,
};
use payflow::{
    api::transactions,
    core::{
        clock::MonotonicClock,
        config::Config,
        prelude::*,
        random::{ScriptedRandom, SeededRandom},
    },
    domain::prelude::*,
    store::InMemoryRepository,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};

fn app(random: Arc<dyn payflow::core::random::RandomSource>) -> AppState {
    AppState::new(
        &Config::default(),
        Arc::new(InMemoryRepository::default()),
        Arc::new(MonotonicClock::new()),
        random,
    )
}

async fn submit(state: &AppState) -> Transaction {
    let request: NewTransfer =
        serde_json::from_value(json!({ "amount": 100, "recipientPhone": "+254712345678" }))
            .unwrap();
    let (_, Json(created)) = transactions::create(State(state.clone()), Ok(Json(request)))
        .await
        .unwrap();
    created
}

/// Follows one transfer through the updates channel until it settles.
async fn history(state: &AppState, created: Transaction) -> Vec<Transaction> {
    let mut rx = state.store.events().subscribe();
    let mut seen = vec![created];
    while !seen.last().unwrap().status.is_terminal() {
        let update = rx.recv().await.unwrap();
        if update.id == seen[0].id {
            seen.push(update);
        }
    }
    seen
}

fn ordinal(status: TransactionStatus) -> usize {
    use TransactionStatus::*;
    match status {
        PendingGateway => 0,
        GatewaySuccessful => 1,
        ProcessingSettlement => 2,
        Completed | FailedSettlement | CanceledGateway => 3,
    }
}

#[tokio::test(start_paused = true)]
async fn transfer_settles_forward_only() {
    let state = app(Arc::new(SeededRandom::new(7)));
    let created = submit(&state).await;

    assert_eq!(created.status, TransactionStatus::PendingGateway);
    assert_eq!(created.updated_at, created.created_at);

    let seen = history(&state, created.clone()).await;
    let last = seen.last().unwrap();
    assert!(matches!(
        last.status,
        TransactionStatus::Completed | TransactionStatus::FailedSettlement
    ));

    for pair in seen.windows(2) {
        assert!(ordinal(pair[1].status) > ordinal(pair[0].status));
        assert!(pair[1].updated_at > pair[0].updated_at);
        assert!(pair[0].status.can_transition_to(pair[1].status));
    }
    assert_eq!(seen.len(), 4);

    // the settled record stays put
    tokio::time::sleep(Duration::from_secs(60)).await;
    let Json(stored) = transactions::read(State(state.clone()), Path(created.id))
        .await
        .unwrap();
    assert_eq!(&stored, last);
}

#[tokio::test(start_paused = true)]
async fn both_settlement_outcomes_are_reachable() {
    // draws are consumed only by the settlement step here
    let state = app(Arc::new(ScriptedRandom::new([0.2, 0.9])));
    let first = submit(&state).await;
    let second = submit(&state).await;

    tokio::time::sleep(Duration::from_secs(11)).await;

    let mut outcomes = Vec::new();
    for id in [first.id, second.id] {
        let Json(tx) = transactions::read(State(state.clone()), Path(id))
            .await
            .unwrap();
        assert_eq!(
            tx.mpesa_transaction_id.is_some(),
            tx.status == TransactionStatus::Completed
        );
        outcomes.push(tx.status);
    }
    outcomes.sort_by_key(|s| s.as_str());
    assert_eq!(
        outcomes,
        vec![TransactionStatus::Completed, TransactionStatus::FailedSettlement]
    );
}

#[tokio::test(start_paused = true)]
async fn terminal_transfer_rejects_further_moves() {
    let state = app(Arc::new(ScriptedRandom::new([0.0])));
    let created = submit(&state).await;
    tokio::time::sleep(Duration::from_secs(11)).await;

    for status in [
        TransactionStatus::PendingGateway,
        TransactionStatus::ProcessingSettlement,
        TransactionStatus::FailedSettlement,
        TransactionStatus::CanceledGateway,
    ] {
        let result = state.store.advance(&created.id, status).await;
        assert!(result.is_err(), "{status}");
    }
    let done = state.store.read(&created.id).await.unwrap();
    assert_eq!(done.status, TransactionStatus::Completed);
    assert!(done.updated_at >= done.created_at);
}
