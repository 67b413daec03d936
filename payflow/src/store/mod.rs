//! Transaction record store.
//!
//! [`TransactionRepository`] is the storage seam (in-memory by default);
//! [`TransactionStore`] layers the lifecycle rules on top of it and announces
//! every change on the transaction updates channel.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    core::clock::Clock,
    domain::{ids, prelude::*},
    stream::transactions::TransactionEvents,
};

mod memory;
pub mod seed;

pub use memory::InMemoryRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction {0} not found")]
    NotFound(String),

    #[error("transaction {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error(transparent)]
    Rejected(#[from] TransferError),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Storage capability for transaction records.
///
/// Implementations only store and fetch; transition rules live in
/// [`TransactionStore`].
///
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Inserts the record, or replaces the one with the same id.
    async fn upsert(&self, transaction: Transaction) -> Result<(), StoreError>;

    /// Drops every record.
    async fn clear(&self) -> Result<(), StoreError>;
}

pub struct TransactionStore {
    repo: Arc<dyn TransactionRepository>,
    clock: Arc<dyn Clock>,
    events: TransactionEvents,
    /// Serializes read-modify-write cycles so transition checks see the
    /// latest status.
    update_lock: Mutex<()>,
}

impl TransactionStore {
    pub fn new(
        repo: Arc<dyn TransactionRepository>,
        clock: Arc<dyn Clock>,
        events: TransactionEvents,
    ) -> Self {
        Self {
            repo,
            clock,
            events,
            update_lock: Mutex::new(()),
        }
    }

    pub fn events(&self) -> &TransactionEvents {
        &self.events
    }

    /// Opens a new transfer in `PENDING_GATEWAY`.
    pub async fn create(&self, request: NewTransfer) -> Result<Transaction, StoreError> {
        let transaction = Transaction::open(request, self.clock.now())?;
        self.repo.upsert(transaction.clone()).await?;

        info!(
            id = %transaction.id,
            amount = %transaction.amount,
            recipient = %transaction.recipient_phone,
            "transfer created"
        );
        self.events.publish(&transaction);
        Ok(transaction)
    }

    pub async fn read(&self, id: &str) -> Result<Transaction, StoreError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// All transactions, newest first.
    pub async fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        self.repo.list().await
    }

    /// Moves a transaction to `next`.
    ///
    /// Advancing to the current status is a no-op that returns the record
    /// unchanged. Any other move must be the immediate successor of the
    /// current status; terminal records are never touched again. Reaching
    /// `COMPLETED` attaches the settlement receipt.
    ///
    pub async fn advance(
        &self,
        id: &str,
        next: TransactionStatus,
    ) -> Result<Transaction, StoreError> {
        let _guard = self.update_lock.lock().await;

        let transaction = self.read(id).await?;
        if transaction.status == next {
            return Ok(transaction);
        }
        self.apply(transaction, next).await
    }

    /// Moves a transaction to `next` only while it is still in `expected`.
    ///
    /// The check and the write happen under the same lock, so a concurrent
    /// advance either lands first (and this call is refused) or sees `next`.
    pub async fn advance_from(
        &self,
        id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<Transaction, StoreError> {
        let _guard = self.update_lock.lock().await;

        let transaction = self.read(id).await?;
        if transaction.status != expected {
            warn!(id, from = %transaction.status, to = %next, %expected, "transition rejected");
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: transaction.status,
                to: next,
            });
        }
        self.apply(transaction, next).await
    }

    /// Checks, stamps, stores and announces one transition. Caller holds
    /// `update_lock`.
    async fn apply(
        &self,
        mut transaction: Transaction,
        next: TransactionStatus,
    ) -> Result<Transaction, StoreError> {
        let previous = transaction.status;
        if !previous.can_transition_to(next) {
            warn!(id = %transaction.id, from = %previous, to = %next, "transition rejected");
            return Err(StoreError::InvalidTransition {
                id: transaction.id,
                from: previous,
                to: next,
            });
        }

        transaction.status = next;
        transaction.updated_at = after(transaction.updated_at, self.clock.now());
        if next == TransactionStatus::Completed {
            transaction.mpesa_transaction_id = Some(ids::receipt(10));
        }
        self.repo.upsert(transaction.clone()).await?;

        info!(id = %transaction.id, from = %previous, to = %next, "transaction advanced");
        self.events.publish(&transaction);
        Ok(transaction)
    }

    /// Clears every record, then optionally inserts the demo data set.
    ///
    /// Returns the records that were seeded.
    pub async fn reset(&self, seed: bool) -> Result<Vec<Transaction>, StoreError> {
        let _guard = self.update_lock.lock().await;

        self.repo.clear().await?;
        let seeded = if seed {
            seed::demo_transactions(self.clock.now())
        } else {
            Vec::new()
        };
        for transaction in &seeded {
            self.repo.upsert(transaction.clone()).await?;
            self.events.publish(transaction);
        }

        info!(seeded = seeded.len(), "store reset");
        Ok(seeded)
    }
}

/// `now`, or one microsecond past `previous` when the clock has not moved
/// on (same instant, or a coarse clock).
fn after(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    previous
        .checked_add_signed(TimeDelta::microseconds(1))
        .map_or(now, |next| now.max(next))
}
