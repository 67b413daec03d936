use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, TransactionRepository};
use crate::domain::prelude::*;

/// Process-local repository backed by an append-only vector.
///
/// Updates replace the record in place, so insertion order is preserved and
/// used to order records created at the same instant.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: RwLock<Vec<Transaction>>,
}

#[async_trait]
impl TransactionRepository for InMemoryRepository {
    async fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut newest_first: Vec<Transaction> =
            self.records.read().await.iter().rev().cloned().collect();
        // stable: equal timestamps keep newest-inserted first
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(newest_first)
    }

    async fn upsert(&self, transaction: Transaction) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|t| t.id == transaction.id) {
            Some(existing) => *existing = transaction,
            None => records.push(transaction),
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }
}
