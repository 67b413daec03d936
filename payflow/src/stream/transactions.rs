use futures::Stream;
use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::prelude::*;

/// Fan-out of transaction changes to websocket clients and other views.
///
/// Every create and every status transition is published here, so consumers
/// can re-render instead of polling the store.
///
#[derive(Clone, Debug)]
pub struct TransactionEvents {
    tx: broadcast::Sender<Transaction>,
}

impl TransactionEvents {
    /// Creates the channel with room for `buffer_size` undelivered updates
    /// per subscriber.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn publish(&self, transaction: &Transaction) {
        // a send error only means nobody is listening right now
        let _ = self.tx.send(transaction.clone());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Transaction> {
        self.tx.subscribe()
    }

    /// Updates as a stream, skipping over anything a slow consumer missed.
    ///
    /// The stream ends when the channel closes.
    pub fn stream(&self) -> impl Stream<Item = Transaction> + Send + 'static {
        futures::stream::unfold(self.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(transaction) => return Some((transaction, rx)),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "transaction updates subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }
}
