use futures::{Stream, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;

use crate::{core::clock::Clock, domain::prelude::*};

/// Initialize the heartbeat channel.
/// This channel is used to broadcast heartbeats to the websocket clients.
///
/// The returned sender is meant to live in the App State so every websocket
/// handler can subscribe to it.
///
pub fn channel(every: Duration, clock: Arc<dyn Clock>) -> broadcast::Sender<Heartbeat> {
    let (tx, _) = broadcast::channel(16);
    let tx_clone = tx.clone();

    let mut stream = Box::pin(heartbeats(every, clock));
    tokio::spawn(async move {
        while let Some(heartbeat) = stream.next().await {
            // ignore send errors (occurs when no receivers)
            let _ = tx_clone.send(heartbeat);
        }
    });
    tx
}

/// A stream that yields a heartbeat after every `every` period.
///
fn heartbeats(every: Duration, clock: Arc<dyn Clock>) -> impl Stream<Item = Heartbeat> + Send {
    futures::stream::unfold(clock, move |clock| async move {
        tokio::time::sleep(every).await;
        Some((Heartbeat::ok(clock.now()), clock))
    })
}
