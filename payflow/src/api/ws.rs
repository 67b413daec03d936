use crate::{core::prelude::*, domain::prelude::*};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use models::{ChannelMsg, Status, WsMessage};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, warn};

/// Module for models for the websocket API.
///
/// This module includes the message types for the websocket API such as
/// subscribe, unsubscribe, transaction updates and heartbeat messages.
///
mod models {
    use crate::domain::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Serialize, Debug)]
    #[serde(tag = "method")]
    pub enum WsMessage {
        #[serde(rename = "subscribe")]
        Subscribe { params: ChannelParams },
        #[serde(rename = "unsubscribe")]
        Unsubscribe { params: ChannelParams },
    }

    #[derive(Deserialize, Serialize, Debug)]
    pub struct ChannelParams {
        pub channel: String,
    }

    #[derive(Deserialize, Serialize, Debug)]
    #[serde(tag = "channel")]
    pub enum ChannelMsg {
        #[serde(rename = "transactions")]
        Transactions { data: Vec<Transaction> },

        #[serde(rename = "heartbeat")]
        Heartbeat { data: Heartbeat },

        /// Acknowledgement of a subscribe/unsubscribe request.
        #[serde(rename = "status")]
        Status { data: Status },
    }

    #[derive(Deserialize, Serialize, Debug)]
    pub struct Status {
        pub ok: bool,
        pub message: String,
    }
}

/// Module for the websocket client.
///
/// Tracks which channels one websocket connection is subscribed to.
///
pub mod client {
    use std::collections::HashSet;

    /// Channels a websocket client can subscribe to.
    ///
    #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
    pub enum Channel {
        /// Every transaction create and status change.
        Transactions,
        Heartbeat,
    }

    impl std::str::FromStr for Channel {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "transactions" => Ok(Self::Transactions),
                "heartbeat" => Ok(Self::Heartbeat),
                _ => Err(()),
            }
        }
    }

    /// The channels one connection is subscribed to.
    ///
    #[derive(Debug, Default)]
    pub struct WsClient {
        pub channels: HashSet<Channel>,
    }

    impl WsClient {
        pub fn subscribe(&mut self, channel: Channel) -> &Self {
            self.channels.insert(channel);
            self
        }

        pub fn unsubscribe(&mut self, channel: Channel) -> &Self {
            self.channels.remove(&channel);
            self
        }

        pub fn is_subscribed(&self, channel: Channel) -> bool {
            self.channels.contains(&channel)
        }
    }
}

/// The endpoint for the websocket API.
///
/// This function upgrades the websocket connection and handles the incoming
/// messages.
///
pub async fn endpoint(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    /// Splits the socket and runs the read and write halves until either
    /// side finishes.
    ///
    async fn handle(socket: WebSocket, state: AppState) {
        let (sender, receiver) = socket.split();
        let client = Arc::new(RwLock::new(client::WsClient::default()));
        let (ack_tx, ack_rx) = mpsc::channel(16);

        let read_task = tokio::spawn(read(receiver, client.clone(), ack_tx));
        let write_task = tokio::spawn(write(sender, client, ack_rx, state));

        tokio::select! {
            _ = read_task => {},
            _ = write_task => {},
        }
    }
    // upgrade the websocket connection using the ws handler
    ws.on_upgrade(move |socket| handle(socket, state))
}

/// Read side of the websocket connection.
///
/// Applies subscribe/unsubscribe requests to the client and queues an
/// acknowledgement for the write side.
///
async fn read(
    mut receiver: SplitStream<WebSocket>,
    client: Arc<RwLock<client::WsClient>>,
    acks: mpsc::Sender<ChannelMsg>,
) {
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let reply = match serde_json::from_str::<WsMessage>(&text) {
            Ok(ws_msg) => {
                let mut client = client.write().await;
                handle_message(&ws_msg, &mut client)
            }
            Err(err) => {
                warn!(error = %err, "unreadable websocket message");
                ChannelMsg::Status {
                    data: Status {
                        ok: false,
                        message: format!("Invalid message: {err}"),
                    },
                }
            }
        };
        if acks.send(reply).await.is_err() {
            break;
        }
    }
}

/// Something the write side may forward to the client.
#[derive(Debug)]
enum Outbound {
    Ack(ChannelMsg),
    Transaction(Transaction),
    Heartbeat(Heartbeat),
}

/// The message to send for `event`, if any.
///
/// Acks always go out; updates only on channels the client subscribed to.
fn route(event: Outbound, client: &client::WsClient) -> Option<ChannelMsg> {
    match event {
        Outbound::Ack(ack) => Some(ack),
        Outbound::Transaction(transaction) => client
            .is_subscribed(client::Channel::Transactions)
            .then(|| ChannelMsg::Transactions {
                data: vec![transaction],
            }),
        Outbound::Heartbeat(heartbeat) => client
            .is_subscribed(client::Channel::Heartbeat)
            .then_some(ChannelMsg::Heartbeat { data: heartbeat }),
    }
}

/// Write side of the websocket connection.
///
/// Forwards acknowledgements, and transaction updates and heartbeats for the
/// channels the client is subscribed to.
///
async fn write(
    mut sender: SplitSink<WebSocket, Message>,
    client: Arc<RwLock<client::WsClient>>,
    mut acks: mpsc::Receiver<ChannelMsg>,
    state: AppState,
) {
    let transactions = state.store.events().stream();
    futures::pin_mut!(transactions);
    let mut heartbeat_rx = state.heartbeat_tx.subscribe();

    loop {
        let event = tokio::select! {
            ack = acks.recv() => match ack {
                Some(ack) => Outbound::Ack(ack),
                None => break,
            },
            transaction = transactions.next() => match transaction {
                Some(transaction) => Outbound::Transaction(transaction),
                None => break,
            },
            heartbeat = heartbeat_rx.recv() => match heartbeat {
                Ok(heartbeat) => Outbound::Heartbeat(heartbeat),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let Some(msg) = route(event, &*client.read().await) else {
            continue;
        };
        if send_message(&msg, &mut sender).await.is_err() {
            break;
        }
    }
}

/// Applies a subscribe/unsubscribe request and builds the acknowledgement.
///
fn handle_message(msg: &WsMessage, client: &mut client::WsClient) -> ChannelMsg {
    let (ok, message) = match msg {
        WsMessage::Subscribe { params } => match params.channel.parse() {
            Err(()) => (false, format!("Invalid channel: {}", params.channel)),
            Ok(channel) => {
                client.subscribe(channel);
                (
                    true,
                    format!("Successfully subscribed to {} channel", params.channel),
                )
            }
        },

        WsMessage::Unsubscribe { params } => match params.channel.parse() {
            Err(()) => (false, format!("Invalid channel: {}", params.channel)),
            Ok(channel) => {
                client.unsubscribe(channel);
                (
                    true,
                    format!("Successfully unsubscribed from {} channel", params.channel),
                )
            }
        },
    };

    ChannelMsg::Status {
        data: Status { ok, message },
    }
}

/// Sends a message by serializing the message and sending it to the websocket.
///
async fn send_message(
    msg: &ChannelMsg,
    sender: &mut SplitSink<WebSocket, Message>,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(serialized) => sender.send(Message::Text(serialized.into())).await,
        Err(err) => {
            // a message we cannot encode is dropped, the connection stays up
            warn!(error = %err, "websocket message not serializable");
            Ok(())
        }
    }
    .inspect_err(|err| debug!(error = %err, "websocket send failed"))
}
