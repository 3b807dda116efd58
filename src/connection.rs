use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tracing::{debug, error};
use url::Url;

use crate::error::NotifyError;

/// Outgoing half of a transport
pub type WsSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

/// Incoming half of a transport
pub type WsStream = Pin<Box<dyn Stream<Item = Result<Message, tungstenite::Error>> + Send>>;

/// An open duplex connection, already past its handshake
pub struct Transport {
    pub sink: WsSink,
    pub stream: WsStream,
}

impl Transport {
    pub fn new(sink: WsSink, stream: WsStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens transports to the notification endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Transport, NotifyError>;
}

/// Connector backed by `tokio_tungstenite::connect_async`
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Transport, NotifyError> {
        let (ws_stream, response) = connect_async(url.as_str()).await.map_err(|e| {
            error!("Failed to connect to WebSocket server: {}", e);
            e
        })?;

        debug!(
            "Connected to WebSocket server. Status: {}",
            response.status()
        );

        let (sink, stream) = ws_stream.split();
        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Handle for queueing frames onto the live transport
#[derive(Debug, Clone)]
pub(crate) struct WebSocketConnection {
    socket: mpsc::Sender<Message>,
}

impl WebSocketConnection {
    pub fn new(socket: mpsc::Sender<Message>) -> Self {
        Self { socket }
    }

    pub async fn send(&self, message: Message) -> Result<(), NotifyError> {
        self.socket
            .send(message)
            .await
            .map_err(|e| NotifyError::SendError(e.to_string()))
    }
}

/// Endpoint without its query string, safe to log
pub(crate) fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
