use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error};

use crate::config::DEFAULT_PING_INTERVAL;
use crate::connection::WebSocketConnection;
use crate::message::PING_FRAME;

/// Liveness ping task; aborted when the guard is dropped
pub(crate) struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Send [`PING_FRAME`] every `interval`, the first one after a full interval.
    ///
    /// A zero interval falls back to the default.
    pub fn spawn(connection: WebSocketConnection, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_PING_INTERVAL
        } else {
            interval
        };

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if let Err(e) = connection.send(Message::Text(PING_FRAME.to_string())).await {
                    error!("Failed to send ping message: {}", e);
                    break;
                }

                debug!("Ping message sent");
            }
        });

        Self { handle }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
