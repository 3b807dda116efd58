use std::time::Duration;

use tokio::sync::watch;

/// Lifecycle of a channel's transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Open,
    /// Waiting `delay` before reconnect attempt number `attempt` (1-based)
    Reconnecting { attempt: u32, delay: Duration },
}

/// Observable "is connected" flag, written only by the channel that owns it
#[derive(Debug)]
pub struct ConnectionStore {
    tx: watch::Sender<bool>,
}

impl ConnectionStore {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver notified on every change of the flag
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, connected: bool) {
        self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
    }
}
