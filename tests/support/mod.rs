//! In-memory connector for driving a `NotificationChannel` without a network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{future, sink, stream};
use refund_notify::{Connector, NotifyError, Transport};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use url::Url;

#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    connects: AtomicUsize,
    refuse: AtomicBool,
    stall: AtomicBool,
    urls: Mutex<Vec<Url>>,
    sessions: Mutex<VecDeque<MockSession>>,
}

/// Server side of one accepted transport
pub struct MockSession {
    inbound: mpsc::UnboundedSender<Message>,
    outbound: mpsc::UnboundedReceiver<Message>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transports the channel asked for, refused ones included
    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Make subsequent attempts fail like a refused handshake
    pub fn refuse(&self, refuse: bool) {
        self.inner.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make subsequent handshakes hang until the channel gives up on them
    pub fn stall(&self, stall: bool) {
        self.inner.stall.store(stall, Ordering::SeqCst);
    }

    /// Accepted transports not yet taken by the test
    pub fn pending_sessions(&self) -> usize {
        self.inner.sessions.lock().unwrap().len()
    }

    pub fn last_token(&self) -> Option<String> {
        let urls = self.inner.urls.lock().unwrap();
        urls.last().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value.into_owned())
        })
    }

    pub fn take_session(&self) -> MockSession {
        self.inner
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .expect("no transport was opened")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Transport, NotifyError> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.urls.lock().unwrap().push(url.clone());

        if self.inner.refuse.load(Ordering::SeqCst) {
            return Err(NotifyError::ConnectionError("connection refused".to_string()));
        }
        if self.inner.stall.load(Ordering::SeqCst) {
            future::pending::<()>().await;
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Message>();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();

        let sink = sink::unfold(outbound_tx, |tx, message: Message| async move {
            tx.send(message)
                .map_err(|_| tungstenite::Error::ConnectionClosed)?;
            Ok::<_, tungstenite::Error>(tx)
        });
        let stream = stream::unfold(inbound_rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|message| (Ok::<_, tungstenite::Error>(message), rx))
        });

        self.inner.sessions.lock().unwrap().push_back(MockSession {
            inbound: inbound_tx,
            outbound: outbound_rx,
        });

        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}

impl MockSession {
    pub fn push_text(&self, text: &str) {
        self.inbound
            .send(Message::Text(text.to_string()))
            .expect("channel stopped reading");
    }

    pub fn push(&self, message: Message) {
        self.inbound.send(message).expect("channel stopped reading");
    }

    /// Frames the channel has written so far
    pub fn sent(&mut self) -> Vec<Message> {
        let mut frames = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            frames.push(message);
        }
        frames
    }

    /// Whether the channel has let go of its end of the transport
    pub fn is_released(&self) -> bool {
        self.inbound.is_closed()
    }

    /// Drop the connection from the server side
    pub fn drop_connection(self) {}
}

/// Let spawned tasks run without advancing the paused clock
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

pub const STATUS_CHANGED: &str = r#"{"type":"refund_status_changed","request_id":7,"ticket_cod":"TCK-1","status":"APPROVED","user_id":3}"#;

pub const NEW_REQUEST: &str = r#"{"type":"new_refund_request","request_id":9,"ticket_cod":"TCK-4","requester_email":"buyer@example.com","event_id":2,"reason":"cannot attend","created_at":"2025-03-01T10:00:00Z","event_owner_id":11}"#;
