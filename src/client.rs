use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, trace, warn};

use crate::backoff::Backoff;
use crate::config::ChannelConfig;
use crate::connection::{
    Connector, Transport, TungsteniteConnector, WebSocketConnection, WsSink, redacted,
};
use crate::event::NotificationHandler;
use crate::heartbeat::Heartbeat;
use crate::message::{PONG_FRAME, decode};
use crate::state::{ConnectionPhase, ConnectionStore};
use crate::subscription::{Listeners, Subscription};

/// Reconnecting client for the refund notification WebSocket.
///
/// Cloning yields another handle to the same channel. Independent channels are
/// created with separate calls to [`new`](Self::new). Dropping the last
/// handle closes the transport and stops reconnecting, as `disconnect` would.
#[derive(Clone)]
pub struct NotificationChannel {
    shared: Arc<Shared>,
    owner: Arc<Owner>,
}

/// Held only by channel handles; dropping it releases the running supervisor
struct Owner {
    released: watch::Sender<bool>,
}

impl Drop for Owner {
    fn drop(&mut self) {
        self.released.send_replace(true);
    }
}

struct Shared {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    listeners: Arc<Listeners>,
    store: ConnectionStore,
    attempts: AtomicU32,
    lifecycle: Mutex<Lifecycle>,
}

struct Lifecycle {
    credential: Option<String>,
    should_reconnect: bool,
    phase: ConnectionPhase,
    /// Bumped by every connect that spawns a supervisor and by every
    /// disconnect; a supervisor only touches state while its generation is current.
    generation: u64,
    supervisor: Option<Supervisor>,
}

struct Supervisor {
    shutdown: watch::Sender<bool>,
    wake: Arc<Notify>,
    _handle: JoinHandle<()>,
}

/// Stop conditions a supervisor watches
struct StopSignal {
    shutdown: watch::Receiver<bool>,
    released: watch::Receiver<bool>,
}

impl StopSignal {
    /// Resolves on `disconnect` or once every channel handle is gone
    async fn requested(&mut self) {
        tokio::select! {
            _ = raised(&mut self.shutdown) => {}
            _ = raised(&mut self.released) => {}
        }
    }

    fn released(&self) -> bool {
        *self.released.borrow()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Closed,
    Shutdown,
}

impl NotificationChannel {
    /// Create a channel that opens real WebSocket connections
    pub fn new(config: ChannelConfig) -> Self {
        Self::with_connector(config, TungsteniteConnector)
    }

    /// Create a channel that opens transports through `connector`
    pub fn with_connector<C: Connector + 'static>(config: ChannelConfig, connector: C) -> Self {
        let (released, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                config,
                connector: Arc::new(connector),
                listeners: Arc::new(Listeners::default()),
                store: ConnectionStore::new(),
                attempts: AtomicU32::new(0),
                lifecycle: Mutex::new(Lifecycle {
                    credential: None,
                    should_reconnect: false,
                    phase: ConnectionPhase::Disconnected,
                    generation: 0,
                    supervisor: None,
                }),
            }),
            owner: Arc::new(Owner { released }),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    /// Open the channel with `credential` and keep it open until [`disconnect`](Self::disconnect).
    ///
    /// Does nothing while a transport is open or connecting. While a reconnect
    /// is pending, the credential is replaced and the attempt starts at once.
    /// Failures never surface here; watch [`connection_store`](Self::connection_store).
    pub async fn connect(&self, credential: &str) {
        if credential.trim().is_empty() {
            warn!("Ignoring connect request with an empty credential");
            return;
        }

        let mut lifecycle = self.shared.lifecycle.lock().await;
        let phase = lifecycle.phase;

        match phase {
            ConnectionPhase::Open | ConnectionPhase::Connecting => {
                debug!("Notification channel already {:?}, connect ignored", phase);
            }
            ConnectionPhase::Reconnecting { attempt, .. } => {
                lifecycle.credential = Some(credential.to_string());
                lifecycle.should_reconnect = true;
                if let Some(supervisor) = &lifecycle.supervisor {
                    debug!("Connect requested, starting reconnect attempt {} now", attempt);
                    supervisor.wake.notify_one();
                }
            }
            ConnectionPhase::Disconnected => {
                lifecycle.credential = Some(credential.to_string());
                lifecycle.should_reconnect = true;
                lifecycle.generation += 1;
                lifecycle.phase = ConnectionPhase::Connecting;

                let generation = lifecycle.generation;
                let (shutdown, shutdown_rx) = watch::channel(false);
                let stop = StopSignal {
                    shutdown: shutdown_rx,
                    released: self.owner.released.subscribe(),
                };
                let wake = Arc::new(Notify::new());
                let handle = tokio::spawn(supervise(
                    Arc::clone(&self.shared),
                    generation,
                    stop,
                    Arc::clone(&wake),
                ));

                lifecycle.supervisor = Some(Supervisor {
                    shutdown,
                    wake,
                    _handle: handle,
                });
                self.shared.store.set(false);
            }
        }
    }

    /// Close the channel and stop reconnecting. Safe to call at any time.
    pub async fn disconnect(&self) {
        let mut lifecycle = self.shared.lifecycle.lock().await;

        lifecycle.should_reconnect = false;
        lifecycle.generation += 1;
        lifecycle.phase = ConnectionPhase::Disconnected;

        if let Some(supervisor) = lifecycle.supervisor.take() {
            info!("Disconnecting notification channel");
            supervisor.shutdown.send_replace(true);
        }

        self.shared.store.set(false);
    }

    /// Register `handler` for every decoded message; works before `connect`
    pub async fn subscribe<H: NotificationHandler + 'static>(&self, handler: H) -> Subscription {
        self.shared.listeners.insert(Arc::new(handler)).await
    }

    /// Whether a transport is currently open
    pub fn is_connected(&self) -> bool {
        self.shared.store.get()
    }

    /// The observable connected flag for UI layers
    pub fn connection_store(&self) -> &ConnectionStore {
        &self.shared.store
    }

    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.shared.store.subscribe()
    }

    pub async fn phase(&self) -> ConnectionPhase {
        self.shared.lifecycle.lock().await.phase
    }

    /// Reconnect attempts scheduled since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub async fn listener_count(&self) -> usize {
        self.shared.listeners.len().await
    }
}

impl Shared {
    /// Fire-time check before every attempt; yields the credential to use
    async fn begin_attempt(&self, generation: u64) -> Option<String> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.generation != generation || !lifecycle.should_reconnect {
            return None;
        }

        let Some(credential) = lifecycle.credential.clone() else {
            lifecycle.phase = ConnectionPhase::Disconnected;
            lifecycle.supervisor = None;
            return None;
        };

        lifecycle.phase = ConnectionPhase::Connecting;
        Some(credential)
    }

    async fn mark_open(&self, generation: u64) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.generation != generation {
            return false;
        }

        lifecycle.phase = ConnectionPhase::Open;
        self.attempts.store(0, Ordering::SeqCst);
        self.store.set(true);
        true
    }

    /// Record a closed or failed transport and pick the next reconnect delay.
    ///
    /// Returns `None` when the supervisor should stop.
    async fn session_ended(&self, generation: u64, backoff: &Backoff) -> Option<time::Duration> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.generation != generation {
            return None;
        }

        self.store.set(false);

        if !lifecycle.should_reconnect || lifecycle.credential.is_none() {
            lifecycle.phase = ConnectionPhase::Disconnected;
            lifecycle.supervisor = None;
            return None;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = backoff.delay(attempt);
        lifecycle.phase = ConnectionPhase::Reconnecting {
            attempt: attempt + 1,
            delay,
        };

        info!(
            "Reconnecting notification channel in {:.1}s (attempt {})",
            delay.as_secs_f32(),
            attempt + 1
        );
        Some(delay)
    }

    /// Give up after a transport that can never be built
    async fn abandon(&self, generation: u64) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.generation != generation {
            return;
        }

        lifecycle.phase = ConnectionPhase::Disconnected;
        lifecycle.supervisor = None;
        self.store.set(false);
    }

    async fn handle_frame(&self, text: &str) {
        match decode(text) {
            Ok(message) => {
                debug!("Received {} for request {}", message.kind(), message.request_id());
                self.listeners.dispatch(&message).await;
            }
            Err(_) if text == PONG_FRAME => trace!("Received pong"),
            Err(e) => warn!("Failed to parse notification frame: {}", e),
        }
    }
}

/// Connect, run the session, back off and repeat until disarmed or superseded
async fn supervise(
    shared: Arc<Shared>,
    generation: u64,
    mut stop: StopSignal,
    wake: Arc<Notify>,
) {
    let backoff = Backoff::from_config(&shared.config);

    loop {
        let Some(credential) = shared.begin_attempt(generation).await else {
            break;
        };

        let url = match shared.config.endpoint_url(&credential) {
            Ok(url) => url,
            Err(e) => {
                error!("Failed to create notification transport: {}", e);
                shared.abandon(generation).await;
                break;
            }
        };

        info!("Connecting to notification endpoint {}", redacted(&url));

        let opened = tokio::select! {
            result = shared.connector.connect(&url) => result,
            _ = stop.requested() => break,
        };

        match opened {
            Ok(transport) => {
                if !shared.mark_open(generation).await {
                    let mut sink = transport.sink;
                    let _ = sink.close().await;
                    break;
                }

                info!("Notification channel open");

                if run_session(&shared, transport, &mut stop).await == SessionEnd::Shutdown {
                    break;
                }
            }
            Err(e) if e.is_construction_failure() => {
                error!("Failed to create notification transport: {}", e);
                shared.abandon(generation).await;
                break;
            }
            Err(e) => warn!("Notification connection attempt failed: {}", e),
        }

        let Some(delay) = shared.session_ended(generation, &backoff).await else {
            break;
        };

        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = wake.notified() => debug!("Reconnect delay cut short"),
            _ = stop.requested() => break,
        }
    }

    if stop.released() {
        shared.store.set(false);
        debug!("Every channel handle dropped, notification supervisor released");
    }

    debug!("Notification supervisor {} finished", generation);
}

/// Pump one open transport until it closes or shutdown is requested
async fn run_session(
    shared: &Shared,
    transport: Transport,
    stop: &mut StopSignal,
) -> SessionEnd {
    let Transport {
        mut sink,
        mut stream,
    } = transport;

    let (tx, mut rx) = mpsc::channel::<Message>(100);
    let _heartbeat = Heartbeat::spawn(WebSocketConnection::new(tx), shared.config.ping_interval);

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(message) = outgoing else {
                    warn!("Outbound queue closed");
                    return SessionEnd::Closed;
                };
                if let Err(e) = sink.send(message).await {
                    error!("Error sending message: {}", e);
                    return SessionEnd::Closed;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    trace!("Received message: {}", text);
                    tokio::select! {
                        _ = shared.handle_frame(&text) => {}
                        _ = stop.requested() => return close_session(&mut sink).await,
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(frame) => info!(
                            "Server closed connection: code={}, reason='{}'",
                            u16::from(frame.code),
                            frame.reason
                        ),
                        None => info!("Server closed connection without close frame"),
                    }
                    return SessionEnd::Closed;
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!("Ignoring binary frame ({} bytes)", data.len());
                }
                Some(Ok(_)) => trace!("Received control frame"),
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    return SessionEnd::Closed;
                }
                None => {
                    info!("Notification stream ended");
                    return SessionEnd::Closed;
                }
            },
            _ = stop.requested() => return close_session(&mut sink).await,
        }
    }
}

async fn close_session(sink: &mut WsSink) -> SessionEnd {
    if let Err(e) = sink.send(Message::Close(None)).await {
        warn!("Error sending close frame: {}", e);
    }
    SessionEnd::Shutdown
}

/// Resolves once `flag` is set or its sender is gone
async fn raised(flag: &mut watch::Receiver<bool>) {
    let _ = flag.wait_for(|set| *set).await;
}
