use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use tokio::sync::Mutex;
use tracing::{error, trace};

use crate::event::NotificationHandler;
use crate::message::NotificationMessage;

/// Registry of listeners shared by a channel and its subscription handles
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<u64, Arc<dyn NotificationHandler>>>,
}

impl Listeners {
    pub(crate) async fn insert(
        self: &Arc<Self>,
        handler: Arc<dyn NotificationHandler>,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().await.insert(id, handler);

        Subscription {
            id,
            listeners: Arc::downgrade(self),
            active: AtomicBool::new(true),
        }
    }

    pub(crate) async fn len(&self) -> usize {
        self.handlers.lock().await.len()
    }

    /// Deliver `message` to every listener.
    ///
    /// Listeners run on a snapshot taken without holding the lock, so they may
    /// subscribe or unsubscribe from inside the callback. A panicking listener
    /// is logged and does not stop delivery to the others.
    pub(crate) async fn dispatch(&self, message: &NotificationMessage) {
        let handlers: Vec<(u64, Arc<dyn NotificationHandler>)> = self
            .handlers
            .lock()
            .await
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        trace!(
            "Dispatching {} #{} to {} listener(s)",
            message.kind(),
            message.request_id(),
            handlers.len()
        );

        for (id, handler) in handlers {
            if AssertUnwindSafe(handler.on_message(message))
                .catch_unwind()
                .await
                .is_err()
            {
                error!("Listener {} panicked while handling {}", id, message.kind());
            }
        }
    }
}

/// Handle returned by [`NotificationChannel::subscribe`](crate::NotificationChannel::subscribe)
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove exactly the listener this handle was created for. Safe to call repeatedly.
    pub async fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(listeners) = self.listeners.upgrade() {
            listeners.handlers.lock().await.remove(&self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
