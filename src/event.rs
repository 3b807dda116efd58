use async_trait::async_trait;

use crate::message::{NewRefundRequest, NotificationMessage, RefundStatusChanged};

/// Listener for decoded notification messages
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Called once per valid inbound message, in arrival order
    async fn on_message(&self, message: &NotificationMessage);
}

#[async_trait]
impl<F> NotificationHandler for F
where
    F: Fn(&NotificationMessage) + Send + Sync,
{
    async fn on_message(&self, message: &NotificationMessage) {
        self(message)
    }
}

type StatusChangedCallback = Box<dyn Fn(&RefundStatusChanged) + Send + Sync>;
type NewRequestCallback = Box<dyn Fn(&NewRefundRequest) + Send + Sync>;

/// Handler that routes each message variant to its own optional callback
#[derive(Default)]
pub struct RefundNotifications {
    on_refund_status_changed: Option<StatusChangedCallback>,
    on_new_refund_request: Option<NewRequestCallback>,
}

impl RefundNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback for status changes on the user's own refund requests
    pub fn on_refund_status_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RefundStatusChanged) + Send + Sync + 'static,
    {
        self.on_refund_status_changed = Some(Box::new(callback));
        self
    }

    /// Callback for new refund requests on events the user owns
    pub fn on_new_refund_request<F>(mut self, callback: F) -> Self
    where
        F: Fn(&NewRefundRequest) + Send + Sync + 'static,
    {
        self.on_new_refund_request = Some(Box::new(callback));
        self
    }
}

#[async_trait]
impl NotificationHandler for RefundNotifications {
    async fn on_message(&self, message: &NotificationMessage) {
        match message {
            NotificationMessage::RefundStatusChanged(data) => {
                if let Some(callback) = &self.on_refund_status_changed {
                    callback(data);
                }
            }
            NotificationMessage::NewRefundRequest(data) => {
                if let Some(callback) = &self.on_new_refund_request {
                    callback(data);
                }
            }
        }
    }
}
