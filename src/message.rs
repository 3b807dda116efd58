use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Keep-alive text frame sent by the client while connected.
pub const PING_FRAME: &str = "ping";

/// Reply some servers send back for [`PING_FRAME`]. Not a domain message.
pub const PONG_FRAME: &str = "pong";

/// Refund notification pushed by the server, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationMessage {
    RefundStatusChanged(RefundStatusChanged),
    NewRefundRequest(NewRefundRequest),
}

impl NotificationMessage {
    /// Wire name of the variant, as found in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationMessage::RefundStatusChanged(_) => "refund_status_changed",
            NotificationMessage::NewRefundRequest(_) => "new_refund_request",
        }
    }

    pub fn request_id(&self) -> i32 {
        match self {
            NotificationMessage::RefundStatusChanged(m) => m.request_id,
            NotificationMessage::NewRefundRequest(m) => m.request_id,
        }
    }
}

/// A refund request owned by the user changed state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundStatusChanged {
    pub request_id: i32,
    pub ticket_cod: String,
    pub status: String,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub user_id: i32,
}

/// A buyer asked for a refund on a ticket of an event the user owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRefundRequest {
    pub request_id: i32,
    pub ticket_cod: String,
    pub requester_email: String,
    #[serde(default)]
    pub event_id: Option<i32>,
    #[serde(default)]
    pub packet_id: Option<i32>,
    pub reason: String,
    pub created_at: String,
    pub event_owner_id: i32,
}

/// Decode one inbound text frame.
///
/// Anything that is not one of the two known shapes is rejected, including
/// the liveness reply and empty frames. Extra fields are ignored.
pub fn decode(text: &str) -> Result<NotificationMessage, NotifyError> {
    Ok(serde_json::from_str::<NotificationMessage>(text)?)
}
