//! Client for the ticketing platform's refund notification WebSocket.
//!
//! A [`NotificationChannel`] keeps one connection to the notification
//! endpoint open, reconnects with jittered exponential backoff when it drops,
//! pings it every 30 seconds and hands every decoded [`NotificationMessage`]
//! to the registered listeners.
//!
//! ```no_run
//! use refund_notify::{ChannelConfig, NotificationChannel, RefundNotifications};
//!
//! # async fn example() {
//! let channel = NotificationChannel::new(ChannelConfig::default());
//!
//! let subscription = channel
//!     .subscribe(RefundNotifications::new().on_refund_status_changed(|change| {
//!         println!("refund {} is now {}", change.request_id, change.status);
//!     }))
//!     .await;
//!
//! channel.connect("bearer-token").await;
//! // ...
//! subscription.unsubscribe().await;
//! channel.disconnect().await;
//! # }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
mod heartbeat;
pub mod message;
pub mod session;
pub mod state;
pub mod subscription;

pub use backoff::Backoff;
pub use client::NotificationChannel;
pub use config::ChannelConfig;
pub use connection::{Connector, Transport, TungsteniteConnector, WsSink, WsStream};
pub use error::NotifyError;
pub use event::{NotificationHandler, RefundNotifications};
pub use message::{NewRefundRequest, NotificationMessage, RefundStatusChanged};
pub use session::follow_credentials;
pub use state::{ConnectionPhase, ConnectionStore};
pub use subscription::Subscription;
