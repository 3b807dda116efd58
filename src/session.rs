use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::NotificationChannel;

/// Keep `channel` in step with a credential signal.
///
/// Connects whenever a credential is present and disconnects when it is
/// cleared. When the credential source is dropped the channel is
/// disconnected and the task ends.
pub fn follow_credentials(
    channel: NotificationChannel,
    mut credentials: watch::Receiver<Option<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let credential = credentials.borrow_and_update().clone();

            match credential {
                Some(token) if !token.trim().is_empty() => channel.connect(&token).await,
                _ => channel.disconnect().await,
            }

            if credentials.changed().await.is_err() {
                debug!("Credential source dropped");
                break;
            }
        }

        channel.disconnect().await;
    })
}
