use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use refund_notify::{ChannelConfig, NotificationChannel, NotificationMessage};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;

const STATUS_CHANGED: &str = r#"{"type":"refund_status_changed","request_id":7,"ticket_cod":"TCK-1","status":"APPROVED","event_name":"Spring Gala","user_id":3}"#;

#[tokio::test]
async fn talks_to_a_real_websocket_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (query_tx, query_rx) = oneshot::channel::<String>();
    let (text_tx, mut text_rx) = mpsc::unbounded_channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let query = request.uri().query().unwrap_or_default().to_string();
            let _ = query_tx.send(query);
            Ok(response)
        };
        let mut ws = accept_hdr_async(stream, callback).await.unwrap();

        ws.send(Message::Text("pong".to_string())).await.unwrap();
        ws.send(Message::Text(STATUS_CHANGED.to_string())).await.unwrap();

        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => {
                    let _ = text_tx.send(text);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let config = ChannelConfig::new(&format!("ws://{}/ws", addr))
        .with_ping_interval(Duration::from_millis(100));
    let channel = NotificationChannel::new(config);

    let (message_tx, mut message_rx) = mpsc::unbounded_channel::<NotificationMessage>();
    let _subscription = channel
        .subscribe(move |message: &NotificationMessage| {
            let _ = message_tx.send(message.clone());
        })
        .await;

    let mut connected = channel.watch_connected();
    channel.connect("secret token").await;

    let query = timeout(Duration::from_secs(5), query_rx).await.unwrap().unwrap();
    assert_eq!(query, "token=secret+token");

    timeout(Duration::from_secs(5), connected.wait_for(|open| *open))
        .await
        .unwrap()
        .unwrap();
    assert!(channel.is_connected());

    let message = timeout(Duration::from_secs(5), message_rx.recv())
        .await
        .unwrap()
        .unwrap();
    match message {
        NotificationMessage::RefundStatusChanged(change) => {
            assert_eq!(change.request_id, 7);
            assert_eq!(change.event_name.as_deref(), Some("Spring Gala"));
        }
        other => panic!("unexpected message: {:?}", other),
    }

    let ping = timeout(Duration::from_secs(5), text_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ping, "ping");

    channel.disconnect().await;
    assert!(!channel.is_connected());
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert!(message_rx.try_recv().is_err());
}
