//! End-to-end test against a real tokio-tungstenite loopback server.

mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

use chatwire::{BackoffConfig, Connection, ConnectionConfig, Payload};

use support::{ListenerEvent, expect_event, init_tracing, recording_listener};

const API_KEY: &str = "integration-key";

/// Serve two WebSocket sessions on a loopback port.
///
/// The first session verifies the API-key header, echoes one message and
/// closes; the second echoes until the client goes away.
async fn spawn_echo_server() -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let handle = tokio::spawn(async move {
        for round in 0..2 {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_hdr_async(
                stream,
                |request: &Request, response: Response| {
                    let key = request
                        .headers()
                        .get("x-api-key")
                        .and_then(|value| value.to_str().ok());
                    assert_eq!(key, Some(API_KEY), "handshake missing api key");
                    Ok(response)
                },
            )
            .await
            .expect("websocket accept");

            if round == 0 {
                if let Some(Ok(message)) = ws.next().await {
                    if message.is_text() || message.is_binary() {
                        ws.send(message).await.expect("echo");
                    }
                }
                let _ = ws.close(None).await;
                // Drain until the client is gone so the close completes.
                while let Some(Ok(_)) = ws.next().await {}
            } else {
                while let Some(Ok(message)) = ws.next().await {
                    if (message.is_text() || message.is_binary())
                        && ws.send(message).await.is_err()
                    {
                        break;
                    }
                }
            }
        }
    });
    (port, handle)
}

#[tokio::test]
async fn echo_roundtrip_server_close_and_reconnect() {
    init_tracing();
    let (port, server) = spawn_echo_server().await;
    let (listener, mut events) = recording_listener();
    let connection = Connection::new(
        &format!("ws://127.0.0.1:{port}/chat"),
        API_KEY,
        listener,
        ConnectionConfig::new(BackoffConfig {
            base_delay: Duration::from_millis(20),
            max_shift: 2,
        }),
    )
    .expect("connection");

    assert!(connection.connect(true).await.expect("connect"));
    assert_eq!(
        expect_event(&mut events).await,
        ListenerEvent::Connect {
            was_reconnecting: false
        }
    );
    assert!(connection.is_connected());

    connection.send_text("hello");
    assert_eq!(
        expect_event(&mut events).await,
        ListenerEvent::Message(Payload::Text("hello".to_string()))
    );

    // The server closes after the first echo; the cascade brings us back.
    match expect_event(&mut events).await {
        ListenerEvent::Disconnect {
            server_initiated, ..
        } => assert!(server_initiated, "server close should be clean"),
        other => panic!("expected disconnect, got {other:?}"),
    }
    loop {
        match expect_event(&mut events).await {
            ListenerEvent::Connect { was_reconnecting } => {
                assert!(was_reconnecting);
                break;
            }
            // Retry attempts that race the server's accept loop.
            ListenerEvent::Error(_) => continue,
            other => panic!("expected reconnect, got {other:?}"),
        }
    }

    connection.send_text("again");
    assert_eq!(
        expect_event(&mut events).await,
        ListenerEvent::Message(Payload::Text("again".to_string()))
    );

    connection.disconnect();
    match expect_event(&mut events).await {
        ListenerEvent::Disconnect {
            server_initiated, ..
        } => assert!(!server_initiated),
        other => panic!("expected disconnect, got {other:?}"),
    }

    server.await.expect("server task");
}
