//! Integration tests: full session lifecycle against a real WebSocket
//! peer on localhost.

use std::time::Duration;

use clipsync_core::bridge::PNG_SIGNATURE;
use clipsync_core::network::CLOSE_REASON;
use clipsync_core::{
    ClipSyncError, ClipboardBridge, ContentCodec, ContentEnvelope, ContentKind, ErrorKind,
    MemoryClipboard, MemoryImageStore, SessionConfig, SessionController, SessionEvent,
    SessionStatus, WsConnector,
};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_test::{assert_err, assert_ok};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ──────────────────────────────────────────────────────

/// Listener on an OS-assigned port plus the matching peer address.
async fn ephemeral_peer() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, format!("ws://127.0.0.1:{port}/ws"))
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("timeout waiting for connect")
        .unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Next text payload from the client, skipping control frames.
async fn recv_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream ended")
            .unwrap();
        match msg {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

fn controller() -> (
    SessionController<WsConnector>,
    UnboundedReceiver<SessionEvent>,
    MemoryClipboard,
    MemoryImageStore,
) {
    controller_with(SessionConfig::default())
}

fn controller_with(
    config: SessionConfig,
) -> (
    SessionController<WsConnector>,
    UnboundedReceiver<SessionEvent>,
    MemoryClipboard,
    MemoryImageStore,
) {
    let clipboard = MemoryClipboard::new();
    let images = MemoryImageStore::new();
    let bridge = ClipboardBridge::new(Box::new(clipboard.clone()), Box::new(images.clone()));
    let (controller, events) = SessionController::new(WsConnector, bridge, config);
    (controller, events, clipboard, images)
}

/// Next `ContentReceived`, skipping status changes.
async fn next_content(events: &mut UnboundedReceiver<SessionEvent>) -> (ContentKind, String) {
    loop {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("timeout waiting for event")
            .expect("event channel closed");
        match event {
            SessionEvent::ContentReceived { kind, detail } => return (kind, detail),
            SessionEvent::StatusChanged { .. } => continue,
            other => panic!("unexpected event: {other}"),
        }
    }
}

async fn wait_status(controller: &SessionController<WsConnector>, want: SessionStatus) {
    tokio::time::timeout(WAIT, controller.wait_for_status(|s| *s == want))
        .await
        .expect("timeout waiting for status")
        .unwrap();
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_lifecycle_over_websocket() {
    let (listener, addr) = ephemeral_peer().await;
    let (mut controller, mut events, clipboard, images) = controller();

    assert_eq!(
        controller.start_sync(&addr).await.unwrap(),
        SessionStatus::Connecting
    );
    let mut peer = accept(&listener).await;
    assert_eq!(recv_text(&mut peer).await, "START_SYNC");
    wait_status(&controller, SessionStatus::Active).await;

    // Outbound
    assert_ok!(controller.send_text("from phone"));
    assert_eq!(recv_text(&mut peer).await, "text:from phone");

    assert_ok!(controller.send_image(vec![0xde, 0xad, 0xbe, 0xef]));
    assert_eq!(recv_text(&mut peer).await, "image:3q2+7w==");

    // Inbound text
    peer.send(Message::text("text:from desktop")).await.unwrap();
    assert_eq!(
        next_content(&mut events).await,
        (ContentKind::Text, "from desktop".to_string())
    );
    assert_eq!(clipboard.contents().as_deref(), Some("from desktop"));

    // Inbound text in a binary frame
    peer.send(Message::binary(b"text:binary".to_vec())).await.unwrap();
    assert_eq!(
        next_content(&mut events).await,
        (ContentKind::Text, "binary".to_string())
    );

    // Inbound image
    let mut png = PNG_SIGNATURE.to_vec();
    png.extend_from_slice(&[7; 64]);
    let frame = ContentCodec::default().encode(&ContentEnvelope::Image(png.clone()));
    peer.send(Message::text(frame)).await.unwrap();
    let (kind, id) = next_content(&mut events).await;
    assert_eq!(kind, ContentKind::Image);
    assert_eq!(images.get(&id), Some(png));

    // Stop closes with a normal-closure frame
    assert_eq!(controller.stop_sync().await, SessionStatus::Stopped);
    let close = tokio::time::timeout(WAIT, peer.next())
        .await
        .expect("timeout waiting for close")
        .expect("stream ended")
        .unwrap();
    match close {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Normal);
            assert_eq!(frame.reason, CLOSE_REASON);
        }
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_frame_does_not_break_session() {
    let (listener, addr) = ephemeral_peer().await;
    let (mut controller, mut events, clipboard, _) = controller();

    controller.start_sync(&addr).await.unwrap();
    let mut peer = accept(&listener).await;
    recv_text(&mut peer).await;
    wait_status(&controller, SessionStatus::Active).await;

    peer.send(Message::text("garbage")).await.unwrap();
    peer.send(Message::text("text:ok")).await.unwrap();

    let mut saw_decode_error = false;
    loop {
        let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
        match event {
            SessionEvent::Error { kind, .. } => {
                assert_eq!(kind, ErrorKind::Decode);
                saw_decode_error = true;
            }
            SessionEvent::ContentReceived { detail, .. } => {
                assert_eq!(detail, "ok");
                break;
            }
            SessionEvent::StatusChanged { .. } => {}
        }
    }
    assert!(saw_decode_error);
    assert_eq!(clipboard.contents().as_deref(), Some("ok"));
    assert_eq!(controller.status(), SessionStatus::Active);

    controller.stop_sync().await;
}

#[tokio::test]
async fn test_send_rejected_while_paused() {
    let (listener, addr) = ephemeral_peer().await;
    let (mut controller, _events, _, _) = controller();

    controller.start_sync(&addr).await.unwrap();
    let mut peer = accept(&listener).await;
    recv_text(&mut peer).await;
    wait_status(&controller, SessionStatus::Active).await;

    assert_ok!(controller.pause_sync());
    wait_status(&controller, SessionStatus::Paused).await;
    let err = assert_err!(controller.send_text("blocked"));
    assert!(matches!(err, ClipSyncError::Paused));

    assert_ok!(controller.resume_sync());
    wait_status(&controller, SessionStatus::Active).await;
    assert_ok!(controller.send_text("flowing"));
    assert_eq!(recv_text(&mut peer).await, "text:flowing");

    controller.stop_sync().await;
}

// ── Recovery ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnects_when_peer_drops() {
    let (listener, addr) = ephemeral_peer().await;
    let (mut controller, _events, _, _) = controller();

    controller.start_sync(&addr).await.unwrap();
    let mut first = accept(&listener).await;
    assert_eq!(recv_text(&mut first).await, "START_SYNC");
    wait_status(&controller, SessionStatus::Active).await;

    drop(first);

    let mut second = accept(&listener).await;
    assert_eq!(recv_text(&mut second).await, "START_SYNC");
    wait_status(&controller, SessionStatus::Active).await;

    assert_ok!(controller.send_text("after reconnect"));
    assert_eq!(recv_text(&mut second).await, "text:after reconnect");

    controller.stop_sync().await;
}

#[tokio::test]
async fn test_unreachable_peer_fails_after_three_attempts() {
    // Bind then drop to get a port nobody listens on.
    let (listener, addr) = ephemeral_peer().await;
    drop(listener);

    let config = SessionConfig {
        backoff_delay: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let (mut controller, mut events, _, _) = controller_with(config);

    controller.start_sync(&addr).await.unwrap();
    wait_status(&controller, SessionStatus::Failed).await;

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Error { kind, .. } = event {
            kinds.push(kind);
        }
    }
    assert_eq!(
        kinds,
        vec![
            ErrorKind::ConnectFailure,
            ErrorKind::ConnectFailure,
            ErrorKind::ConnectFailure,
            ErrorKind::RetryExhausted
        ]
    );

    // Terminal: stop leaves it Failed.
    assert_eq!(controller.stop_sync().await, SessionStatus::Failed);
}

#[tokio::test]
async fn test_invalid_address_never_reaches_socket() {
    let (listener, addr) = ephemeral_peer().await;
    let (mut controller, _events, _, _) = controller();

    let wrong_path = addr.replace("/ws", "/sync");
    let err = assert_err!(controller.start_sync(&wrong_path).await);
    assert!(matches!(err, ClipSyncError::InvalidAddress(_)));

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "no connection expected");
    assert_eq!(controller.status(), SessionStatus::Idle);
}
