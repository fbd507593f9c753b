//! WebSocket transport over `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::address::PeerAddress;
use crate::error::{ClipSyncError, DecodeError};
use crate::network::{CLOSE_REASON, Connector, Link};

/// Plain `ws://` connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Link = WsLink;

    async fn connect(&self, peer: &PeerAddress) -> Result<WsLink, ClipSyncError> {
        let (stream, response) = connect_async(peer.url())
            .await
            .map_err(|e| ClipSyncError::ConnectFailure(e.to_string()))?;
        debug!(peer = %peer, status = %response.status(), "websocket handshake complete");
        Ok(WsLink { stream })
    }
}

/// An open WebSocket to the peer.
pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn send_frame(&mut self, frame: String) -> Result<(), ClipSyncError> {
        self.stream.send(Message::text(frame)).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<String, ClipSyncError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };

            match message {
                Message::Text(text) => return Some(Ok(text)),
                Message::Binary(data) => {
                    // Some peers send text content in binary frames.
                    return Some(String::from_utf8(data).map_err(|_| {
                        DecodeError::InvalidEncoding("binary frame is not utf-8".into()).into()
                    }));
                }
                Message::Close(frame) => {
                    debug!(?frame, "peer sent close");
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("control frame");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClipSyncError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: CLOSE_REASON.into(),
        };
        match self.stream.close(Some(frame)).await {
            Ok(())
            | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
