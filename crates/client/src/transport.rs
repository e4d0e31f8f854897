// Production WebSocket transport over tokio-tungstenite.
//
// Kept thin on purpose: all protocol decisions (echo filtering, state
// transitions, drop-when-not-open) live in `session` and `propagate`.
// Undecodable text frames are skipped; binary frames are ignored; ping
// and pong are handled by the library.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use cowrite_common::protocol::wire::{ClientFrame, ServerFrame};

use crate::error::TransportFailure;
use crate::session::SocketTransport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-text-frame WebSocket transport.
#[derive(Debug, Default)]
pub struct WsTransport {
    stream: Option<WsStream>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SocketTransport for WsTransport {
    async fn connect(&mut self, ws_url: &Url) -> Result<(), TransportFailure> {
        let (stream, _response) = connect_async(ws_url.as_str())
            .await
            .map_err(|error| TransportFailure::Connect(error.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<(), TransportFailure> {
        let stream = self.stream.as_mut().ok_or(TransportFailure::NotConnected)?;
        let text = serde_json::to_string(frame)
            .map_err(|error| TransportFailure::Send(error.to_string()))?;
        stream
            .send(Message::text(text))
            .await
            .map_err(|error| TransportFailure::Send(error.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<ServerFrame>, TransportFailure> {
        let stream = self.stream.as_mut().ok_or(TransportFailure::NotConnected)?;
        loop {
            match stream.next().await {
                None => return Ok(None),
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerFrame>(text.as_str()) {
                        Ok(frame) => return Ok(Some(frame)),
                        Err(error) => {
                            debug!(%error, "skipping undecodable relay frame");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(error)) => return Err(TransportFailure::Recv(error.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use cowrite_common::types::{ClientId, Delta};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn send_before_connect_reports_not_connected() {
        let mut transport = WsTransport::new();
        let frame = ClientFrame {
            delta: Delta(json!({ "ops": [] })),
            client_id: ClientId::generate(),
        };
        let err = transport.send(&frame).await.unwrap_err();
        assert!(matches!(err, TransportFailure::NotConnected));
    }

    #[tokio::test]
    async fn recv_before_connect_reports_not_connected() {
        let mut transport = WsTransport::new();
        let err = transport.recv().await.unwrap_err();
        assert!(matches!(err, TransportFailure::NotConnected));
    }

    #[tokio::test]
    async fn close_without_connection_is_a_no_op() {
        let mut transport = WsTransport::new();
        transport.close().await;
        transport.close().await;
    }
}
