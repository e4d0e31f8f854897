// Edit session: WebSocket connection lifecycle for one open note.
//
// States: Disconnected -> Connecting -> Open -> Closed, with Closed
// reachable from any state. There is no automatic reconnect: the session
// owner may re-invoke `open`, and closing a closed session is a no-op.
// Sends attempted while not Open are dropped, not buffered — a dropped
// frame only delays peers, the save path still captures the edit.
//
// Transport is abstracted via `SocketTransport` for testability. The
// tokio-tungstenite implementation lives in the `transport` module.

use std::net::IpAddr;

use tracing::{debug, info, warn};
use url::Url;

use cowrite_common::protocol::wire::{ClientFrame, ServerFrame};
use cowrite_common::types::SessionAccess;

use crate::error::TransportFailure;

/// Abstraction over the socket transport.
pub trait SocketTransport {
    /// Open a WebSocket connection to the given URL.
    async fn connect(&mut self, ws_url: &Url) -> Result<(), TransportFailure>;

    /// Send a frame over the connection.
    async fn send(&mut self, frame: &ClientFrame) -> Result<(), TransportFailure>;

    /// Receive the next decodable frame. Returns `None` on clean close.
    async fn recv(&mut self) -> Result<Option<ServerFrame>, TransportFailure>;

    /// Close the connection.
    async fn close(&mut self);
}

/// Connection state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

/// Owns the relay connection for one note and one client identity.
pub struct EditSession<T: SocketTransport> {
    transport: T,
    state: SessionState,
}

impl<T: SocketTransport> EditSession<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, state: SessionState::Disconnected }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Connect to the relay channel for `note_id`.
    ///
    /// If a connection is already open (the document identity changed),
    /// it is closed first: at most one live socket per note per client.
    /// A transport failure logs a warning and leaves the session `Closed`.
    pub async fn open(
        &mut self,
        ws_base: &Url,
        note_id: u64,
        access: &SessionAccess,
    ) -> Result<(), TransportFailure> {
        if self.state == SessionState::Open {
            self.transport.close().await;
        }

        let url = note_socket_url(ws_base, note_id, access)?;
        self.state = SessionState::Connecting;

        match self.transport.connect(&url).await {
            Ok(()) => {
                self.state = SessionState::Open;
                info!(note_id, "edit session open");
                Ok(())
            }
            Err(error) => {
                self.state = SessionState::Closed;
                warn!(note_id, %error, "socket connect failed");
                Err(error)
            }
        }
    }

    /// Broadcast a locally originated change. Returns whether the frame
    /// was actually sent; while not `Open` the frame is dropped.
    pub async fn send_change(&mut self, frame: &ClientFrame) -> bool {
        if self.state != SessionState::Open {
            debug!("dropping local change broadcast; session not open");
            return false;
        }
        match self.transport.send(frame).await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "socket send failed; closing session");
                self.transport.close().await;
                self.state = SessionState::Closed;
                false
            }
        }
    }

    /// Receive the next inbound frame. Returns `None` when the session is
    /// not open, or once the relay closes or errors the connection (the
    /// session then stays `Closed`).
    pub async fn next_frame(&mut self) -> Option<ServerFrame> {
        if self.state != SessionState::Open {
            return None;
        }
        match self.transport.recv().await {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => {
                info!("relay closed the connection");
                self.state = SessionState::Closed;
                None
            }
            Err(error) => {
                warn!(%error, "socket receive failed; closing session");
                self.transport.close().await;
                self.state = SessionState::Closed;
                None
            }
        }
    }

    /// Tear the session down. Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transport.close().await;
        self.state = SessionState::Closed;
    }
}

/// Build the relay channel URL: note id in the path, exactly one of
/// `authToken=` (bearer) or `token=` (share) in the query.
pub(crate) fn note_socket_url(
    base: &Url,
    note_id: u64,
    access: &SessionAccess,
) -> Result<Url, TransportFailure> {
    validate_ws_url(base)?;
    let mut url = base.join(&format!("documents/{note_id}/")).map_err(|error| {
        TransportFailure::InvalidUrl { url: base.to_string(), reason: error.to_string() }
    })?;
    let (key, value) = access.ws_query_param();
    url.query_pairs_mut().clear().append_pair(key, value);
    Ok(url)
}

fn validate_ws_url(url: &Url) -> Result<(), TransportFailure> {
    match url.scheme() {
        "wss" => Ok(()),
        "ws" if is_loopback_host(url.host_str()) => Ok(()),
        _ => Err(TransportFailure::InvalidUrl {
            url: url.to_string(),
            reason: "socket url must use wss (ws is allowed only for localhost testing)".into(),
        }),
    }
}

fn is_loopback_host(host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|addr| addr.is_loopback())
}
