// Failure taxonomy for the collaborative session.
//
// Policy per boundary:
// - `LoadFailure` blocks session start and is surfaced to the caller.
// - `TransportFailure` closes the socket; editing degrades to local-only
//   with no peer propagation.
// - `SaveFailure` is swallowed at the flush boundary; the next local edit
//   re-arms the scheduler, which is the only retry path.
// None of these propagate as panics.

use thiserror::Error;

/// Document store call failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document store returned status {0}")]
    Status(u16),

    #[error("failed to decode store response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid store url: {0}")]
    Url(#[from] url::ParseError),

    #[error("share-token sessions cannot create documents")]
    ShareTokenCreate,
}

/// Initial snapshot fetch failed. The editing surface must not be shown:
/// editing without a confirmed snapshot would silently create a duplicate
/// document on the first keystroke.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("note not found")]
    NotFound,

    #[error("failed to fetch note: {0}")]
    Fetch(#[source] StoreError),
}

/// Socket-level failure. The session transitions to `Closed`; no automatic
/// reconnect.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("invalid socket url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("websocket connect failed: {0}")]
    Connect(String),

    #[error("websocket send failed: {0}")]
    Send(String),

    #[error("websocket receive failed: {0}")]
    Recv(String),

    #[error("socket is not connected")]
    NotConnected,
}

/// A flush against the document store failed. Logged and swallowed; the
/// pending state stays unpersisted until the next edit re-arms a flush.
#[derive(Debug, Error)]
pub enum SaveFailure {
    #[error("create failed: {0}")]
    Create(#[source] StoreError),

    #[error("update failed: {0}")]
    Update(#[source] StoreError),
}
