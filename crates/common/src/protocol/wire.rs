// Wire frames for the per-note relay channel (JSON text frames).
//
// The relay is a pure fan-out: it rebroadcasts client frames to every
// session subscribed to the note (including, on some relays, the sender)
// and pushes presence counts. Deltas are carried verbatim.

use serde::{Deserialize, Serialize};

use crate::types::{ClientId, Delta};

/// Client -> relay: a locally originated change, tagged with its origin so
/// the originating session can discard the echo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientFrame {
    pub delta: Delta,
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
}

/// Relay -> client frames, discriminated on `type`.
///
/// Unknown discriminants decode to `Unknown` and are skipped, not fatal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Rebroadcast of a change from some session (possibly this one).
    Message {
        #[serde(rename = "clientId")]
        client_id: ClientId,
        delta: Delta,
    },
    /// Authoritative count of sessions currently connected to this note.
    UserCount { count: u32 },
    #[serde(other)]
    Unknown,
}
