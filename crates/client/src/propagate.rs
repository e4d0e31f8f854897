// Change propagation: tags outgoing edits with this session's origin id
// and filters self-originated echoes out of the inbound stream.
//
// The relay is a pure fan-out and may echo a session's own frames back to
// it; matching on the client id is what keeps a session from re-applying
// its own edits. Foreign deltas pass through untouched.

use cowrite_common::protocol::wire::{ClientFrame, ServerFrame};
use cowrite_common::types::{ClientId, Delta};

/// Routing decision for an inbound relay frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A foreign change: apply to the editing surface via its remote-apply
    /// entry point (which must not re-emit it as a local change).
    Apply(Delta),
    /// A presence update: route to the presence tracker.
    Presence(u32),
    /// This session's own broadcast looped back; discard.
    Echo,
    /// Unknown frame kind; ignore, not fatal.
    Ignored,
}

/// Wraps local edits for broadcast and classifies inbound frames.
#[derive(Debug, Clone)]
pub struct ChangePropagator {
    client_id: ClientId,
}

impl ChangePropagator {
    pub fn new(client_id: ClientId) -> Self {
        Self { client_id }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Tag a locally originated operation with this session's identity.
    pub fn outbound(&self, delta: Delta) -> ClientFrame {
        ClientFrame { delta, client_id: self.client_id }
    }

    /// Decide what to do with an inbound frame.
    pub fn classify(&self, frame: ServerFrame) -> Inbound {
        match frame {
            ServerFrame::Message { client_id, .. } if client_id == self.client_id => Inbound::Echo,
            ServerFrame::Message { delta, .. } => Inbound::Apply(delta),
            ServerFrame::UserCount { count } => Inbound::Presence(count),
            ServerFrame::Unknown => Inbound::Ignored,
        }
    }
}
