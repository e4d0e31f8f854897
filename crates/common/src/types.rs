// Core domain types shared across all Cowrite crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel identifier for a note that has not been persisted yet.
pub const NEW_NOTE_SENTINEL: &str = "new";

/// Title persisted when the user never typed one.
pub const UNTITLED: &str = "Untitled";

/// Identity of a note: the `"new"` sentinel for an unsaved draft, or a
/// server-assigned id. A note starts as `New` and is assigned an id by the
/// first successful create; the sentinel must never be reused afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteId {
    New,
    Assigned(u64),
}

impl NoteId {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }

    pub fn assigned(&self) -> Option<u64> {
        match self {
            Self::New => None,
            Self::Assigned(id) => Some(*id),
        }
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str(NEW_NOTE_SENTINEL),
            Self::Assigned(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid note id `{0}` (expected `new` or a numeric id)")]
pub struct NoteIdParseError(pub String);

impl FromStr for NoteId {
    type Err = NoteIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NEW_NOTE_SENTINEL {
            return Ok(Self::New);
        }
        s.parse::<u64>().map(Self::Assigned).map_err(|_| NoteIdParseError(s.to_string()))
    }
}

/// Process-lifetime-unique token identifying one editing-surface instance.
///
/// Used solely to tag outgoing changes so the originating session can
/// discard its own echo; carries no authentication meaning. Constructed
/// per session and passed explicitly, never held as a process-wide global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An opaque, order-sensitive text-editing operation produced by the
/// editing surface. Transported and replayed verbatim, never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta(pub serde_json::Value);

/// A persisted note as returned by the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteSnapshot {
    pub id: u64,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default)]
    pub is_owner: bool,
}

/// The full document state sent to the store on save: the single
/// PendingSave payload. Coalesced by overwrite, never queued.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category_id: Option<u64>,
}

impl NoteDraft {
    /// Title as persisted: empty titles fall back to "Untitled".
    pub fn effective_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }
}

/// How this session is authorized. Exactly one mode is active per session;
/// it determines both the persistence endpoint shape and the socket URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAccess {
    /// Authenticated identity's bearer credential.
    Bearer(String),
    /// Single-use share token embedded in the document URL.
    ShareToken(String),
}

impl SessionAccess {
    pub fn is_share(&self) -> bool {
        matches!(self, Self::ShareToken(_))
    }

    /// Query parameter carried on the socket URL: `authToken` for bearer
    /// sessions, `token` for share sessions. Exactly one is ever present.
    pub fn ws_query_param(&self) -> (&'static str, &str) {
        match self {
            Self::Bearer(token) => ("authToken", token),
            Self::ShareToken(token) => ("token", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── NoteId ─────────────────────────────────────────────────────

    #[test]
    fn note_id_displays_sentinel_and_number() {
        assert_eq!(NoteId::New.to_string(), "new");
        assert_eq!(NoteId::Assigned(42).to_string(), "42");
    }

    #[test]
    fn note_id_parses_sentinel() {
        assert_eq!("new".parse::<NoteId>().unwrap(), NoteId::New);
    }

    #[test]
    fn note_id_parses_numeric() {
        assert_eq!("17".parse::<NoteId>().unwrap(), NoteId::Assigned(17));
    }

    #[test]
    fn note_id_rejects_garbage() {
        let err = "n3w".parse::<NoteId>().unwrap_err();
        assert!(err.to_string().contains("n3w"));
    }

    #[test]
    fn note_id_accessors() {
        assert!(NoteId::New.is_new());
        assert_eq!(NoteId::New.assigned(), None);
        assert_eq!(NoteId::Assigned(5).assigned(), Some(5));
    }

    // ── ClientId ───────────────────────────────────────────────────

    #[test]
    fn client_ids_are_unique_per_generate() {
        assert_ne!(ClientId::generate(), ClientId::generate());
    }

    // ── NoteDraft ──────────────────────────────────────────────────

    #[test]
    fn empty_title_persists_as_untitled() {
        let draft = NoteDraft { title: String::new(), ..Default::default() };
        assert_eq!(draft.effective_title(), "Untitled");

        let draft = NoteDraft { title: "   ".into(), ..Default::default() };
        assert_eq!(draft.effective_title(), "Untitled");
    }

    #[test]
    fn non_empty_title_is_kept() {
        let draft = NoteDraft { title: "Meeting notes".into(), ..Default::default() };
        assert_eq!(draft.effective_title(), "Meeting notes");
    }

    #[test]
    fn draft_serializes_with_camel_case_fields() {
        let draft =
            NoteDraft { title: "t".into(), body: "b".into(), category_id: Some(3) };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["categoryId"], 3);
        assert_eq!(json["title"], "t");
        assert_eq!(json["body"], "b");
    }

    #[test]
    fn snapshot_decodes_rest_shape() {
        let snapshot: NoteSnapshot = serde_json::from_str(
            r#"{"id":9,"title":"t","body":"<p>hi</p>","categoryId":null,"isOwner":true}"#,
        )
        .unwrap();
        assert_eq!(snapshot.id, 9);
        assert!(snapshot.is_owner);
        assert_eq!(snapshot.category_id, None);
    }

    // ── SessionAccess ──────────────────────────────────────────────

    #[test]
    fn ws_query_param_is_mode_exclusive() {
        let bearer = SessionAccess::Bearer("jwt".into());
        assert_eq!(bearer.ws_query_param(), ("authToken", "jwt"));
        assert!(!bearer.is_share());

        let share = SessionAccess::ShareToken("cap".into());
        assert_eq!(share.ws_query_param(), ("token", "cap"));
        assert!(share.is_share());
    }
}
