// Editing surface seam.
//
// The rich-text component is an external collaborator: it renders text,
// emits `LocalEvent`s for user-originated edits, and accepts externally
// supplied deltas through `apply_remote`. The surface must never re-emit
// a remotely applied delta as a local change — that contract, together
// with the client-id echo filter, is what makes echo loops impossible.

use cowrite_common::types::Delta;

/// What the engine needs from the editing surface.
pub trait EditorSurface {
    /// Apply an externally supplied delta to the local buffer without
    /// re-emitting it as a user change.
    fn apply_remote(&mut self, delta: &Delta);

    /// Current full body as the surface renders it. Read after remote
    /// applies so the save payload keeps tracking what the user sees.
    fn body(&self) -> String;
}

/// Events the editing surface (and the surrounding editor chrome) feeds
/// into the engine. Title and category changes also schedule saves, same
/// as body edits.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEvent {
    /// A user edit: the structured operation plus the resulting full body.
    Edit { delta: Delta, body: String },
    TitleChanged(String),
    CategoryChanged(Option<u64>),
}
