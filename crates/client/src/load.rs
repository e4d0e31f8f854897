// One-shot initial load of the note snapshot and metadata.
//
// This runs before the session goes live: the access mode has already
// been resolved (it shapes both the store calls and the socket URL), and
// a failed load must keep the editing surface hidden.

use cowrite_common::types::{NoteDraft, NoteId};

use crate::error::{LoadFailure, StoreError};
use crate::store::DocumentStore;

/// The snapshot the editing surface is initialized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedNote {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub category_id: Option<u64>,
    pub is_owner: bool,
}

impl LoadedNote {
    /// Initial full-document state for the save scheduler.
    pub fn draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            body: self.body.clone(),
            category_id: self.category_id,
        }
    }
}

/// Load the note identified by `id`.
///
/// The `"new"` sentinel skips the network entirely and yields an empty,
/// owned document. For an assigned id, one fetch is issued; any failure
/// surfaces as `LoadFailure` and the session never starts.
pub async fn load_note<S: DocumentStore>(store: &S, id: NoteId) -> Result<LoadedNote, LoadFailure> {
    match id {
        NoteId::New => Ok(LoadedNote {
            id,
            title: String::new(),
            body: String::new(),
            category_id: None,
            is_owner: true,
        }),
        NoteId::Assigned(raw) => {
            let snapshot = store.fetch(raw).await.map_err(|error| match error {
                StoreError::Status(404) => LoadFailure::NotFound,
                other => LoadFailure::Fetch(other),
            })?;
            Ok(LoadedNote {
                id: NoteId::Assigned(snapshot.id),
                title: snapshot.title,
                body: snapshot.body,
                category_id: snapshot.category_id,
                is_owner: snapshot.is_owner,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use cowrite_common::types::NoteSnapshot;

    use super::*;

    struct StubStore {
        snapshot: Option<NoteSnapshot>,
        status: Option<u16>,
    }

    impl DocumentStore for StubStore {
        async fn fetch(&self, _id: u64) -> Result<NoteSnapshot, StoreError> {
            if let Some(status) = self.status {
                return Err(StoreError::Status(status));
            }
            self.snapshot.clone().ok_or(StoreError::Status(500))
        }

        async fn create(&self, _draft: &NoteDraft) -> Result<u64, StoreError> {
            unreachable!("load never creates")
        }

        async fn update(&self, _id: u64, _draft: &NoteDraft) -> Result<(), StoreError> {
            unreachable!("load never updates")
        }
    }

    #[tokio::test]
    async fn new_note_loads_empty_without_network() {
        let store = StubStore { snapshot: None, status: Some(500) };
        // The stub would fail any fetch; "new" must not fetch at all.
        let loaded = load_note(&store, NoteId::New).await.unwrap();
        assert_eq!(loaded.id, NoteId::New);
        assert!(loaded.title.is_empty());
        assert!(loaded.body.is_empty());
        assert!(loaded.is_owner);
    }

    #[tokio::test]
    async fn existing_note_populates_from_snapshot() {
        let store = StubStore {
            snapshot: Some(NoteSnapshot {
                id: 9,
                title: "Plans".into(),
                body: "<p>soon</p>".into(),
                category_id: Some(4),
                is_owner: false,
            }),
            status: None,
        };
        let loaded = load_note(&store, NoteId::Assigned(9)).await.unwrap();
        assert_eq!(loaded.id, NoteId::Assigned(9));
        assert_eq!(loaded.title, "Plans");
        assert_eq!(loaded.body, "<p>soon</p>");
        assert_eq!(loaded.category_id, Some(4));
        assert!(!loaded.is_owner);
    }

    #[tokio::test]
    async fn missing_note_is_a_load_failure() {
        let store = StubStore { snapshot: None, status: Some(404) };
        let err = load_note(&store, NoteId::Assigned(9)).await.unwrap_err();
        assert!(matches!(err, LoadFailure::NotFound));
    }

    #[tokio::test]
    async fn transport_error_is_a_load_failure() {
        let store = StubStore { snapshot: None, status: Some(503) };
        let err = load_note(&store, NoteId::Assigned(9)).await.unwrap_err();
        assert!(matches!(err, LoadFailure::Fetch(StoreError::Status(503))));
    }

    #[tokio::test]
    async fn loaded_note_seeds_the_initial_draft() {
        let store = StubStore {
            snapshot: Some(NoteSnapshot {
                id: 9,
                title: "Plans".into(),
                body: "<p>soon</p>".into(),
                category_id: None,
                is_owner: true,
            }),
            status: None,
        };
        let loaded = load_note(&store, NoteId::Assigned(9)).await.unwrap();
        let draft = loaded.draft();
        assert_eq!(draft.title, "Plans");
        assert_eq!(draft.body, "<p>soon</p>");
        assert_eq!(draft.category_id, None);
    }
}
