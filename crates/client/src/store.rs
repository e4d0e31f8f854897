// Document store client: the REST surface this engine consumes.
//
//   GET  /documents/{id}   (+ ?token= in share mode)  -> NoteSnapshot
//   POST /documents/       (bearer only)              -> { id, ... }
//   PUT  /documents/{id}   (+ ?token= in share mode)  -> no content required
//
// The store applies the last write it receives; it has no merge logic.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use cowrite_common::types::{NoteDraft, NoteSnapshot, SessionAccess};

use crate::error::StoreError;

/// Per-request deadline. A hung store call must never be able to wedge a
/// flush indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction over the document store for testability.
///
/// Methods are declared in return-position form with a `Send` bound so a
/// flush can be boxed and raced against other work on the engine loop.
/// Implementations can still use plain `async fn`.
pub trait DocumentStore {
    /// Fetch the persisted snapshot of a note.
    fn fetch(&self, id: u64) -> impl Future<Output = Result<NoteSnapshot, StoreError>> + Send;

    /// Create a new note; the returned id becomes its permanent identity.
    fn create(&self, draft: &NoteDraft) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Overwrite the persisted state of a note (last write wins).
    fn update(
        &self,
        id: u64,
        draft: &NoteDraft,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Save payload: drafts are persisted with the effective title, so an
/// empty title reaches the store as "Untitled".
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveBody<'a> {
    title: &'a str,
    body: &'a str,
    category_id: Option<u64>,
}

impl<'a> SaveBody<'a> {
    fn from_draft(draft: &'a NoteDraft) -> Self {
        Self {
            title: draft.effective_title(),
            body: &draft.body,
            category_id: draft.category_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedNote {
    id: u64,
}

/// reqwest-backed document store.
pub struct HttpDocumentStore {
    http: reqwest::Client,
    base_url: Url,
    access: SessionAccess,
}

impl HttpDocumentStore {
    /// `base_url` should end with a trailing slash (e.g.
    /// `https://api.example.com/`).
    pub fn new(base_url: Url, access: SessionAccess) -> Self {
        Self { http: reqwest::Client::new(), base_url, access }
    }

    fn collection_url(&self) -> Result<Url, StoreError> {
        Ok(self.base_url.join("documents/")?)
    }

    fn document_url(&self, id: u64) -> Result<Url, StoreError> {
        let mut url = self.base_url.join(&format!("documents/{id}"))?;
        if let SessionAccess::ShareToken(token) = &self.access {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    fn prepare(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.timeout(REQUEST_TIMEOUT);
        match &self.access {
            SessionAccess::Bearer(token) => request.bearer_auth(token),
            // Share mode authorizes via the ?token= query parameter.
            SessionAccess::ShareToken(_) => request,
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(StoreError::Decode)
    }
}

impl DocumentStore for HttpDocumentStore {
    async fn fetch(&self, id: u64) -> Result<NoteSnapshot, StoreError> {
        let url = self.document_url(id)?;
        let response = self.prepare(self.http.get(url)).send().await?;
        Self::decode(response).await
    }

    async fn create(&self, draft: &NoteDraft) -> Result<u64, StoreError> {
        if self.access.is_share() {
            return Err(StoreError::ShareTokenCreate);
        }
        let url = self.collection_url()?;
        let response = self
            .prepare(self.http.post(url))
            .json(&SaveBody::from_draft(draft))
            .send()
            .await?;
        let created: CreatedNote = Self::decode(response).await?;
        Ok(created.id)
    }

    async fn update(&self, id: u64, draft: &NoteDraft) -> Result<(), StoreError> {
        let url = self.document_url(id)?;
        let response = self
            .prepare(self.http.put(url))
            .json(&SaveBody::from_draft(draft))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.example.com/").unwrap()
    }

    #[test]
    fn bearer_document_url_has_no_token_parameter() {
        let store = HttpDocumentStore::new(base(), SessionAccess::Bearer("jwt".into()));
        let url = store.document_url(42).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/documents/42");
    }

    #[test]
    fn share_document_url_carries_the_capability_token() {
        let store = HttpDocumentStore::new(base(), SessionAccess::ShareToken("cap-1".into()));
        let url = store.document_url(42).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/documents/42?token=cap-1");
    }

    #[test]
    fn collection_url_targets_the_documents_root() {
        let store = HttpDocumentStore::new(base(), SessionAccess::Bearer("jwt".into()));
        assert_eq!(store.collection_url().unwrap().as_str(), "https://api.example.com/documents/");
    }

    #[tokio::test]
    async fn create_is_refused_in_share_mode() {
        let store = HttpDocumentStore::new(base(), SessionAccess::ShareToken("cap-1".into()));
        let err = store.create(&NoteDraft::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::ShareTokenCreate));
    }

    #[test]
    fn save_body_applies_the_untitled_fallback() {
        let draft = NoteDraft { title: String::new(), body: "b".into(), category_id: Some(2) };
        let json = serde_json::to_value(SaveBody::from_draft(&draft)).unwrap();
        assert_eq!(json["title"], "Untitled");
        assert_eq!(json["body"], "b");
        assert_eq!(json["categoryId"], 2);
    }
}
