// Session driver: wires the loader, edit session, change propagator,
// save scheduler, and presence tracker onto one cooperative event loop.
//
// The loop is the sole owner of all mutable state (pending draft,
// document identity, socket). A store flush runs as a raced future on
// the same loop, so inbound frames and local edits keep flowing while a
// create or update is in flight; edits landing mid-flight coalesce into
// the scheduler's queued slot. No locks, and "at most one flush in
// flight" holds by construction.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::future::OptionFuture;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use url::Url;

use cowrite_common::types::{ClientId, NoteDraft, NoteId, SessionAccess};

use crate::error::{LoadFailure, SaveFailure, StoreError};
use crate::load::{load_note, LoadedNote};
use crate::presence::PresenceTracker;
use crate::propagate::{ChangePropagator, Inbound};
use crate::save::{CoalesceConfig, PersistenceScheduler};
use crate::session::{EditSession, SocketTransport};
use crate::store::DocumentStore;
use crate::surface::{EditorSurface, LocalEvent};

/// Timer fallback when no flush is armed; the branch is disabled then,
/// the value just has to exist.
const IDLE_TICK: Duration = Duration::from_secs(3600);

/// In-flight store flush, boxed so it can live across loop iterations
/// while borrowing the store.
type FlushFuture<'a> = Pin<Box<dyn Future<Output = FlushOutcome> + Send + 'a>>;

enum FlushOutcome {
    Created(Result<u64, StoreError>),
    Updated(u64, Result<(), StoreError>),
}

/// Issue the store call for a due draft: create for a new note, update
/// for an assigned one. The caller settles the outcome when it resolves.
fn start_flush<'a, S: DocumentStore + Sync>(
    store: &'a S,
    id: NoteId,
    draft: NoteDraft,
) -> FlushFuture<'a> {
    Box::pin(async move {
        match id {
            NoteId::New => FlushOutcome::Created(store.create(&draft).await),
            NoteId::Assigned(note_id) => {
                FlushOutcome::Updated(note_id, store.update(note_id, &draft).await)
            }
        }
    })
}

/// Tracks the document identity across the new -> assigned transition.
///
/// Adoption happens at most once: after the first successful create the
/// identity is pinned and every later flush is an update against it.
#[derive(Debug)]
struct DocumentIdentity {
    id: NoteId,
}

impl DocumentIdentity {
    fn new(id: NoteId) -> Self {
        Self { id }
    }

    fn current(&self) -> NoteId {
        self.id
    }

    /// Adopt the server-assigned id. Returns `false` (and changes
    /// nothing) if an id was already assigned.
    fn adopt(&mut self, assigned: u64) -> bool {
        match self.id {
            NoteId::New => {
                self.id = NoteId::Assigned(assigned);
                true
            }
            NoteId::Assigned(_) => false,
        }
    }
}

/// Connection endpoints and tuning for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Relay base URL, e.g. `wss://relay.example/ws/`.
    pub ws_url: Url,
    pub access: SessionAccess,
    pub coalesce: CoalesceConfig,
}

/// Cloneable handle for feeding local events into a running engine and
/// observing it from the outside.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    local_tx: mpsc::UnboundedSender<LocalEvent>,
    shutdown_tx: broadcast::Sender<()>,
    presence_rx: watch::Receiver<u32>,
    client_id: ClientId,
}

impl EngineHandle {
    /// Feed a user-originated event into the engine. Events emitted after
    /// shutdown are silently dropped.
    pub fn emit(&self, event: LocalEvent) {
        let _ = self.local_tx.send(event);
    }

    /// Ask the engine to stop. Idempotent; safe after the engine exited.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Subscribe to presence count updates.
    pub fn presence(&self) -> watch::Receiver<u32> {
        self.presence_rx.clone()
    }

    /// This session's origin identity.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }
}

/// Drives one note's collaborative session end to end.
pub struct CollabEngine<S, T, E>
where
    S: DocumentStore + Sync,
    T: SocketTransport,
    E: EditorSurface,
{
    store: S,
    surface: E,
    session: EditSession<T>,
    propagator: ChangePropagator,
    scheduler: PersistenceScheduler,
    presence: PresenceTracker,
    identity: DocumentIdentity,
    draft: NoteDraft,
    initial: LoadedNote,
    ws_url: Url,
    access: SessionAccess,
    local_rx: mpsc::UnboundedReceiver<LocalEvent>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<S, T, E> CollabEngine<S, T, E>
where
    S: DocumentStore + Sync,
    T: SocketTransport,
    E: EditorSurface,
{
    /// Load the snapshot, open the relay channel for an assigned id, and
    /// return the engine plus its handle.
    ///
    /// A load failure aborts the whole start: without a confirmed
    /// snapshot the editing surface must stay hidden and no socket is
    /// opened. A socket failure does not: editing degrades to local-only
    /// and saves keep working.
    pub async fn start(
        store: S,
        transport: T,
        surface: E,
        id: NoteId,
        options: EngineOptions,
    ) -> Result<(Self, EngineHandle), LoadFailure> {
        let initial = load_note(&store, id).await?;

        let client_id = ClientId::generate();
        let (local_tx, local_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
        let presence = PresenceTracker::new();

        let handle = EngineHandle {
            local_tx,
            shutdown_tx,
            presence_rx: presence.watch(),
            client_id,
        };

        let mut engine = Self {
            store,
            surface,
            session: EditSession::new(transport),
            propagator: ChangePropagator::new(client_id),
            scheduler: PersistenceScheduler::new(options.coalesce),
            presence,
            identity: DocumentIdentity::new(initial.id),
            draft: initial.draft(),
            initial,
            ws_url: options.ws_url,
            access: options.access,
            local_rx,
            shutdown_rx,
        };

        // A brand-new note has no relay channel until the first save
        // assigns an id; connect failures degrade to local-only editing.
        if let Some(note_id) = engine.identity.current().assigned() {
            let _ = engine.session.open(&engine.ws_url, note_id, &engine.access).await;
        }

        Ok((engine, handle))
    }

    /// The snapshot the editing surface should be initialized with.
    pub fn initial_snapshot(&self) -> &LoadedNote {
        &self.initial
    }

    /// Current document identity (`New` until the first create succeeds).
    pub fn note_id(&self) -> NoteId {
        self.identity.current()
    }

    /// Run until shutdown is requested or every handle is dropped. Closes
    /// the socket on the way out; a pending unflushed draft (or an
    /// in-flight store call) is dropped, matching close-during-save
    /// semantics.
    pub async fn run(self) {
        let Self {
            store,
            mut surface,
            mut session,
            propagator,
            mut scheduler,
            presence,
            mut identity,
            mut draft,
            initial: _,
            ws_url,
            access,
            mut local_rx,
            mut shutdown_rx,
        } = self;

        let mut in_flight: Option<FlushFuture<'_>> = None;

        loop {
            let deadline = scheduler.next_deadline();
            let timer = sleep_until(deadline.unwrap_or_else(|| Instant::now() + IDLE_TICK));
            let socket_open = session.is_open();

            tokio::select! {
                maybe_event = local_rx.recv() => match maybe_event {
                    Some(event) => {
                        match event {
                            LocalEvent::Edit { delta, body } => {
                                draft.body = body;
                                let frame = propagator.outbound(delta);
                                session.send_change(&frame).await;
                            }
                            LocalEvent::TitleChanged(title) => draft.title = title,
                            LocalEvent::CategoryChanged(category_id) => {
                                draft.category_id = category_id;
                            }
                        }
                        scheduler.notify(draft.clone());
                    }
                    None => break,
                },
                frame = session.next_frame(), if socket_open => {
                    match frame {
                        Some(frame) => match propagator.classify(frame) {
                            Inbound::Apply(delta) => {
                                surface.apply_remote(&delta);
                                // Keep the save payload tracking what the
                                // surface shows: a later metadata flush
                                // must not roll back foreign edits.
                                draft.body = surface.body();
                            }
                            Inbound::Presence(count) => presence.set_count(count),
                            Inbound::Echo => debug!("discarding own echoed frame"),
                            Inbound::Ignored => debug!("ignoring unknown relay frame"),
                        },
                        // Relay gone; keep editing locally, saves continue.
                        None => debug!("relay channel closed; continuing local-only"),
                    }
                },
                _ = timer, if deadline.is_some() => {
                    if let Some(due) = scheduler.take_due() {
                        in_flight = Some(start_flush(&store, identity.current(), due));
                    }
                },
                Some(outcome) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    match outcome {
                        FlushOutcome::Created(Ok(assigned)) => {
                            if identity.adopt(assigned) {
                                info!(note_id = assigned, "note created, adopted assigned id");
                                // Identity is pinned before the channel
                                // opens, so a second create can never be
                                // issued.
                                let _ = session.open(&ws_url, assigned, &access).await;
                            }
                        }
                        FlushOutcome::Created(Err(error)) => {
                            let error = SaveFailure::Create(error);
                            warn!(%error, "save failed; next edit re-arms the flush");
                        }
                        FlushOutcome::Updated(_, Ok(())) => {}
                        FlushOutcome::Updated(note_id, Err(error)) => {
                            let error = SaveFailure::Update(error);
                            warn!(%error, note_id, "save failed; next edit re-arms the flush");
                        }
                    }
                    scheduler.finish_flush();
                },
                _ = shutdown_rx.recv() => break,
            }
        }
        info!(note_id = %identity.current(), "engine stopping");
        session.close().await;
    }
}
