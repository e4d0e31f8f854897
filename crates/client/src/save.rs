// Save scheduler: coalesces bursts of local edits into bounded-rate
// flushes against the document store.
//
// State machine:
//   Idle     -> Armed { pending, deadline }   on notify
//   Armed    -> Flushing                      via take_due() past the deadline
//   Flushing -> Armed | Idle                  on finish_flush
//
// There is a single PendingSave slot, overwritten by every notify (last
// write wins), and at most one flush in flight. A notify that lands while
// a flush is in flight coalesces into the next cycle.
//
// Time is injected (`*_at` methods take an `Instant`) so the coalescing
// and one-in-flight guarantees are testable without a real clock. The
// instants are tokio's so the engine timer and the deadlines share one
// clock under `tokio::time::pause`.

use std::time::Duration;

use tokio::time::Instant;

use cowrite_common::types::NoteDraft;

/// Default coalescing window.
const DEFAULT_COALESCE_MS: u64 = 1_000;
/// Minimum allowed window.
const MIN_COALESCE_MS: u64 = 250;
/// Maximum allowed window.
const MAX_COALESCE_MS: u64 = 10_000;

/// Configuration for the coalescing window.
#[derive(Debug, Clone)]
pub struct CoalesceConfig {
    pub window: Duration,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self { window: Duration::from_millis(DEFAULT_COALESCE_MS) }
    }
}

impl CoalesceConfig {
    /// Create a config with the given window in milliseconds, clamped to
    /// [250, 10000].
    pub fn with_millis(ms: u64) -> Self {
        let clamped = ms.clamp(MIN_COALESCE_MS, MAX_COALESCE_MS);
        Self { window: Duration::from_millis(clamped) }
    }
}

#[derive(Debug)]
enum SchedulerState {
    Idle,
    Armed { pending: NoteDraft, deadline: Instant },
    Flushing { queued: Option<NoteDraft> },
}

/// Coalesces full-document save states and hands out at most one flush at
/// a time.
#[derive(Debug)]
pub struct PersistenceScheduler {
    window: Duration,
    state: SchedulerState,
}

impl PersistenceScheduler {
    pub fn new(config: CoalesceConfig) -> Self {
        Self { window: config.window, state: SchedulerState::Idle }
    }

    /// Replace the pending save with `draft` and restart the quiescence
    /// timer. While a flush is in flight the draft is queued for the next
    /// cycle instead.
    pub fn notify(&mut self, draft: NoteDraft) {
        self.notify_at(draft, Instant::now());
    }

    /// Like `notify` but with a specific timestamp (for testing).
    pub fn notify_at(&mut self, draft: NoteDraft, now: Instant) {
        match &mut self.state {
            SchedulerState::Flushing { queued } => *queued = Some(draft),
            _ => {
                self.state =
                    SchedulerState::Armed { pending: draft, deadline: now + self.window };
            }
        }
    }

    /// If the quiescence window has elapsed, move to `Flushing` and yield
    /// the coalesced draft. Returns `None` while idle, still within the
    /// window, or already flushing.
    pub fn take_due(&mut self) -> Option<NoteDraft> {
        self.take_due_at(Instant::now())
    }

    /// Like `take_due` but with a specific timestamp (for testing).
    pub fn take_due_at(&mut self, now: Instant) -> Option<NoteDraft> {
        match &self.state {
            SchedulerState::Armed { deadline, .. } if now >= *deadline => {
                let prior = std::mem::replace(
                    &mut self.state,
                    SchedulerState::Flushing { queued: None },
                );
                match prior {
                    SchedulerState::Armed { pending, .. } => Some(pending),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Mark the in-flight flush complete. If an edit coalesced during the
    /// flight, its draft is re-armed for a fresh window; otherwise the
    /// scheduler returns to idle.
    pub fn finish_flush(&mut self) {
        self.finish_flush_at(Instant::now());
    }

    /// Like `finish_flush` but with a specific timestamp (for testing).
    pub fn finish_flush_at(&mut self, now: Instant) {
        if let SchedulerState::Flushing { queued } = &mut self.state {
            self.state = match queued.take() {
                Some(pending) => {
                    SchedulerState::Armed { pending, deadline: now + self.window }
                }
                None => SchedulerState::Idle,
            };
        }
    }

    /// Deadline of the armed save, if any. Drives the engine's timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            SchedulerState::Armed { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    pub fn is_flushing(&self) -> bool {
        matches!(self.state, SchedulerState::Flushing { .. })
    }

    /// Whether any state is waiting to be persisted (armed or queued
    /// behind an in-flight flush).
    pub fn has_pending(&self) -> bool {
        match &self.state {
            SchedulerState::Armed { .. } => true,
            SchedulerState::Flushing { queued } => queued.is_some(),
            SchedulerState::Idle => false,
        }
    }
}
