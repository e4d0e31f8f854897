// Presence tracking: the relay is the sole source of truth for how many
// sessions are editing a note. The local count is advisory, may be briefly
// stale, and is replaced wholesale on every update — no smoothing, no
// local increment or decrement.

use tokio::sync::watch;

/// Holds the latest relay-pushed editor count and notifies subscribers
/// on change (event-driven propagation, no polling).
#[derive(Debug)]
pub struct PresenceTracker {
    tx: watch::Sender<u32>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Replace the displayed count with the relay's value.
    pub fn set_count(&self, count: u32) {
        self.tx.send_replace(count);
    }

    pub fn count(&self) -> u32 {
        *self.tx.borrow()
    }

    /// Subscribe to count changes.
    pub fn watch(&self) -> watch::Receiver<u32> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_starts_at_zero() {
        assert_eq!(PresenceTracker::new().count(), 0);
    }

    #[test]
    fn set_count_replaces_regardless_of_prior_value() {
        let tracker = PresenceTracker::new();

        tracker.set_count(3);
        assert_eq!(tracker.count(), 3);

        // Lower and equal values replace just the same; the relay decides.
        tracker.set_count(1);
        assert_eq!(tracker.count(), 1);
        tracker.set_count(0);
        assert_eq!(tracker.count(), 0);
    }

    #[tokio::test]
    async fn subscribers_observe_updates() {
        let tracker = PresenceTracker::new();
        let mut rx = tracker.watch();

        tracker.set_count(5);
        rx.changed().await.expect("tracker still alive");
        assert_eq!(*rx.borrow(), 5);
    }
}
