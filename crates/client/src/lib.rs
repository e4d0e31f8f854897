// cowrite-client: collaborative synchronization engine for one rich-text
// note. Owns the per-note real-time channel, echo-filtered change
// propagation, the presence count, and the debounced reconciliation
// between live in-memory edits and the document store.

pub mod config;
pub mod engine;
pub mod error;
pub mod load;
pub mod presence;
pub mod propagate;
pub mod save;
pub mod session;
pub mod store;
pub mod surface;
pub mod transport;
