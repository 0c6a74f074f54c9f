//! Talk-room reservation core for a probation office.
//!
//! The UI and the production cloud document store are external; this crate
//! owns the booking semantics (slot normalization, conflict detection,
//! contiguous-run merging), the per-sync-key document partitions with
//! snapshot subscriptions, and the journal-backed local store.

pub mod backup;
pub mod booking;
pub mod calendar;
pub mod compactor;
pub mod journal;
pub mod limits;
pub mod model;
pub mod store;
pub mod sync;
