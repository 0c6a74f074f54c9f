mod availability;
mod conflict;
mod error;
mod merge;
mod mutations;
mod normalize;
mod queries;
#[cfg(test)]
mod tests;

pub use availability::occupying_bookings;
pub use conflict::{find_conflict, has_conflict, validate_range};
pub use error::BookingError;
pub use merge::{merge_contiguous, merge_runs};
pub use normalize::normalize_slot;

use std::sync::Arc;

use crate::store::Partition;

/// Booking operations over one sync partition.
///
/// All validation is advisory, not transactional: the store is last-write-
/// wins, so two writers racing past the conflict check both land. The check
/// exists to stop the common case, not to serialize the office.
pub struct BookingService {
    store: Arc<Partition>,
}

impl BookingService {
    pub fn new(store: Arc<Partition>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Partition> {
        &self.store
    }
}
