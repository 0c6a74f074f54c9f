use chrono::NaiveDate;

use crate::model::{AdhocBooking, Doc, FixedSchedule, Room, TimeOfDay, TimeRange};

use super::availability::occupying_bookings;
use super::error::BookingError;

/// Reject a proposed interval with start >= end before any conflict test.
/// Never silently corrected.
pub fn validate_range(start: TimeOfDay, end: TimeOfDay) -> Result<TimeRange, BookingError> {
    if start >= end {
        return Err(BookingError::InvalidRange { start, end });
    }
    Ok(TimeRange::new(start, end))
}

/// Document key of the first existing booking the candidate overlaps, if
/// any. A booking whose key equals `exclude` is skipped (the edit-in-place
/// case).
pub fn find_conflict(
    room: Room,
    date: NaiveDate,
    range: &TimeRange,
    adhocs: &[Doc<AdhocBooking>],
    fixed: &[Doc<FixedSchedule>],
    exclude: Option<&str>,
) -> Option<String> {
    occupying_bookings(room, date, adhocs, fixed)
        .into_iter()
        .find(|b| exclude != Some(b.source_id.as_str()) && b.range.overlaps(range))
        .map(|b| b.source_id)
}

/// Existence check over the availability index using the strict overlap
/// predicate.
pub fn has_conflict(
    room: Room,
    date: NaiveDate,
    range: &TimeRange,
    adhocs: &[Doc<AdhocBooking>],
    fixed: &[Doc<FixedSchedule>],
    exclude: Option<&str>,
) -> bool {
    find_conflict(room, date, range, adhocs, fixed, exclude).is_some()
}
