use chrono::NaiveDate;

use crate::calendar;
use crate::model::{AdhocBooking, BookingOrigin, CanonicalBooking, Doc, FixedSchedule, Room};

use super::normalize::normalize_slot;

/// All occupying bookings for one room on one calendar day, in canonical
/// explicit-range form.
///
/// Ad hoc records match by exact date, fixed schedules by weekday of the
/// date (0 = Sunday, same convention as the holiday calendar). Both sources
/// contribute; a fixed and an ad hoc entry may coexist in the result even
/// when they overlap each other — arbitration happens only when a NEW ad hoc
/// booking is proposed. Records that remain unnormalizable are dropped here:
/// they cannot participate in interval math.
pub fn occupying_bookings(
    room: Room,
    date: NaiveDate,
    adhocs: &[Doc<AdhocBooking>],
    fixed: &[Doc<FixedSchedule>],
) -> Vec<CanonicalBooking> {
    let dow = calendar::weekday_of(date);
    let mut out = Vec::new();

    for doc in adhocs {
        if doc.fields.date != date || doc.fields.room != room {
            continue;
        }
        if let Some(range) = normalize_slot(&doc.fields.time).explicit_range() {
            out.push(CanonicalBooking {
                room,
                occupant: doc.fields.user_id.clone(),
                range,
                origin: BookingOrigin::Adhoc,
                source_id: doc.id.clone(),
            });
        }
    }

    for doc in fixed {
        if doc.fields.weekday != dow || doc.fields.room != room {
            continue;
        }
        if let Some(range) = normalize_slot(&doc.fields.time).explicit_range() {
            out.push(CanonicalBooking {
                room,
                occupant: doc.fields.user_id.clone(),
                range,
                origin: BookingOrigin::Fixed,
                source_id: doc.id.clone(),
            });
        }
    }

    out
}
