use chrono::{NaiveDate, Utc};

use crate::backup::Backup;
use crate::calendar;
use crate::model::{CanonicalBooking, MergedRun, Room, TimeOfDay};

use super::BookingService;
use super::availability::occupying_bookings;
use super::conflict::{find_conflict, validate_range};
use super::error::BookingError;
use super::merge::merge_contiguous;

impl BookingService {
    /// Raw occupancy for one room on one day, ad hoc and fixed combined.
    pub fn occupying(&self, room: Room, date: NaiveDate) -> Vec<CanonicalBooking> {
        occupying_bookings(
            room,
            date,
            &self.store().adhoc_snapshot(),
            &self.store().fixed_snapshot(),
        )
    }

    /// Display rows for one room on one day: contiguous same-occupant
    /// bookings collapsed into runs. Holidays render as a closed (empty)
    /// day even when records exist for the date.
    pub fn day_view(&self, room: Room, date: NaiveDate) -> Vec<MergedRun> {
        if calendar::is_holiday(date) {
            return Vec::new();
        }
        merge_contiguous(&self.occupying(room, date))
    }

    /// Would the proposed interval collide with current occupancy? Pass the
    /// key of a booking being edited as `exclude` so it does not collide
    /// with itself.
    pub fn check_conflict(
        &self,
        room: Room,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
        exclude: Option<&str>,
    ) -> Result<bool, BookingError> {
        let range = validate_range(start, end)?;
        Ok(find_conflict(
            room,
            date,
            &range,
            &self.store().adhoc_snapshot(),
            &self.store().fixed_snapshot(),
            exclude,
        )
        .is_some())
    }

    /// Display name for a member id: the trimmed stored name, or the id
    /// itself for unnamed seats and ids not on the roster.
    pub fn member_display_name(&self, id: &str) -> String {
        match self.store().get_member(id) {
            Some(member) if !member.name.trim().is_empty() => member.name.trim().to_string(),
            _ => id.to_string(),
        }
    }

    /// Snapshot the partition as a portable backup.
    pub fn export_backup(&self) -> Backup {
        Backup {
            members: self
                .store()
                .members_snapshot()
                .into_iter()
                .map(|d| d.fields)
                .collect(),
            fixed_schedules: self
                .store()
                .fixed_snapshot()
                .into_iter()
                .map(|d| d.fields)
                .collect(),
            adhoc_bookings: self
                .store()
                .adhoc_snapshot()
                .into_iter()
                .map(|d| d.fields)
                .collect(),
            sync_key: self.store().sync_key().to_string(),
            export_at: Utc::now().to_rfc3339(),
        }
    }
}
