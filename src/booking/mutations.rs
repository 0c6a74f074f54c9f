use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::backup::Backup;
use crate::calendar;
use crate::limits;
use crate::model::{AdhocBooking, DocEvent, FixedSchedule, Member, MemberKind, Room, TimeOfDay, TimeSpec};

use super::BookingService;
use super::conflict::{find_conflict, validate_range};
use super::error::BookingError;

/// Probation officer seats on the office roster.
const OFFICER_SEATS: u32 = 19;
/// Psychologist seats on the office roster.
const PSYCHOLOGIST_SEATS: u32 = 20;

impl BookingService {
    /// Populate the standard roster (PO01..PO19, PS01..PS20) when the member
    /// collection is empty. Names start blank; display falls back to the id
    /// until someone fills one in. Returns whether seeding happened.
    pub async fn seed_roster_if_empty(&self) -> Result<bool, BookingError> {
        if self.store().member_count() > 0 {
            return Ok(false);
        }

        let mut events = Vec::new();
        for i in 1..=OFFICER_SEATS {
            events.push(DocEvent::member_put(&Member {
                id: format!("PO{i:02}"),
                name: String::new(),
                kind: MemberKind::ProbationOfficer,
            }));
        }
        for i in 1..=PSYCHOLOGIST_SEATS {
            events.push(DocEvent::member_put(&Member {
                id: format!("PS{i:02}"),
                name: String::new(),
                kind: MemberKind::Psychologist,
            }));
        }
        let count = events.len();
        self.store().apply_batch(events).await?;
        info!(members = count, "seeded roster");
        Ok(true)
    }

    /// Set a member's display name, truncated to the display limit. Counting
    /// is in characters, not bytes — the names are CJK.
    pub async fn set_member_name(&self, id: &str, name: &str) -> Result<(), BookingError> {
        let mut member = self
            .store()
            .get_member(id)
            .ok_or_else(|| BookingError::UnknownMember(id.to_string()))?;
        member.name = name.chars().take(limits::MAX_DISPLAY_NAME_LEN).collect();
        self.store().put_member(&member).await
    }

    /// Upsert a weekly fixed schedule. The key is derived from weekday, room
    /// and time designator, so writing the same combination replaces the
    /// previous holder rather than stacking a duplicate. Fixed schedules are
    /// entered by the office admin and skip the conflict check.
    pub async fn set_fixed_schedule(&self, rec: FixedSchedule) -> Result<String, BookingError> {
        if rec.weekday > 6 {
            return Err(BookingError::InvalidWeekday(rec.weekday));
        }
        if self.store().get_member(&rec.user_id).is_none() {
            return Err(BookingError::UnknownMember(rec.user_id));
        }
        let key = rec.key().ok_or(BookingError::Unschedulable)?;
        self.store().put_fixed(key.clone(), &rec).await?;
        debug!(key = %key, user = %rec.user_id, "fixed schedule set");
        Ok(key)
    }

    pub async fn remove_fixed_schedule(&self, key: &str) -> Result<(), BookingError> {
        self.store().delete_fixed(key).await?;
        debug!(key = %key, "fixed schedule removed");
        Ok(())
    }

    /// Book a room for one member on one day at hour granularity. Validation
    /// order: range shape, operating year, holiday, member, then the conflict
    /// scan against both ad hoc and fixed occupancy. Returns the new
    /// document key.
    pub async fn book_adhoc(
        &self,
        user_id: &str,
        date: NaiveDate,
        room: Room,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<String, BookingError> {
        let range = validate_range(start, end)?;
        if date.year() != calendar::OPERATING_YEAR {
            return Err(BookingError::OutsideOperatingYear(date.year()));
        }
        if calendar::is_holiday(date) {
            return Err(BookingError::Holiday(date));
        }
        if self.store().get_member(user_id).is_none() {
            return Err(BookingError::UnknownMember(user_id.to_string()));
        }

        let adhocs = self.store().adhoc_snapshot();
        let fixed = self.store().fixed_snapshot();
        if let Some(existing) = find_conflict(room, date, &range, &adhocs, &fixed, None) {
            return Err(BookingError::Conflict(existing));
        }

        let rec = AdhocBooking {
            user_id: user_id.to_string(),
            date,
            room,
            time: TimeSpec::explicit(start, end),
        };
        let key = rec.key().ok_or(BookingError::Unschedulable)?;
        self.store().put_adhoc(key.clone(), &rec).await?;
        info!(key = %key, user = %user_id, "booked");
        Ok(key)
    }

    pub async fn cancel_adhoc(&self, key: &str) -> Result<(), BookingError> {
        self.store().delete_adhoc(key).await?;
        info!(key = %key, "cancelled");
        Ok(())
    }

    /// Load a backup into the partition, recomputing every document key from
    /// the record fields. Records that cannot produce a key (no times, no
    /// slot tag) are skipped with a warning rather than failing the whole
    /// import. Returns the number of documents written.
    pub async fn import_backup(&self, backup: &Backup) -> Result<usize, BookingError> {
        let mut events = Vec::new();
        for member in &backup.members {
            events.push(DocEvent::member_put(member));
        }
        for rec in &backup.fixed_schedules {
            match rec.key() {
                Some(key) => events.push(DocEvent::fixed_put(key, rec)),
                None => warn!(user = %rec.user_id, "skipping unkeyable fixed schedule"),
            }
        }
        for rec in &backup.adhoc_bookings {
            match rec.key() {
                Some(key) => events.push(DocEvent::adhoc_put(key, rec)),
                None => warn!(user = %rec.user_id, date = %rec.date, "skipping unkeyable booking"),
            }
        }

        if events.len() > limits::MAX_BATCH_EVENTS {
            return Err(BookingError::LimitExceeded("backup exceeds batch event limit"));
        }
        let count = events.len();
        self.store().apply_batch(events).await?;
        info!(documents = count, "backup imported");
        Ok(count)
    }
}
