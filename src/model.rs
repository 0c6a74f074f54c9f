use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Day of week, 0 = Sunday. Matches the holiday calendar convention.
pub type Weekday = u8;

/// Wall-clock minute of day, always rendered as zero-padded `"HH:MM"`.
///
/// Zero-padded string order equals numeric order, so records written by the
/// legacy store (which compared times lexically) sort and compare the same
/// way through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const fn from_hm(hour: u16, minute: u16) -> Self {
        debug_assert!(hour < 24 && minute < 60);
        Self(hour * 60 + minute)
    }

    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    pub const fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeError(String);

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid clock time {:?}, expected \"HH:MM\"", self.0)
    }
}

impl std::error::Error for ParseTimeError {}

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(err)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(err());
        }
        let hour: u16 = h.parse().map_err(|_| err())?;
        let minute: u16 = m.parse().map_err(|_| err())?;
        if hour >= 24 || minute >= 60 {
            return Err(err());
        }
        Ok(Self::from_hm(hour, minute))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-open occupied interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        Self { start, end }
    }

    /// Strict overlap: touching endpoints (`self.end == other.start`) do not
    /// count, so back-to-back bookings are allowed.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.0 - self.start.0
    }
}

/// Legacy half-day slot tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Afternoon,
}

impl Slot {
    /// Fixed boundary pair each tag maps to.
    pub const fn range(self) -> TimeRange {
        match self {
            Slot::Morning => TimeRange {
                start: TimeOfDay::from_hm(8, 0),
                end: TimeOfDay::from_hm(12, 0),
            },
            Slot::Afternoon => TimeRange {
                start: TimeOfDay::from_hm(13, 0),
                end: TimeOfDay::from_hm(17, 0),
            },
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Morning => "morning",
            Slot::Afternoon => "afternoon",
        })
    }
}

/// Hour boundaries the booking form offers (start and end pickers share it).
pub const HOUR_OPTIONS: [TimeOfDay; 10] = [
    TimeOfDay::from_hm(8, 0),
    TimeOfDay::from_hm(9, 0),
    TimeOfDay::from_hm(10, 0),
    TimeOfDay::from_hm(11, 0),
    TimeOfDay::from_hm(12, 0),
    TimeOfDay::from_hm(13, 0),
    TimeOfDay::from_hm(14, 0),
    TimeOfDay::from_hm(15, 0),
    TimeOfDay::from_hm(16, 0),
    TimeOfDay::from_hm(17, 0),
];

/// How a stored booking expresses its time: a coarse slot tag, an explicit
/// hour pair, or both (records written by the hour-granular scheme coexist
/// with older coarse ones). Field names are the persisted contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpec {
    #[serde(rename = "timeSlot", default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeOfDay>,
    #[serde(rename = "endTime", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeOfDay>,
}

impl TimeSpec {
    pub fn explicit(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            slot: None,
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn from_slot(slot: Slot) -> Self {
        Self {
            slot: Some(slot),
            start: None,
            end: None,
        }
    }

    /// The explicit pair, if present and well-formed. Does NOT map slot tags;
    /// run the spec through `booking::normalize_slot` first. `None` means the
    /// record is unusable for interval math.
    pub fn explicit_range(&self) -> Option<TimeRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start < end => Some(TimeRange { start, end }),
            _ => None,
        }
    }

    /// Time portion of the composite document key. Explicit form wins:
    /// `"{start}_{end}"`, else the slot tag name, else `None` (unkeyable).
    pub fn designator(&self) -> Option<String> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(format!("{start}_{end}")),
            _ => self.slot.map(|s| s.to_string()),
        }
    }
}

/// The seven physical rooms. Closed set, configured at deployment.
/// Serialized (and keyed) under the room-name strings the store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Room {
    #[serde(rename = "談話室一")]
    Talk1,
    #[serde(rename = "談話室二")]
    Talk2,
    #[serde(rename = "談話室三")]
    Talk3,
    #[serde(rename = "談話室四")]
    Talk4,
    #[serde(rename = "談話室五")]
    Talk5,
    #[serde(rename = "談話室六")]
    Talk6,
    #[serde(rename = "諮商室")]
    Counseling,
}

impl Room {
    pub const ALL: [Room; 7] = [
        Room::Talk1,
        Room::Talk2,
        Room::Talk3,
        Room::Talk4,
        Room::Talk5,
        Room::Talk6,
        Room::Counseling,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Room::Talk1 => "談話室一",
            Room::Talk2 => "談話室二",
            Room::Talk3 => "談話室三",
            Room::Talk4 => "談話室四",
            Room::Talk5 => "談話室五",
            Room::Talk6 => "談話室六",
            Room::Counseling => "諮商室",
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Roster partition a member id is unique within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    ProbationOfficer,
    Psychologist,
}

/// Roster entry. `name` is free text, possibly empty — display falls back to
/// the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MemberKind,
}

/// Recurring weekly reservation, keyed by `(weekday, room, time designator)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedSchedule {
    pub user_id: String,
    pub weekday: Weekday,
    pub room: Room,
    #[serde(flatten)]
    pub time: TimeSpec,
}

impl FixedSchedule {
    /// Composite document key. At most one fixed schedule exists per key;
    /// writing the same key overwrites the prior occupant.
    pub fn key(&self) -> Option<String> {
        let designator = self.time.designator()?;
        Some(format!("{}_{}_{}", self.weekday, self.room, designator))
    }
}

/// One-off reservation, keyed by `(date, room, time designator)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdhocBooking {
    pub user_id: String,
    pub date: NaiveDate,
    pub room: Room,
    #[serde(flatten)]
    pub time: TimeSpec,
}

impl AdhocBooking {
    /// Composite document key: `"{date}_{room}_{start}_{end}"` for
    /// hour-granular records, `"{date}_{room}_{slot}"` for legacy ones.
    pub fn key(&self) -> Option<String> {
        let designator = self.time.designator()?;
        Some(format!(
            "{}_{}_{}",
            self.date.format("%Y-%m-%d"),
            self.room,
            designator
        ))
    }
}

/// Which collection an occupying booking came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOrigin {
    Fixed,
    Adhoc,
}

/// Derived per-day occupancy record with explicit times. Never persisted;
/// all interval math runs on this form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBooking {
    pub room: Room,
    pub occupant: String,
    pub range: TimeRange,
    pub origin: BookingOrigin,
    pub source_id: String,
}

/// Display range produced by the contiguous-run merger. Carries every source
/// id it absorbed so each underlying document can still be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRun {
    pub room: Room,
    pub occupant: String,
    pub range: TimeRange,
    pub origin: BookingOrigin,
    pub source_ids: Vec<String>,
}

impl MergedRun {
    pub fn from_booking(b: &CanonicalBooking) -> Self {
        Self {
            room: b.room,
            occupant: b.occupant.clone(),
            range: b.range,
            origin: b.origin,
            source_ids: vec![b.source_id.clone()],
        }
    }
}

/// A document paired with its id, as delivered by collection snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doc<T> {
    pub id: String,
    pub fields: T,
}

/// Journal record — flat, no nesting. One variant per document write the
/// store performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocEvent {
    MemberPut {
        id: String,
        name: String,
        kind: MemberKind,
    },
    FixedPut {
        key: String,
        user_id: String,
        weekday: Weekday,
        room: Room,
        slot: Option<Slot>,
        start: Option<TimeOfDay>,
        end: Option<TimeOfDay>,
    },
    FixedDeleted {
        key: String,
    },
    AdhocPut {
        key: String,
        user_id: String,
        date: NaiveDate,
        room: Room,
        slot: Option<Slot>,
        start: Option<TimeOfDay>,
        end: Option<TimeOfDay>,
    },
    AdhocDeleted {
        key: String,
    },
}

impl DocEvent {
    pub fn member_put(member: &Member) -> Self {
        DocEvent::MemberPut {
            id: member.id.clone(),
            name: member.name.clone(),
            kind: member.kind,
        }
    }

    pub fn fixed_put(key: String, rec: &FixedSchedule) -> Self {
        DocEvent::FixedPut {
            key,
            user_id: rec.user_id.clone(),
            weekday: rec.weekday,
            room: rec.room,
            slot: rec.time.slot,
            start: rec.time.start,
            end: rec.time.end,
        }
    }

    pub fn adhoc_put(key: String, rec: &AdhocBooking) -> Self {
        DocEvent::AdhocPut {
            key,
            user_id: rec.user_id.clone(),
            date: rec.date,
            room: rec.room,
            slot: rec.time.slot,
            start: rec.time.start,
            end: rec.time.end,
        }
    }
}
