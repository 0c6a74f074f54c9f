use chrono::NaiveDate;

use crate::model::TimeOfDay;

#[derive(Debug)]
pub enum BookingError {
    /// Proposed start is not strictly before the proposed end.
    InvalidRange { start: TimeOfDay, end: TimeOfDay },
    /// Overlaps an existing occupying booking; payload is its document key.
    Conflict(String),
    /// Holidays are not selectable for new ad hoc bookings.
    Holiday(NaiveDate),
    OutsideOperatingYear(i32),
    UnknownMember(String),
    NotFound(String),
    InvalidWeekday(u8),
    /// Record carries neither explicit times nor a recognized slot tag.
    Unschedulable,
    LimitExceeded(&'static str),
    JournalError(String),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::InvalidRange { start, end } => {
                write!(f, "invalid time range: {start} must be before {end}")
            }
            BookingError::Conflict(key) => write!(f, "conflicts with booking: {key}"),
            BookingError::Holiday(date) => write!(f, "{date} is a holiday, not bookable"),
            BookingError::OutsideOperatingYear(year) => {
                write!(f, "date outside operating year: {year}")
            }
            BookingError::UnknownMember(id) => write!(f, "unknown member: {id}"),
            BookingError::NotFound(key) => write!(f, "not found: {key}"),
            BookingError::InvalidWeekday(n) => write!(f, "invalid weekday: {n}"),
            BookingError::Unschedulable => {
                write!(f, "record has neither explicit times nor a slot tag")
            }
            BookingError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            BookingError::JournalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}
