use chrono::{Datelike, NaiveDate};

use crate::model::Weekday;

/// The deployment covers a single scheduling year.
pub const OPERATING_YEAR: i32 = 2026;

/// 2026 public holidays, as (month, day).
const HOLIDAYS_2026: &[(u32, u32)] = &[
    (1, 1),   // New Year's Day
    (2, 16),  // Lunar New Year's Eve
    (2, 17),  // Lunar New Year
    (2, 18),  // Lunar New Year
    (2, 19),  // Lunar New Year
    (2, 20),  // adjusted day off
    (2, 27),  // Peace Memorial Day (observed)
    (4, 3),   // Children's Day / Tomb-Sweeping (observed)
    (4, 6),   // Children's Day / Tomb-Sweeping (observed)
    (5, 1),   // Labour Day
    (6, 19),  // Dragon Boat Festival
    (9, 25),  // Mid-Autumn Festival
    (10, 9),  // National Day (observed)
];

/// Day of week with 0 = Sunday, the same convention the fixed-schedule
/// records use.
pub fn weekday_of(date: NaiveDate) -> Weekday {
    date.weekday().num_days_from_sunday() as Weekday
}

/// Weekends and listed public holidays. Holiday days display no bookings and
/// reject new ad hoc reservations.
pub fn is_holiday(date: NaiveDate) -> bool {
    let dow = weekday_of(date);
    if dow == 0 || dow == 6 {
        return true;
    }
    date.year() == OPERATING_YEAR && HOLIDAYS_2026.contains(&(date.month(), date.day()))
}

/// A date within the operating year, or `None` for out-of-range input.
pub fn date(month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(OPERATING_YEAR, month, day)
}

pub fn days_in_month(month: u32) -> u32 {
    let first = match date(month, 1) {
        Some(d) => d,
        None => return 0,
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(OPERATING_YEAR + 1, 1, 1)
    } else {
        date(month + 1, 1)
    };
    match next {
        Some(n) => n.signed_duration_since(first).num_days() as u32,
        None => 0,
    }
}
