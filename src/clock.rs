use time::{Date, OffsetDateTime};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Calendar month arithmetic; the day is clamped to the target month's length
/// (Aug 31 + 6 months = Feb 28/29).
pub fn add_months(date: Date, months: u8) -> Date {
    let zero_based = date.month() as i32 - 1 + months as i32;
    let year = date.year() + zero_based / 12;
    let month = time::Month::January.nth_next((zero_based % 12) as u8);
    let day = date.day().min(month.length(year));
    Date::from_calendar_date(year, month, day).unwrap_or(date)
}
