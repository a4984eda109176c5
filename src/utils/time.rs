//! Time helpers for event ingestion

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

/// Split an ingestion timestamp into its date and time-of-day parts
///
/// Sub-second precision is dropped: persisted events carry whole-second
/// times and sort on them.
pub fn split_timestamp(ts: NaiveDateTime) -> (NaiveDate, NaiveTime) {
    let time = ts.time().with_nanosecond(0).unwrap_or_else(|| ts.time());
    (ts.date(), time)
}

/// Weekday label for a date, one of seven fixed values
pub fn weekday_label(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
