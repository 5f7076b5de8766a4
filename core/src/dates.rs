use chrono::{Datelike, Local, NaiveDate};

/// Format a date as `YYYY-MM-DD`.
#[must_use]
pub fn to_date_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Today's local calendar date as `YYYY-MM-DD`.
#[must_use]
pub fn today_iso() -> String {
    to_date_iso(Local::now().date_naive())
}

/// The Sunday that begins `date`'s week. Weeks run Sunday through Saturday.
#[must_use]
pub fn sunday_of_week(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}
