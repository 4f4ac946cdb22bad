//! Calendar boundaries and month/day formatting.
//!
//! Day and month ranges are computed in the time zone of the reference timestamp
//! and returned as inclusive UTC bounds, which is how the store compares dates.
//! A range ends one millisecond before the next range starts, so consecutive
//! days or months never overlap and never leave a gap. Both the monthly overview
//! and the daily admission check go through these functions.

use chrono::{
    DateTime, Datelike, Days, Local, LocalResult, Months, NaiveDate, NaiveTime, TimeDelta,
    TimeZone, Utc,
};
use std::fmt::Display;

/// Longest DST gap we search past when local midnight does not exist.
const MAX_GAP_MINUTES: i64 = 180;

/// Inclusive `[start, end]` bounds of the calendar day containing `reference`.
#[must_use]
pub fn day_bounds<Tz: TimeZone>(reference: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = reference.date_naive();
    let next = day.succ_opt().unwrap_or(NaiveDate::MAX);
    span(&reference.timezone(), day, next)
}

/// Inclusive `[start, end]` bounds of the calendar month containing `reference`.
///
/// `start` is local midnight on the 1st, `end` is 23:59:59.999 on the last day.
#[must_use]
pub fn month_bounds<Tz: TimeZone>(reference: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = first_of_month(reference.date_naive());
    let next = first
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX);
    span(&reference.timezone(), first, next)
}

/// Bounds of the current month in the local time zone.
#[must_use]
pub fn current_month_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    month_bounds(&Local::now())
}

/// Stable, sortable month key (`"2024-12"`).
#[must_use]
pub fn format_month<Tz: TimeZone>(reference: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    reference.format("%Y-%m").to_string()
}

/// Human-readable month label (`"December 2024"`).
#[must_use]
pub fn format_month_label<Tz: TimeZone>(reference: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    reference.format("%B %Y").to_string()
}

/// Display date (`"Dec 25, 2024"`).
#[must_use]
pub fn format_date<Tz: TimeZone>(reference: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    reference.format("%b %d, %Y").to_string()
}

/// Display time of day (`"15:30"`).
#[must_use]
pub fn format_time<Tz: TimeZone>(reference: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    reference.format("%H:%M").to_string()
}

/// Current month key in the local time zone.
#[must_use]
pub fn current_month() -> String {
    format_month(&Local::now())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn span<Tz: TimeZone>(
    tz: &Tz,
    first: NaiveDate,
    next: NaiveDate,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of(tz, first);
    let end = start_of(tz, next) - TimeDelta::milliseconds(1);
    (start, end)
}

/// First instant of `date` in `tz`.
fn start_of<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST transition: the day starts at the first valid local time.
        LocalResult::None => (1..=MAX_GAP_MINUTES)
            .find_map(|minutes| {
                tz.from_local_datetime(&(midnight + TimeDelta::minutes(minutes)))
                    .earliest()
            })
            .map_or_else(
                || Utc.from_utc_datetime(&midnight),
                |dt| dt.with_timezone(&Utc),
            ),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{FixedOffset, Timelike};

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap() + TimeDelta::milliseconds(ms.into())
    }

    #[test]
    fn test_day_bounds_utc() {
        let (start, end) = day_bounds(&utc(2024, 12, 25, 15, 30, 45, 0));
        assert_eq!(start, utc(2024, 12, 25, 0, 0, 0, 0));
        assert_eq!(end, utc(2024, 12, 25, 23, 59, 59, 999));
        assert_eq!(end.nanosecond(), 999_000_000);
    }

    #[test]
    fn test_month_bounds_leap_february() {
        let (start, end) = month_bounds(&utc(2024, 2, 15, 12, 0, 0, 0));
        assert_eq!(start, utc(2024, 2, 1, 0, 0, 0, 0));
        assert_eq!(end, utc(2024, 2, 29, 23, 59, 59, 999));

        let (_, end) = month_bounds(&utc(2023, 2, 15, 12, 0, 0, 0));
        assert_eq!(end, utc(2023, 2, 28, 23, 59, 59, 999));
    }

    #[test]
    fn test_month_bounds_december_rolls_into_next_year() {
        let (start, end) = month_bounds(&utc(2024, 12, 31, 23, 59, 59, 999));
        assert_eq!(start, utc(2024, 12, 1, 0, 0, 0, 0));
        assert_eq!(end, utc(2024, 12, 31, 23, 59, 59, 999));
    }

    #[test]
    fn test_consecutive_months_are_contiguous() {
        let (_, november_end) = month_bounds(&utc(2024, 11, 10, 0, 0, 0, 0));
        let (december_start, _) = month_bounds(&utc(2024, 12, 10, 0, 0, 0, 0));
        assert_eq!(december_start - november_end, TimeDelta::milliseconds(1));
    }

    #[test]
    fn test_bounds_follow_reference_time_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 2024-03-01 01:00 local is still February in UTC.
        let reference = tz.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();

        let (start, end) = month_bounds(&reference);
        assert_eq!(start, utc(2024, 2, 29, 22, 0, 0, 0));
        assert_eq!(end, utc(2024, 3, 31, 21, 59, 59, 999));

        let (day_start, day_end) = day_bounds(&reference);
        assert_eq!(day_start, utc(2024, 2, 29, 22, 0, 0, 0));
        assert_eq!(day_end, utc(2024, 3, 1, 21, 59, 59, 999));
    }

    #[test]
    fn test_format_helpers() {
        let reference = utc(2024, 12, 25, 15, 30, 45, 0);
        assert_eq!(format_month(&reference), "2024-12");
        assert_eq!(format_month_label(&reference), "December 2024");
        assert_eq!(format_date(&reference), "Dec 25, 2024");
        assert_eq!(format_time(&reference), "15:30");
    }

    #[test]
    fn test_current_month_key_shape() {
        let month = current_month();
        assert_eq!(month.len(), 7);
        assert_eq!(month.as_bytes()[4], b'-');
    }
}
