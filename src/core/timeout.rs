//! Timeout expression resolution.
//!
//! Accepts three forms, tried in order: an absolute date or date-time,
//! a bare `HH:MM` clock time on the current day, and a relative
//! duration such as `90s`, `5m` or `2h` (a bare number means seconds).

use std::time::Duration;

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::error::AlarmError;

/// A validated, strictly positive delay until the alarm first fires.
pub type ResolvedTimeout = Duration;

lazy_static! {
    // Pattern: "7:30", "07:30", "23:59". Hours 24-29 slip through the
    // pattern and are rejected when the time itself is built.
    static ref CLOCK_TIME: Regex =
        Regex::new(r"^([0-2]?[0-9]):([0-5][0-9])$").expect("Invalid clock time regex");
}

/// Date-time layouts accepted for absolute timeouts, beyond RFC 3339
/// and RFC 2822. All are interpreted in the local timezone.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y.%m.%d %H:%M:%S",
];

/// Date-only layouts. A bare date means local midnight, so a date that
/// is "today" resolves to a moment already in the past and is rejected
/// by the positivity check rather than rolling forward.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Resolve a raw timeout expression against `now` into the delay until
/// the alarm should first fire.
///
/// The three grammars are tried in strict order: absolute date/time,
/// `HH:MM` on the current calendar date, relative duration. Whatever
/// matches must land strictly in the future; otherwise the computed
/// millisecond delta is reported back in the error.
pub fn resolve(raw: &str, now: DateTime<Local>) -> Result<ResolvedTimeout, AlarmError> {
    let raw = raw.trim();

    if let Some(mapped) = parse_datetime(raw) {
        // Wall times duplicated by a DST fold take the earliest instant;
        // wall times skipped by a DST jump map to nothing.
        let target = mapped.earliest().ok_or_else(|| invalid(raw))?;
        return until(raw, now, target);
    }

    if let Some(caps) = CLOCK_TIME.captures(raw) {
        let target = clock_time_today(&caps, now).ok_or_else(|| invalid(raw))?;
        return until(raw, now, target);
    }

    let ms = parse_relative(raw)?;
    to_timeout(raw, ms)
}

fn invalid(raw: &str) -> AlarmError {
    AlarmError::InvalidTimeout {
        raw: raw.to_string(),
    }
}

/// Try the absolute date/time grammars. `None` means the input is not
/// date-shaped at all and the next grammar should be tried.
fn parse_datetime(raw: &str) -> Option<LocalResult<DateTime<Local>>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(LocalResult::Single(dt.with_timezone(&Local)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(LocalResult::Single(dt.with_timezone(&Local)));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Local.from_local_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(Local.from_local_datetime(&date.and_time(NaiveTime::MIN)));
        }
    }
    None
}

/// Place an `HH:MM` wall time on today's date. A time already behind
/// `now` stays on today and fails the positivity check downstream; it
/// never rolls over to tomorrow.
fn clock_time_today(caps: &Captures<'_>, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let hour = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2)?.as_str().parse().ok()?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Local.from_local_datetime(&now.date_naive().and_time(time)).earliest()
}

/// Parse a relative duration into milliseconds.
///
/// The value is the leading run of ASCII digits; the final character
/// selects the unit (`m` minutes, `h` hours, anything else seconds).
/// Compound forms like `1h30m` are not a grammar of their own: the
/// leading digits and the final character are all that is read.
fn parse_relative(raw: &str) -> Result<i64, AlarmError> {
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(invalid(raw));
    }
    let value: u64 = digits.parse().map_err(|_| invalid(raw))?;

    let unit_ms = match raw.chars().last().map(|c| c.to_ascii_lowercase()) {
        Some('m') => 60_000,
        Some('h') => 3_600_000,
        _ => 1_000,
    };

    value
        .checked_mul(unit_ms)
        .and_then(|ms| i64::try_from(ms).ok())
        .ok_or_else(|| invalid(raw))
}

/// Millisecond delta between `now` and the target instant, rounded to
/// the nearest millisecond with halves rounding up.
fn until(
    raw: &str,
    now: DateTime<Local>,
    target: DateTime<Local>,
) -> Result<ResolvedTimeout, AlarmError> {
    let delta = target.signed_duration_since(now);
    let ms = match delta.num_microseconds() {
        Some(us) => (us + 500).div_euclid(1000),
        None => delta.num_milliseconds(),
    };
    to_timeout(raw, ms)
}

/// Enforce the one post-condition every grammar shares: the resolved
/// delay must be strictly positive.
fn to_timeout(raw: &str, ms: i64) -> Result<ResolvedTimeout, AlarmError> {
    if ms <= 0 {
        return Err(AlarmError::ElapsedTimeout {
            raw: raw.to_string(),
            ms,
        });
    }
    Ok(Duration::from_millis(ms as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> DateTime<Local> {
        // Mid-day in May: no real timezone transitions anywhere nearby,
        // so local-time arithmetic is stable across test machines.
        Local.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_seconds() {
        assert_eq!(resolve("90s", noon()).unwrap(), Duration::from_millis(90_000));
        assert_eq!(resolve("1s", noon()).unwrap(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_relative_bare_number_means_seconds() {
        assert_eq!(resolve("5", noon()).unwrap(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_relative_minutes() {
        assert_eq!(resolve("2m", noon()).unwrap(), Duration::from_millis(120_000));
    }

    #[test]
    fn test_relative_hours() {
        assert_eq!(resolve("1h", noon()).unwrap(), Duration::from_millis(3_600_000));
    }

    #[test]
    fn test_relative_unit_is_case_insensitive() {
        assert_eq!(resolve("10M", noon()).unwrap(), Duration::from_millis(600_000));
        assert_eq!(resolve("2H", noon()).unwrap(), Duration::from_millis(7_200_000));
    }

    #[test]
    fn test_relative_unknown_unit_falls_back_to_seconds() {
        assert_eq!(resolve("5x", noon()).unwrap(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_zero_duration_is_rejected_with_computed_ms() {
        let err = resolve("0s", noon()).unwrap_err();
        assert!(matches!(err, AlarmError::ElapsedTimeout { ms: 0, .. }));
        assert_eq!(err.to_string(), "Invalid timeout value: 0s, ms: 0");
    }

    #[test]
    fn test_negative_duration_is_not_a_duration() {
        // No leading digits, so this is not even relative-shaped.
        let err = resolve("-5s", noon()).unwrap_err();
        assert!(matches!(err, AlarmError::InvalidTimeout { .. }));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = resolve("abc", noon()).unwrap_err();
        assert!(matches!(err, AlarmError::InvalidTimeout { .. }));
        assert_eq!(err.to_string(), "Invalid timeout value: abc");
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(matches!(
            resolve("  ", noon()).unwrap_err(),
            AlarmError::InvalidTimeout { .. }
        ));
    }

    #[test]
    fn test_overlong_digit_run_is_rejected() {
        assert!(matches!(
            resolve("99999999999999999999s", noon()).unwrap_err(),
            AlarmError::InvalidTimeout { .. }
        ));
    }

    #[test]
    fn test_unit_multiplication_overflow_is_rejected() {
        assert!(matches!(
            resolve("9999999999999999999h", noon()).unwrap_err(),
            AlarmError::InvalidTimeout { .. }
        ));
    }

    #[test]
    fn test_clock_time_later_today() {
        let d = resolve("19:45", noon()).unwrap();
        assert_eq!(d, Duration::from_millis(27_900_000));
    }

    #[test]
    fn test_clock_time_single_digit_hour() {
        let d = resolve("13:05", noon()).unwrap();
        assert_eq!(d, Duration::from_millis(3_900_000));
    }

    #[test]
    fn test_clock_time_in_the_past_stays_on_today() {
        // 08:30 this morning: stays on the current date instead of
        // rolling to tomorrow, so the computed delta is negative.
        let err = resolve("08:30", noon()).unwrap_err();
        match err {
            AlarmError::ElapsedTimeout { ms, .. } => assert_eq!(ms, -12_600_000),
            other => panic!("expected ElapsedTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_clock_time_hour_out_of_range() {
        // The pattern admits 24-29; building the time rejects them.
        for raw in ["24:00", "29:59"] {
            assert!(matches!(
                resolve(raw, noon()).unwrap_err(),
                AlarmError::InvalidTimeout { .. }
            ));
        }
    }

    #[test]
    fn test_datetime_local_format() {
        let d = resolve("2024-05-10 13:00:00", noon()).unwrap();
        assert_eq!(d, Duration::from_millis(3_600_000));
    }

    #[test]
    fn test_datetime_t_separator_without_seconds() {
        let d = resolve("2024-05-10T12:30", noon()).unwrap();
        assert_eq!(d, Duration::from_millis(1_800_000));
    }

    #[test]
    fn test_datetime_rfc3339() {
        // Both instants carry explicit offsets, so the expected delta
        // does not depend on the machine's timezone.
        let now = DateTime::parse_from_rfc3339("2024-05-10T10:00:00+02:00")
            .unwrap()
            .with_timezone(&Local);
        let d = resolve("2024-05-10T10:30:00+02:00", now).unwrap();
        assert_eq!(d, Duration::from_millis(1_800_000));
    }

    #[test]
    fn test_datetime_in_the_past_is_rejected() {
        let err = resolve("2024-05-10 11:00:00", noon()).unwrap_err();
        match err {
            AlarmError::ElapsedTimeout { ms, .. } => assert_eq!(ms, -3_600_000),
            other => panic!("expected ElapsedTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_date_only_means_local_midnight() {
        let d = resolve("2024-05-11", noon()).unwrap();
        assert_eq!(d, Duration::from_millis(43_200_000));
    }

    #[test]
    fn test_date_only_alternate_separators() {
        assert_eq!(
            resolve("2024/05/11", noon()).unwrap(),
            Duration::from_millis(43_200_000)
        );
        assert_eq!(
            resolve("2024.05.11", noon()).unwrap(),
            Duration::from_millis(43_200_000)
        );
    }

    #[test]
    fn test_todays_date_is_already_past() {
        // Local midnight of the current day is behind noon.
        assert!(matches!(
            resolve("2024-05-10", noon()).unwrap_err(),
            AlarmError::ElapsedTimeout { .. }
        ));
    }

    #[test]
    fn test_input_is_trimmed() {
        assert_eq!(resolve("  5s  ", noon()).unwrap(), Duration::from_millis(5_000));
    }
}
