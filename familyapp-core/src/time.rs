//! Time utilities: owner-local day boundaries.
//!
//! Every "today" / "tomorrow" decision is made against the owner's calendar
//! day, not the UTC day, so the scheduler resolves a timezone per profile.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, Result};

/// Parse an IANA timezone name like "America/Chicago".
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| CoreError::InvalidTimezone(name.to_string()))
}

/// The owner's calendar date at `now`.
pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// UTC instant at which the local calendar day `day` begins.
///
/// A few zones skip midnight on DST days; the first valid hour is used then.
pub fn local_day_start_utc(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    for hour in 0..3 {
        let Some(t) = NaiveTime::from_hms_opt(hour, 0, 0) else {
            continue;
        };
        if let Some(local) = tz.from_local_datetime(&day.and_time(t)).earliest() {
            return local.with_timezone(&Utc);
        }
    }
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(date)
}

/// First day of the month before the one containing `date`.
pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    month_start(month_start(date) - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chicago_day_starts_at_local_midnight() {
        let tz = parse_timezone("America/Chicago").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        // Feb is CST (UTC-6)
        assert_eq!(
            local_day_start_utc(day, tz).to_rfc3339(),
            "2026-02-20T06:00:00+00:00"
        );
    }

    #[test]
    fn local_today_crosses_utc_midnight() {
        let tz = parse_timezone("America/Los_Angeles").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 20, 3, 0, 0).unwrap();
        assert_eq!(local_today(now, tz), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    }

    #[test]
    fn bad_timezone_is_rejected() {
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(CoreError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn month_bounds() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        assert_eq!(month_start(d), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(month_end(d), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let dec = NaiveDate::from_ymd_opt(2026, 12, 5).unwrap();
        assert_eq!(month_end(dec), NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        let jan = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(
            previous_month_start(jan),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }
}
