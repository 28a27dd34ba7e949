//! Decides which Sunday service a registration made at a given instant belongs to.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Hour of the day from which a Sunday stops offering its own service.
pub const DEFAULT_CUTOFF_HOUR: u32 = 14;

/// Outcome of resolving the registration target for an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSunday {
    pub date: NaiveDate,
    pub is_today: bool,
    pub label: String,
}

/// Applies the cutoff-hour rollover rule in an explicitly configured IANA timezone,
/// so wall-clock hours follow daylight saving transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SundayResolver {
    cutoff_hour: u32,
    timezone: Tz,
}

impl SundayResolver {
    /// `cutoff_hour` values above 23 are clamped to 23.
    pub fn new(cutoff_hour: u32, timezone: Tz) -> Self {
        Self {
            cutoff_hour: cutoff_hour.min(23),
            timezone,
        }
    }

    pub const fn cutoff_hour(&self) -> u32 {
        self.cutoff_hour
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Local calendar date of `now` in the configured timezone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    pub fn resolve(&self, now: DateTime<Utc>) -> ResolvedSunday {
        let local = now.with_timezone(&self.timezone);
        let today = local.date_naive();
        let dow = today.weekday().num_days_from_sunday();

        let (date, is_today) = if dow == 0 {
            if local.hour() < self.cutoff_hour {
                (today, true)
            } else {
                (today + Duration::days(7), false)
            }
        } else {
            let days_until_sunday = (7 - dow) % 7;
            (today + Duration::days(i64::from(days_until_sunday)), false)
        };

        ResolvedSunday {
            date,
            is_today,
            label: long_label(date),
        }
    }
}

impl Default for SundayResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF_HOUR, chrono_tz::UTC)
    }
}

/// Long-form rendering such as `Sunday, March 3, 2024`.
pub fn long_label(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("valid instant")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn sunday_before_cutoff_targets_today() {
        let resolver = SundayResolver::default();
        let resolved = resolver.resolve(utc(2024, 3, 3, 13, 59));
        assert_eq!(resolved.date, date(2024, 3, 3));
        assert!(resolved.is_today);
        assert_eq!(resolved.label, "Sunday, March 3, 2024");
    }

    #[test]
    fn sunday_at_cutoff_rolls_forward_a_week() {
        let resolver = SundayResolver::default();
        let resolved = resolver.resolve(utc(2024, 3, 3, 14, 0));
        assert_eq!(resolved.date, date(2024, 3, 10));
        assert!(!resolved.is_today);
    }

    #[test]
    fn weekdays_target_next_sunday_within_six_days() {
        let resolver = SundayResolver::default();
        for day in 4..=9 {
            let now = utc(2024, 3, day, 9, 30);
            let resolved = resolver.resolve(now);
            let ahead = (resolved.date - now.date_naive()).num_days();
            assert!((1..=6).contains(&ahead), "day {day} resolved {ahead} days ahead");
            assert_eq!(resolved.date, date(2024, 3, 10));
            assert!(!resolved.is_today);
        }
    }

    #[test]
    fn timezone_shifts_the_local_day() {
        let resolver = SundayResolver::new(14, chrono_tz::America::Chicago);
        // Monday 02:00 UTC is still Sunday 20:00 in Chicago, past the cutoff.
        let resolved = resolver.resolve(utc(2024, 3, 4, 2, 0));
        assert_eq!(resolved.date, date(2024, 3, 10));
        assert!(!resolved.is_today);
    }

    #[test]
    fn cutoff_follows_daylight_saving_time() {
        let resolver = SundayResolver::new(14, chrono_tz::America::Chicago);

        // 19:30 UTC in January is 13:30 CST, before the cutoff.
        let winter = resolver.resolve(utc(2024, 1, 7, 19, 30));
        assert_eq!(winter.date, date(2024, 1, 7));
        assert!(winter.is_today);

        // The same UTC time in July is 14:30 CDT, at or past the cutoff.
        let summer = resolver.resolve(utc(2024, 7, 7, 19, 30));
        assert_eq!(summer.date, date(2024, 7, 14));
        assert!(!summer.is_today);
    }

    #[test]
    fn zero_cutoff_never_offers_today() {
        let resolver = SundayResolver::new(0, chrono_tz::UTC);
        let resolved = resolver.resolve(utc(2024, 3, 3, 0, 0));
        assert_eq!(resolved.date, date(2024, 3, 10));
    }
}
