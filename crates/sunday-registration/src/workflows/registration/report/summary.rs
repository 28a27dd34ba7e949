use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

use super::super::domain::{normalize_email, CommunityId, RegistrantType, RegistrationRecord};
use super::super::sunday::long_label;
use super::views::{
    AggregateRow, DashboardSnapshot, SundayAggregate, SundayRow, SundayStatistics,
    YearlyAggregate,
};

#[derive(Debug, Default, Clone)]
struct Tally {
    total: usize,
    members: usize,
    guests: usize,
    contacts: HashSet<String>,
}

impl Tally {
    fn record(&mut self, record: &RegistrationRecord) {
        self.total += 1;
        match record.registrant_type {
            RegistrantType::Member => self.members += 1,
            RegistrantType::Guest => self.guests += 1,
        }
        let email = normalize_email(&record.email);
        if !email.is_empty() {
            self.contacts.insert(email);
        }
    }

    fn merge(&mut self, other: &Tally) {
        self.total += other.total;
        self.members += other.members;
        self.guests += other.guests;
        self.contacts.extend(other.contacts.iter().cloned());
    }

    fn into_row(self, label: String) -> AggregateRow {
        AggregateRow {
            label,
            total: self.total,
            members: self.members,
            guests: self.guests,
            unique_contacts: self.contacts.len(),
        }
    }
}

fn local_year_month(timestamp: DateTime<Utc>, timezone: Tz) -> (i32, u32) {
    let local = timestamp.with_timezone(&timezone);
    (local.year(), local.month())
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

/// Registrations whose timestamp falls in `(year, month)` in the given timezone.
pub fn by_month(
    records: &[RegistrationRecord],
    year: i32,
    month: u32,
    timezone: Tz,
) -> AggregateRow {
    let mut tally = Tally::default();
    for record in records {
        if local_year_month(record.timestamp, timezone) == (year, month) {
            tally.record(record);
        }
    }
    tally.into_row(month_label(year, month))
}

/// One row per elapsed month of `year` as seen from `today`, plus a grand total.
///
/// Past years list all twelve months, the current year stops at the current
/// month, and future years have no month rows.
pub fn by_year(
    records: &[RegistrationRecord],
    year: i32,
    today: NaiveDate,
    timezone: Tz,
) -> YearlyAggregate {
    let last_month = match year.cmp(&today.year()) {
        std::cmp::Ordering::Less => 12,
        std::cmp::Ordering::Equal => today.month(),
        std::cmp::Ordering::Greater => 0,
    };

    let mut buckets = vec![Tally::default(); last_month as usize];
    for record in records {
        let (record_year, record_month) = local_year_month(record.timestamp, timezone);
        if record_year != year || record_month > last_month {
            continue;
        }
        if let Some(bucket) = buckets.get_mut(record_month as usize - 1) {
            bucket.record(record);
        }
    }

    let mut grand = Tally::default();
    let months = buckets
        .into_iter()
        .zip(1..=last_month)
        .map(|(tally, month)| {
            grand.merge(&tally);
            tally.into_row(month_label(year, month))
        })
        .collect();

    YearlyAggregate {
        year,
        months,
        total: grand.into_row(format!("Total {year}")),
    }
}

/// Groups by Sunday date, most recent first. Records without a date are skipped.
pub fn by_sunday_date(records: &[RegistrationRecord]) -> SundayAggregate {
    let mut groups: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.sunday_date {
            groups.entry(date).or_default().record(record);
        }
    }

    let mut statistics = SundayStatistics {
        sunday_count: groups.len(),
        ..SundayStatistics::default()
    };

    let sundays: Vec<SundayRow> = groups
        .into_iter()
        .rev()
        .map(|(sunday_date, tally)| {
            statistics.total_registrations += tally.total;
            statistics.total_members += tally.members;
            statistics.total_guests += tally.guests;
            SundayRow {
                sunday_date,
                counts: tally.into_row(long_label(sunday_date)),
            }
        })
        .collect();

    statistics.average_per_sunday =
        rounded_average(statistics.total_registrations, statistics.sunday_count);

    SundayAggregate {
        sundays,
        statistics,
    }
}

/// Integer mean rounded half up; zero when there is nothing to divide by.
fn rounded_average(total: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        (total + count / 2) / count
    }
}

/// Recomputes every view for `community` as of `now`.
pub fn dashboard(
    community: CommunityId,
    records: &[RegistrationRecord],
    now: DateTime<Utc>,
    timezone: Tz,
) -> DashboardSnapshot {
    let today = now.with_timezone(&timezone).date_naive();
    DashboardSnapshot {
        community,
        generated_at: now,
        monthly: by_month(records, today.year(), today.month(), timezone),
        yearly: by_year(records, today.year(), today, timezone),
        sundays: by_sunday_date(records),
    }
}
