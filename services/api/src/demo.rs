use crate::infra::{
    parse_instant, InMemoryDashboardBoard, InMemoryRegistrationStore, TracingNotifier,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use sunday_registration::config::{parse_timezone, AppConfig};
use sunday_registration::error::AppError;
use sunday_registration::telemetry;
use sunday_registration::workflows::registration::{
    AggregateRow, CsvRegistrationStore, DashboardSnapshot, IntakeOutcome, Registrant,
    RegistrantType, RegistrationForm, RegistrationService, SundayAggregate, SundayResolver,
    YearlyAggregate,
};

#[derive(Args, Debug, Default)]
pub(crate) struct SundayArgs {
    /// Instant to resolve from (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Override the configured cutoff hour (0-23).
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=23))]
    pub(crate) cutoff_hour: Option<u32>,
    /// Override the configured IANA timezone, e.g. America/Chicago.
    #[arg(long, value_parser = parse_zone)]
    pub(crate) timezone: Option<Tz>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Community whose table should be summarized. Defaults to the configured default.
    #[arg(long)]
    pub(crate) community: Option<String>,
    /// Override the directory holding the per-community CSV tables.
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Calendar year for the yearly view. Defaults to the current year.
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Evaluation instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Print the views as JSON instead of tables.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Submission instant (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
}

fn parse_zone(raw: &str) -> Result<Tz, String> {
    parse_timezone(raw).map_err(|err| err.to_string())
}

pub(crate) fn run_sunday(args: SundayArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let now = args.now.unwrap_or_else(Utc::now);
    let resolver = SundayResolver::new(
        args.cutoff_hour.unwrap_or(config.registration.cutoff_hour),
        args.timezone.unwrap_or(config.registration.timezone),
    );

    let resolved = resolver.resolve(now);
    println!("Upcoming Sunday");
    println!(
        "  Evaluated at: {} ({} local: {})",
        now.to_rfc3339(),
        resolver.timezone(),
        now.with_timezone(&resolver.timezone()).format("%Y-%m-%d %H:%M")
    );
    println!("  Cutoff hour: {:02}:00 local", resolver.cutoff_hour());
    println!("  Target: {} ({})", resolved.label, resolved.date);
    println!(
        "  {}",
        if resolved.is_today {
            "Today's service is still open for registration"
        } else {
            "Registrations go to the next service"
        }
    );
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        community,
        data_dir,
        year,
        now,
        json,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(data_dir) = data_dir {
        config.registration.data_dir = data_dir;
    }
    telemetry::init(&config.telemetry)?;
    let now = now.unwrap_or_else(Utc::now);

    let store = Arc::new(CsvRegistrationStore::open(&config.registration.data_dir)?);
    let service = RegistrationService::new(
        store,
        Arc::new(TracingNotifier::default()),
        Arc::new(InMemoryDashboardBoard::default()),
        config.registration.settings(),
    );

    let community = community.as_deref();
    let monthly = service.monthly_aggregate(community, now)?;
    let yearly = service.yearly_aggregate(community, year, now)?;
    let sundays = service.sunday_aggregate(community)?;

    if json {
        let payload = serde_json::json!({
            "monthly": monthly,
            "yearly": yearly,
            "sundays": sundays,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(rendered) => println!("{}", rendered),
            Err(err) => println!("Report unavailable: {}", err),
        }
        return Ok(());
    }

    let resolved = service.directory().resolve(community)?;
    println!("Registration report for '{}'", resolved);
    println!("Data directory: {}", config.registration.data_dir.display());
    render_views(&monthly, &yearly, &sundays);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let now = args.now.unwrap_or_else(Utc::now);
    let notifier = Arc::new(TracingNotifier::default());
    let dashboards = Arc::new(InMemoryDashboardBoard::default());
    let service = RegistrationService::new(
        Arc::new(InMemoryRegistrationStore::default()),
        notifier.clone(),
        dashboards.clone(),
        config.registration.settings(),
    );

    let upcoming = service.upcoming_sunday(now);
    println!("Sunday registration demo");
    println!(
        "  Form offers {} ({}) for '{}'",
        upcoming.label,
        if upcoming.is_today {
            "today"
        } else {
            "upcoming"
        },
        upcoming.session_label
    );

    let household = RegistrationForm {
        community: None,
        session_info: None,
        sunday_date: upcoming.sunday_date,
        registrants: vec![
            demo_registrant("Grace", "Hopper", "grace@example.org", RegistrantType::Member),
            demo_registrant("Walter", "Hopper", "grace@example.org", RegistrantType::Guest),
            demo_registrant("Ada", "Byron", "ada@example.org", RegistrantType::Guest),
        ],
    };

    println!("\nHousehold submission");
    match service.submit(household, now) {
        Ok(outcome) => render_outcome(&outcome),
        Err(err) => println!("  Submission rejected: {} ({})", err.user_message(), err),
    }

    let bad_email = RegistrationForm {
        community: None,
        session_info: None,
        sunday_date: upcoming.sunday_date,
        registrants: vec![demo_registrant(
            "Lin",
            "Wu",
            "not-an-address",
            RegistrantType::Guest,
        )],
    };

    println!("\nSubmission with an invalid address");
    match service.submit(bad_email, now) {
        Ok(outcome) => render_outcome(&outcome),
        Err(err) => println!("  Submission rejected: {} ({})", err.user_message(), err),
    }

    let sent = notifier.sent();
    println!("\nConfirmations");
    for notice in &sent {
        println!(
            "  {} <- \"{}\" ({} registrant(s))",
            notice.address,
            notice.subject(),
            notice.registrants.len()
        );
    }

    let community = service.directory().default_community().clone();
    match dashboards.latest(&community) {
        Some(snapshot) => render_snapshot(&snapshot),
        None => println!("\nDashboards: not refreshed"),
    }

    Ok(())
}

fn demo_registrant(first: &str, last: &str, email: &str, kind: RegistrantType) -> Registrant {
    Registrant {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        registrant_type: kind,
    }
}

fn render_outcome(outcome: &IntakeOutcome) {
    println!("  {}", outcome.message);
    println!(
        "  Stored {} registrant(s) for {} in '{}'",
        outcome.count, outcome.sunday_date, outcome.community
    );
    println!(
        "  Confirmations sent: {} (failed: {})",
        outcome.emails_sent, outcome.email_errors
    );
    for address in &outcome.failed_addresses {
        println!("    undelivered: {}", address);
    }
    println!(
        "  Dashboards refreshed: {}",
        if outcome.dashboards_refreshed {
            "yes"
        } else {
            "no"
        }
    );
}

fn render_snapshot(snapshot: &DashboardSnapshot) {
    println!(
        "\nDashboards for '{}' (generated {})",
        snapshot.community,
        snapshot.generated_at.to_rfc3339()
    );
    render_views(&snapshot.monthly, &snapshot.yearly, &snapshot.sundays);
}

fn render_views(monthly: &AggregateRow, yearly: &YearlyAggregate, sundays: &SundayAggregate) {
    println!("\nThis month");
    render_row(monthly);

    println!("\nYear {}", yearly.year);
    for row in &yearly.months {
        render_row(row);
    }
    render_row(&yearly.total);

    println!("\nBy Sunday");
    if sundays.sundays.is_empty() {
        println!("  no dated registrations yet");
    }
    for row in &sundays.sundays {
        render_row(&row.counts);
    }
    let stats = &sundays.statistics;
    println!(
        "  {} Sunday(s), {} registrations ({} members, {} guests), average {} per Sunday",
        stats.sunday_count,
        stats.total_registrations,
        stats.total_members,
        stats.total_guests,
        stats.average_per_sunday
    );
}

fn render_row(row: &AggregateRow) {
    println!(
        "  {:<28} total {:>4}  members {:>4}  guests {:>4}  contacts {:>4}",
        row.label, row.total, row.members, row.guests, row.unique_contacts
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_installs_the_log_subscriber_before_submitting() {
        let now = parse_instant("2024-02-28T19:15:00Z").expect("valid instant");
        run_demo(DemoArgs { now: Some(now) }).expect("demo runs");
        assert!(tracing::dispatcher::has_been_set());
    }
}
