use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::community::CommunityDirectory;
use super::domain::{CommunityId, Registrant, RegistrationForm, RegistrationRecord};
use super::report::{self, AggregateRow, DashboardSnapshot, SundayAggregate, YearlyAggregate};
use super::repository::{
    ConfirmationNotice, DashboardPublisher, NotificationError, Notifier, PublishError,
    RegistrationStore, StoreError,
};
use super::sunday::{long_label, ResolvedSunday, SundayResolver};
use super::validation::{IntakeGuard, ValidationError, DEFAULT_SESSION_LABEL};

/// Upper bound on delivery attempts per address.
pub const MAX_NOTIFY_ATTEMPTS: u8 = 5;

/// Injected configuration for the intake service.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub directory: CommunityDirectory,
    pub resolver: SundayResolver,
    pub default_session_label: String,
    pub notify_attempts: u8,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            directory: CommunityDirectory::single(CommunityId::new("main")),
            resolver: SundayResolver::default(),
            default_session_label: DEFAULT_SESSION_LABEL.to_string(),
            notify_attempts: 1,
        }
    }
}

/// What the form needs to render its header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingSunday {
    pub sunday_date: NaiveDate,
    pub is_today: bool,
    pub label: String,
    pub session_label: String,
}

/// Summary returned to the form after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeOutcome {
    pub success: bool,
    pub message: String,
    pub community: CommunityId,
    pub sunday_date: NaiveDate,
    pub count: usize,
    pub emails_sent: usize,
    pub email_errors: usize,
    pub failed_addresses: Vec<String>,
    pub dashboards_refreshed: bool,
}

/// Service composing the intake guard, store, dashboards, and notifier.
pub struct RegistrationService<S, N, P> {
    guard: IntakeGuard,
    store: Arc<S>,
    notifier: Arc<N>,
    dashboards: Arc<P>,
    directory: CommunityDirectory,
    resolver: SundayResolver,
    notify_attempts: u8,
    intake: Mutex<()>,
}

impl<S, N, P> RegistrationService<S, N, P>
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        dashboards: Arc<P>,
        settings: RegistrationSettings,
    ) -> Self {
        let RegistrationSettings {
            directory,
            resolver,
            default_session_label,
            notify_attempts,
        } = settings;

        Self {
            guard: IntakeGuard::new(default_session_label),
            store,
            notifier,
            dashboards,
            directory,
            resolver,
            notify_attempts: notify_attempts.clamp(1, MAX_NOTIFY_ATTEMPTS),
            intake: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &CommunityDirectory {
        &self.directory
    }

    pub fn resolver(&self) -> &SundayResolver {
        &self.resolver
    }

    pub fn resolve_sunday(&self, now: DateTime<Utc>) -> ResolvedSunday {
        self.resolver.resolve(now)
    }

    pub fn upcoming_sunday(&self, now: DateTime<Utc>) -> UpcomingSunday {
        let ResolvedSunday {
            date,
            is_today,
            label,
        } = self.resolver.resolve(now);
        UpcomingSunday {
            sunday_date: date,
            is_today,
            label,
            session_label: self.guard.default_session_label().to_string(),
        }
    }

    /// Append a batch, refresh dashboards, and confirm once per unique address.
    ///
    /// Only validation and store failures fail the call; dashboard and
    /// notification failures are reported in the outcome.
    pub fn submit(
        &self,
        form: RegistrationForm,
        now: DateTime<Utc>,
    ) -> Result<IntakeOutcome, RegistrationServiceError> {
        let community = self.directory.resolve(form.community.as_deref())?;
        let batch = self.guard.batch_from_form(&form)?;

        let records: Vec<RegistrationRecord> = batch
            .registrants
            .iter()
            .map(|registrant| RegistrationRecord {
                timestamp: now,
                community: community.clone(),
                first_name: registrant.first_name.clone(),
                last_name: registrant.last_name.clone(),
                email: registrant.email.clone(),
                registrant_type: registrant.registrant_type,
                session_label: batch.session_label.clone(),
                sunday_date: Some(batch.sunday_date),
            })
            .collect();

        let dashboards_refreshed = {
            let _intake = self.intake.lock().unwrap_or_else(PoisonError::into_inner);

            if let Err(err) = self.store.append(&community, &records) {
                if let StoreError::PartialAppend { appended, expected, .. } = &err {
                    error!(
                        community = %community,
                        appended,
                        expected,
                        "registration batch left partially appended"
                    );
                } else {
                    error!(community = %community, error = %err, "registration append failed");
                }
                return Err(err.into());
            }

            info!(
                community = %community,
                count = records.len(),
                sunday = %batch.sunday_date,
                "registrations appended"
            );

            match self.refresh_dashboards(&community, now) {
                Ok(_) => true,
                Err(err) => {
                    warn!(community = %community, error = %err, "dashboard refresh failed");
                    false
                }
            }
        };

        let mut emails_sent = 0;
        let mut failed_addresses = Vec::new();
        for (address, registrants) in group_by_address(&batch.registrants) {
            let notice = ConfirmationNotice {
                address,
                registrants,
                sunday_date: batch.sunday_date,
                session_label: batch.session_label.clone(),
                community: community.clone(),
            };
            match self.deliver(&notice) {
                Ok(()) => emails_sent += 1,
                Err(err) => {
                    warn!(address = %notice.address, error = %err, "confirmation not delivered");
                    failed_addresses.push(notice.address);
                }
            }
        }

        let count = records.len();
        Ok(IntakeOutcome {
            success: true,
            message: format!(
                "Registered {count} {} for {}",
                if count == 1 { "person" } else { "people" },
                long_label(batch.sunday_date)
            ),
            community,
            sunday_date: batch.sunday_date,
            count,
            emails_sent,
            email_errors: failed_addresses.len(),
            failed_addresses,
            dashboards_refreshed,
        })
    }

    /// Recompute all views for `community` and hand them to the publisher.
    pub fn refresh_dashboards(
        &self,
        community: &CommunityId,
        now: DateTime<Utc>,
    ) -> Result<DashboardSnapshot, AggregationError> {
        let records = self.store.read_all(community)?;
        let snapshot = report::dashboard(community.clone(), &records, now, self.resolver.timezone());
        self.dashboards.publish(&snapshot)?;
        Ok(snapshot)
    }

    pub fn monthly_aggregate(
        &self,
        community: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AggregateRow, RegistrationServiceError> {
        let records = self.records_for(community)?;
        let today = self.resolver.local_date(now);
        Ok(report::by_month(
            &records,
            today.year(),
            today.month(),
            self.resolver.timezone(),
        ))
    }

    pub fn yearly_aggregate(
        &self,
        community: Option<&str>,
        year: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<YearlyAggregate, RegistrationServiceError> {
        let records = self.records_for(community)?;
        let today = self.resolver.local_date(now);
        Ok(report::by_year(
            &records,
            year.unwrap_or_else(|| today.year()),
            today,
            self.resolver.timezone(),
        ))
    }

    pub fn sunday_aggregate(
        &self,
        community: Option<&str>,
    ) -> Result<SundayAggregate, RegistrationServiceError> {
        let records = self.records_for(community)?;
        Ok(report::by_sunday_date(&records))
    }

    fn records_for(
        &self,
        community: Option<&str>,
    ) -> Result<Vec<RegistrationRecord>, RegistrationServiceError> {
        let community = self.directory.resolve(community)?;
        Ok(self.store.read_all(&community)?)
    }

    fn deliver(&self, notice: &ConfirmationNotice) -> Result<(), NotificationError> {
        let mut attempt = 1;
        loop {
            match self.notifier.notify(notice) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.notify_attempts => {
                    warn!(address = %notice.address, attempt, error = %err, "retrying confirmation");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Registrants grouped by address, in first-seen order.
fn group_by_address(registrants: &[Registrant]) -> Vec<(String, Vec<Registrant>)> {
    let mut groups: Vec<(String, Vec<Registrant>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for registrant in registrants {
        match index.get(registrant.email.as_str()) {
            Some(&position) => groups[position].1.push(registrant.clone()),
            None => {
                index.insert(registrant.email.as_str(), groups.len());
                groups.push((registrant.email.clone(), vec![registrant.clone()]));
            }
        }
    }
    groups
}

/// Error raised by the registration service.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistrationServiceError {
    /// Message safe to show on the form; the `Display` output is the operator detail.
    pub const fn user_message(&self) -> &'static str {
        match self {
            RegistrationServiceError::Validation(_) => {
                "Please check the registration details and try again."
            }
            RegistrationServiceError::Store(_) => {
                "Registration could not be saved right now. Please try again later."
            }
        }
    }
}

/// Failure while recomputing or publishing dashboards. Never fails a submission.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("could not read registrations: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}
