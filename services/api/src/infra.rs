use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use sunday_registration::workflows::registration::{
    CommunityId, ConfirmationNotice, DashboardPublisher, DashboardSnapshot, NotificationError,
    Notifier, PublishError, RegistrationRecord, RegistrationStore, StoreError,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRegistrationStore {
    tables: Arc<Mutex<HashMap<CommunityId, Vec<RegistrationRecord>>>>,
}

impl RegistrationStore for InMemoryRegistrationStore {
    fn append(
        &self,
        community: &CommunityId,
        records: &[RegistrationRecord],
    ) -> Result<(), StoreError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard
            .entry(community.clone())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    fn read_all(&self, community: &CommunityId) -> Result<Vec<RegistrationRecord>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard.get(community).cloned().unwrap_or_default())
    }
}

/// Logs each confirmation instead of delivering it; keeps a copy for inspection.
#[derive(Default, Clone)]
pub(crate) struct TracingNotifier {
    sent: Arc<Mutex<Vec<ConfirmationNotice>>>,
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &ConfirmationNotice) -> Result<(), NotificationError> {
        info!(
            address = %notice.address,
            community = %notice.community,
            registrants = notice.registrants.len(),
            subject = %notice.subject(),
            "confirmation queued"
        );
        let mut guard = self.sent.lock().expect("notifier mutex poisoned");
        guard.push(notice.clone());
        Ok(())
    }
}

impl TracingNotifier {
    pub(crate) fn sent(&self) -> Vec<ConfirmationNotice> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

/// Keeps the most recent dashboard per community.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDashboardBoard {
    latest: Arc<Mutex<HashMap<CommunityId, DashboardSnapshot>>>,
}

impl DashboardPublisher for InMemoryDashboardBoard {
    fn publish(&self, snapshot: &DashboardSnapshot) -> Result<(), PublishError> {
        let mut guard = self.latest.lock().expect("dashboard mutex poisoned");
        guard.insert(snapshot.community.clone(), snapshot.clone());
        Ok(())
    }
}

impl InMemoryDashboardBoard {
    pub(crate) fn latest(&self, community: &CommunityId) -> Option<DashboardSnapshot> {
        self.latest
            .lock()
            .expect("dashboard mutex poisoned")
            .get(community)
            .cloned()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// RFC 3339 instant, or a bare date taken as midnight UTC.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }

    parse_date(trimmed).and_then(|date| {
        date.and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("'{raw}' has no midnight"))
    })
}
