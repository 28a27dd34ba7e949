use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::registration::domain::{
    CommunityId, Registrant, RegistrantType, RegistrationForm, RegistrationRecord,
};
use crate::workflows::registration::report::DashboardSnapshot;
use crate::workflows::registration::repository::{
    ConfirmationNotice, DashboardPublisher, NotificationError, Notifier, PublishError,
    RegistrationStore, StoreError,
};
use crate::workflows::registration::{
    CommunityDirectory, RegistrationService, RegistrationSettings, SundayResolver,
};

pub(super) type MemoryService = RegistrationService<MemoryStore, MemoryNotifier, MemoryDashboards>;

pub(super) fn sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 3).expect("valid date")
}

/// Wednesday before the sample Sunday.
pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 28, 19, 15, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn registrant(
    first_name: &str,
    email: &str,
    registrant_type: RegistrantType,
) -> Registrant {
    Registrant {
        first_name: first_name.to_string(),
        last_name: "Example".to_string(),
        email: email.to_string(),
        registrant_type,
    }
}

pub(super) fn form(registrants: Vec<Registrant>) -> RegistrationForm {
    RegistrationForm {
        community: None,
        session_info: None,
        sunday_date: sunday(),
        registrants,
    }
}

pub(super) fn household_form() -> RegistrationForm {
    form(vec![
        registrant("Alice", "a@x.com", RegistrantType::Member),
        registrant("Bob", "b@x.com", RegistrantType::Guest),
    ])
}

pub(super) fn settings() -> RegistrationSettings {
    RegistrationSettings {
        directory: CommunityDirectory::new(
            CommunityId::new("main"),
            [CommunityId::new("youth")],
        ),
        resolver: SundayResolver::default(),
        ..RegistrationSettings::default()
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<MemoryStore>,
    Arc<MemoryNotifier>,
    Arc<MemoryDashboards>,
) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let dashboards = Arc::new(MemoryDashboards::default());
    let service = RegistrationService::new(
        store.clone(),
        notifier.clone(),
        dashboards.clone(),
        settings(),
    );
    (service, store, notifier, dashboards)
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    tables: Arc<Mutex<HashMap<CommunityId, Vec<RegistrationRecord>>>>,
}

impl MemoryStore {
    pub(super) fn records(&self, community: &str) -> Vec<RegistrationRecord> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .get(&CommunityId::new(community))
            .cloned()
            .unwrap_or_default()
    }
}

impl RegistrationStore for MemoryStore {
    fn append(
        &self,
        community: &CommunityId,
        records: &[RegistrationRecord],
    ) -> Result<(), StoreError> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .entry(community.clone())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    fn read_all(&self, community: &CommunityId) -> Result<Vec<RegistrationRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .expect("store mutex poisoned")
            .get(community)
            .cloned()
            .unwrap_or_default())
    }
}

pub(super) struct UnavailableStore;

impl RegistrationStore for UnavailableStore {
    fn append(
        &self,
        _community: &CommunityId,
        _records: &[RegistrationRecord],
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("sheet offline".to_string()))
    }

    fn read_all(&self, _community: &CommunityId) -> Result<Vec<RegistrationRecord>, StoreError> {
        Err(StoreError::Unavailable("sheet offline".to_string()))
    }
}

/// Accepts appends but cannot be read back, so dashboards fail after intake.
#[derive(Default)]
pub(super) struct WriteOnlyStore {
    pub(super) appended: Mutex<usize>,
}

impl RegistrationStore for WriteOnlyStore {
    fn append(
        &self,
        _community: &CommunityId,
        records: &[RegistrationRecord],
    ) -> Result<(), StoreError> {
        *self.appended.lock().expect("store mutex poisoned") += records.len();
        Ok(())
    }

    fn read_all(&self, _community: &CommunityId) -> Result<Vec<RegistrationRecord>, StoreError> {
        Err(StoreError::Unavailable("read quota exceeded".to_string()))
    }
}

/// Keeps the first `accept` rows of a batch, then fails like a dropped write.
pub(super) struct TruncatingStore {
    accept: usize,
    rows: Mutex<Vec<RegistrationRecord>>,
}

impl TruncatingStore {
    pub(super) fn new(accept: usize) -> Self {
        Self {
            accept,
            rows: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn rows(&self) -> Vec<RegistrationRecord> {
        self.rows.lock().expect("store mutex poisoned").clone()
    }
}

impl RegistrationStore for TruncatingStore {
    fn append(
        &self,
        _community: &CommunityId,
        records: &[RegistrationRecord],
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        let kept = records.len().min(self.accept);
        rows.extend_from_slice(&records[..kept]);
        if kept < records.len() {
            return Err(StoreError::PartialAppend {
                appended: kept,
                expected: records.len(),
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }

    fn read_all(&self, _community: &CommunityId) -> Result<Vec<RegistrationRecord>, StoreError> {
        Ok(self.rows())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<ConfirmationNotice>>>,
    attempts: Arc<Mutex<HashMap<String, usize>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
    flaky_failures: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<ConfirmationNotice> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn attempts(&self, address: &str) -> usize {
        self.attempts
            .lock()
            .expect("notifier mutex poisoned")
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub(super) fn total_attempts(&self) -> usize {
        self.attempts
            .lock()
            .expect("notifier mutex poisoned")
            .values()
            .sum()
    }

    pub(super) fn reject(&self, address: &str) {
        self.rejected
            .lock()
            .expect("notifier mutex poisoned")
            .insert(address.to_string());
    }

    pub(super) fn fail_times(&self, address: &str, failures: usize) {
        self.flaky_failures
            .lock()
            .expect("notifier mutex poisoned")
            .insert(address.to_string(), failures);
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: &ConfirmationNotice) -> Result<(), NotificationError> {
        *self
            .attempts
            .lock()
            .expect("notifier mutex poisoned")
            .entry(notice.address.clone())
            .or_default() += 1;

        if self
            .rejected
            .lock()
            .expect("notifier mutex poisoned")
            .contains(&notice.address)
        {
            return Err(NotificationError::Rejected(notice.address.clone()));
        }

        let mut flaky = self.flaky_failures.lock().expect("notifier mutex poisoned");
        if let Some(remaining) = flaky.get_mut(&notice.address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(NotificationError::Transport("smtp timeout".to_string()));
            }
        }

        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDashboards {
    snapshots: Arc<Mutex<Vec<DashboardSnapshot>>>,
}

impl MemoryDashboards {
    pub(super) fn snapshots(&self) -> Vec<DashboardSnapshot> {
        self.snapshots
            .lock()
            .expect("dashboard mutex poisoned")
            .clone()
    }
}

impl DashboardPublisher for MemoryDashboards {
    fn publish(&self, snapshot: &DashboardSnapshot) -> Result<(), PublishError> {
        self.snapshots
            .lock()
            .expect("dashboard mutex poisoned")
            .push(snapshot.clone());
        Ok(())
    }
}

pub(super) struct OfflineDashboards;

impl DashboardPublisher for OfflineDashboards {
    fn publish(&self, _snapshot: &DashboardSnapshot) -> Result<(), PublishError> {
        Err(PublishError::Unavailable("summary sheet locked".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
