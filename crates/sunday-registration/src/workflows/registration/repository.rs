use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{CommunityId, Registrant, RegistrationRecord};
use super::report::DashboardSnapshot;

/// Append-only registrant table, partitioned by community.
pub trait RegistrationStore: Send + Sync {
    fn append(
        &self,
        community: &CommunityId,
        records: &[RegistrationRecord],
    ) -> Result<(), StoreError>;
    fn read_all(&self, community: &CommunityId) -> Result<Vec<RegistrationRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("batch partially appended ({appended} of {expected} rows): {reason}")]
    PartialAppend {
        appended: usize,
        expected: usize,
        reason: String,
    },
    #[error("stored row {row} is malformed: {reason}")]
    Malformed { row: usize, reason: String },
}

/// Confirmation payload for one contact address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationNotice {
    pub address: String,
    pub registrants: Vec<Registrant>,
    pub sunday_date: NaiveDate,
    pub session_label: String,
    pub community: CommunityId,
}

impl ConfirmationNotice {
    pub fn subject(&self) -> String {
        format!(
            "Registration confirmed: {} on {}",
            self.session_label,
            super::sunday::long_label(self.sunday_date)
        )
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "Thank you for registering for {} on {}.\n\nRegistered:\n",
            self.session_label,
            super::sunday::long_label(self.sunday_date)
        );
        for registrant in &self.registrants {
            body.push_str(&format!(
                "- {} ({})\n",
                registrant.full_name(),
                registrant.registrant_type.label()
            ));
        }
        body
    }
}

/// Outbound confirmation hook (e-mail or similar adapters).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &ConfirmationNotice) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification rejected for {0}")]
    Rejected(String),
}

/// Sink for recomputed dashboards (the summary tabs).
pub trait DashboardPublisher: Send + Sync {
    fn publish(&self, snapshot: &DashboardSnapshot) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("dashboard sink unavailable: {0}")]
    Unavailable(String),
}
