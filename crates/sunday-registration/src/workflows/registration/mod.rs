//! Sunday service registration: target-date resolution, intake, and dashboards.
//!
//! A form posts a batch of registrants for one Sunday. The batch is appended to
//! the community's registrant table, the month/year/Sunday dashboards are
//! recomputed from the full table, and one confirmation goes out per address.

pub mod community;
pub mod domain;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod sunday;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use community::CommunityDirectory;
pub use domain::{CommunityId, Registrant, RegistrantType, RegistrationForm, RegistrationRecord};
pub use report::{
    AggregateRow, DashboardSnapshot, SundayAggregate, SundayRow, SundayStatistics,
    YearlyAggregate,
};
pub use repository::{
    ConfirmationNotice, DashboardPublisher, NotificationError, Notifier, PublishError,
    RegistrationStore, StoreError,
};
pub use router::registration_router;
pub use service::{
    AggregationError, IntakeOutcome, RegistrationService, RegistrationServiceError,
    RegistrationSettings, UpcomingSunday,
};
pub use store::CsvRegistrationStore;
pub use sunday::{ResolvedSunday, SundayResolver, DEFAULT_CUTOFF_HOUR};
pub use validation::{ValidationError, DEFAULT_SESSION_LABEL};
