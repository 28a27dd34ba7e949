use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::super::domain::CommunityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub label: String,
    pub total: usize,
    pub members: usize,
    pub guests: usize,
    pub unique_contacts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyAggregate {
    pub year: i32,
    pub months: Vec<AggregateRow>,
    pub total: AggregateRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SundayRow {
    pub sunday_date: NaiveDate,
    #[serde(flatten)]
    pub counts: AggregateRow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SundayStatistics {
    pub sunday_count: usize,
    pub total_registrations: usize,
    pub total_members: usize,
    pub total_guests: usize,
    pub average_per_sunday: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SundayAggregate {
    pub sundays: Vec<SundayRow>,
    pub statistics: SundayStatistics,
}

/// All three dashboard views for one community, computed in a single pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub community: CommunityId,
    pub generated_at: DateTime<Utc>,
    pub monthly: AggregateRow,
    pub yearly: YearlyAggregate,
    pub sundays: SundayAggregate,
}
