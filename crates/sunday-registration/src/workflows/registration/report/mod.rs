mod summary;
pub mod views;

pub use summary::{by_month, by_sunday_date, by_year, dashboard};
pub use views::{
    AggregateRow, DashboardSnapshot, SundayAggregate, SundayRow, SundayStatistics,
    YearlyAggregate,
};
