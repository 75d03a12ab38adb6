//! Data logic behind the financial dashboard: typed filtering of tidy rows,
//! per-company aggregates, trends, and an explicit artifact cache.

pub mod aggregate;
pub mod cache;
pub mod query;
pub mod trends;

pub use aggregate::{
    average_by_company, key_metrics, summary_stats, CompanyAverage, CompanySummary, KeyMetrics,
    MetricAverage,
};
pub use cache::ArtifactCache;
pub use query::{companies, date_bounds, TidyQuery};
pub use trends::{correlation, growth_rates, CorrelationMatrix, GrowthPoint};
