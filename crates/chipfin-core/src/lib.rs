//! Quarterly financials for a small semiconductor peer group.
//!
//! Raw facts from upstream sources are normalized into one wide record per
//! company-quarter (figures in millions, plus Inventory Turnover), persisted
//! as a CSV artifact, and melted into tidy rows that dashboards filter and
//! aggregate.

pub mod error;
pub mod model;
pub mod normalize;
pub mod tidy;
pub mod types;

#[cfg(feature = "artifact")]
pub mod artifact;

#[cfg(feature = "sources")]
pub mod sources;

#[cfg(feature = "dashboard")]
pub mod dashboard;

pub use error::ChipFinError;
pub use model::{CompanyPeriodRecord, DuplicatePolicy, FinancialFact, Metric, RawValue, TidyRow};
pub use normalize::normalize;
pub use tidy::{from_tidy, to_tidy};
pub use types::*;

/// Standard result type for all chipfin operations
pub type ChipFinResult<T> = Result<T, ChipFinError>;
