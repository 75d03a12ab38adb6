//! Upstream fact sources and the collection loop.
//!
//! A source returns raw facts for one company symbol. Collection walks every
//! company through every source; a failing source is logged and contributes
//! nothing, so the worst case is an empty fact list, never an aborted run.

pub mod files;
pub mod statements;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::model::FinancialFact;
use crate::ChipFinResult;

pub use files::{read_facts_csv, read_facts_json, FactsCsvSource, FactsJsonSource};
pub use statements::{StatementDocument, StatementSource};

/// Placeholder substituted with the company symbol in source paths.
pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

pub trait FactSource {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Fetch every fact this source has for `symbol`.
    fn fetch(&self, symbol: &str) -> ChipFinResult<Vec<FinancialFact>>;
}

/// A source that failed for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub company: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionReport {
    pub facts: Vec<FinancialFact>,
    /// Companies for which at least one source returned facts.
    pub companies_with_data: Vec<String>,
    pub source_failures: Vec<SourceFailure>,
}

/// Run every source for every company, sleeping `delay` between companies.
pub fn collect(
    sources: &[Box<dyn FactSource>],
    companies: &[String],
    delay: Duration,
) -> CollectionReport {
    let mut report = CollectionReport::default();

    for (i, symbol) in companies.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        info!(company = %symbol, "collecting facts");

        let mut found = 0usize;
        for source in sources {
            match source.fetch(symbol) {
                Ok(facts) if facts.is_empty() => {
                    warn!(company = %symbol, source = source.name(), "source returned no data");
                }
                Ok(facts) => {
                    info!(company = %symbol, source = source.name(), count = facts.len(), "fetched facts");
                    found += facts.len();
                    report.facts.extend(facts);
                }
                Err(e) => {
                    warn!(company = %symbol, source = source.name(), "source failed: {e}");
                    report.source_failures.push(SourceFailure {
                        source: source.name().to_string(),
                        company: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if found > 0 {
            report.companies_with_data.push(symbol.clone());
        }
    }

    if report.facts.is_empty() {
        warn!("no data collected from any source");
    }
    report
}

/// Substitute the company symbol into a path template.
pub fn resolve_path(template: &str, symbol: &str) -> PathBuf {
    PathBuf::from(template.replace(SYMBOL_PLACEHOLDER, symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metric;
    use crate::ChipFinError;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct Fixed(Vec<FinancialFact>);

    impl FactSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, symbol: &str) -> ChipFinResult<Vec<FinancialFact>> {
            Ok(self.0.iter().filter(|f| f.company == symbol).cloned().collect())
        }
    }

    struct Broken;

    impl FactSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn fetch(&self, _symbol: &str) -> ChipFinResult<Vec<FinancialFact>> {
            Err(ChipFinError::Source {
                source_name: "broken".into(),
                reason: "HTTP 503".into(),
            })
        }
    }

    #[test]
    fn test_failures_do_not_abort_collection() {
        let period = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        let fixed = Fixed(vec![
            FinancialFact::new("WDC", period, Metric::Revenue, dec!(1)),
            FinancialFact::new("MU", period, Metric::Revenue, dec!(2)),
        ]);
        let sources: Vec<Box<dyn FactSource>> = vec![Box::new(Broken), Box::new(fixed)];
        let companies = vec!["WDC".to_string(), "INTC".to_string(), "MU".to_string()];

        let report = collect(&sources, &companies, Duration::ZERO);

        assert_eq!(report.facts.len(), 2);
        assert_eq!(report.companies_with_data, vec!["WDC".to_string(), "MU".to_string()]);
        assert_eq!(report.source_failures.len(), 3);
        assert!(report.source_failures.iter().all(|f| f.reason.contains("HTTP 503")));
    }

    #[test]
    fn test_no_sources_yields_empty_report() {
        let report = collect(&[], &["TSM".to_string()], Duration::ZERO);
        assert!(report.facts.is_empty());
        assert!(report.companies_with_data.is_empty());
        assert!(report.source_failures.is_empty());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            resolve_path("data/{symbol}_quarterly.json", "TSM"),
            PathBuf::from("data/TSM_quarterly.json")
        );
        assert_eq!(resolve_path("facts.csv", "TSM"), PathBuf::from("facts.csv"));
    }
}
