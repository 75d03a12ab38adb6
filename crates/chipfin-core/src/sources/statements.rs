use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use tracing::warn;

use super::{resolve_path, FactSource};
use crate::artifact::parse_date;
use crate::model::{FinancialFact, Metric, RawValue, Statement};
use crate::{ChipFinError, ChipFinResult};

/// Statement rows keyed by label, then by period-end date.
pub type StatementTable = BTreeMap<String, BTreeMap<String, Option<RawValue>>>;

/// Quarterly statements for one company, laid out the way the upstream
/// financial-data provider reports them:
///
/// ```json
/// {
///   "income_statement": { "Total Revenue": { "2023-03-31": 2803000000 } },
///   "balance_sheet":    { "Inventory":     { "2023-03-31": 3329000000 } }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementDocument {
    #[serde(default)]
    pub income_statement: StatementTable,
    #[serde(default)]
    pub balance_sheet: StatementTable,
}

impl StatementDocument {
    /// Flatten the statements into facts for `symbol`.
    ///
    /// Periods are the income statement's dates. Every period yields one fact
    /// per raw metric, absent where the statement has no row or no cell, so a
    /// sparse period still becomes a record. Both statements must be present;
    /// otherwise nothing is returned.
    pub fn to_facts(&self, symbol: &str) -> Vec<FinancialFact> {
        if self.income_statement.is_empty() || self.balance_sheet.is_empty() {
            return Vec::new();
        }

        let periods: BTreeSet<NaiveDate> = self
            .income_statement
            .values()
            .flat_map(|row| row.keys())
            .filter_map(|cell| match parse_date(cell) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!(company = symbol, "skipping statement column: {e}");
                    None
                }
            })
            .collect();

        let rows: HashMap<Metric, BTreeMap<NaiveDate, Option<RawValue>>> = Metric::RAW
            .iter()
            .filter_map(|&metric| self.row_for(metric).map(|row| (metric, dated(row))))
            .collect();

        let mut facts = Vec::with_capacity(periods.len() * Metric::RAW.len());
        for period in periods {
            for metric in Metric::RAW {
                let value = rows
                    .get(&metric)
                    .and_then(|row| row.get(&period))
                    .cloned()
                    .flatten();
                facts.push(FinancialFact {
                    company: symbol.to_string(),
                    period,
                    metric,
                    value,
                });
            }
        }
        facts
    }

    fn row_for(&self, metric: Metric) -> Option<&BTreeMap<String, Option<RawValue>>> {
        let table = match metric.statement()? {
            Statement::IncomeStatement => &self.income_statement,
            Statement::BalanceSheet => &self.balance_sheet,
        };
        metric
            .statement_labels()
            .iter()
            .find_map(|label| table.get(*label))
    }
}

fn dated(row: &BTreeMap<String, Option<RawValue>>) -> BTreeMap<NaiveDate, Option<RawValue>> {
    row.iter()
        .filter_map(|(cell, value)| parse_date(cell).ok().map(|d| (d, value.clone())))
        .collect()
}

/// One statement document per company, e.g. `data/{symbol}_quarterly.json`.
#[derive(Debug, Clone)]
pub struct StatementSource {
    path: String,
}

impl StatementSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl FactSource for StatementSource {
    fn name(&self) -> &str {
        "statements"
    }

    fn fetch(&self, symbol: &str) -> ChipFinResult<Vec<FinancialFact>> {
        let path = resolve_path(&self.path, symbol);
        let failure = |reason: String| ChipFinError::Source {
            source_name: self.name().to_string(),
            reason: format!("{}: {reason}", path.display()),
        };
        let file = File::open(&path).map_err(|e| failure(e.to_string()))?;
        let doc: StatementDocument =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| failure(e.to_string()))?;
        Ok(doc.to_facts(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn document() -> StatementDocument {
        serde_json::from_str(
            r#"{
                "income_statement": {
                    "Total Revenue":   {"2023-03-31": 2803000000, "2023-06-30 00:00:00": 2672000000},
                    "Cost Of Revenue": {"2023-03-31": 2484000000, "2023-06-30 00:00:00": null},
                    "Operating Income": {"2023-03-31": -520000000}
                },
                "balance_sheet": {
                    "Inventory": {"2023-03-31": 3329000000, "2023-06-30": 3138000000},
                    "Cash And Cash Equivalents": {"2023-03-31": "2,165,000,000"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_every_period_gets_every_raw_metric() {
        let facts = document().to_facts("WDC");
        assert_eq!(facts.len(), 2 * Metric::RAW.len());
        assert!(facts.iter().all(|f| f.company == "WDC"));
    }

    #[test]
    fn test_labels_map_to_metrics() {
        let facts = document().to_facts("WDC");
        let q1 = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        let get = |metric: Metric| {
            facts
                .iter()
                .find(|f| f.period == q1 && f.metric == metric)
                .and_then(|f| f.value.clone())
        };
        assert_eq!(get(Metric::Revenue), Some(RawValue::Number(dec!(2803000000))));
        assert_eq!(get(Metric::CostOfGoodsSold), Some(RawValue::Number(dec!(2484000000))));
        assert_eq!(get(Metric::GrossProfit), None);
        assert_eq!(get(Metric::CashOnHand), Some(RawValue::Text("2,165,000,000".into())));
    }

    #[test]
    fn test_balance_sheet_dates_match_across_formats() {
        let facts = document().to_facts("WDC");
        let q2 = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        let inventory = facts
            .iter()
            .find(|f| f.period == q2 && f.metric == Metric::Inventory)
            .unwrap();
        assert_eq!(inventory.value, Some(RawValue::Number(dec!(3138000000))));
        let cogs = facts
            .iter()
            .find(|f| f.period == q2 && f.metric == Metric::CostOfGoodsSold)
            .unwrap();
        assert_eq!(cogs.value, None);
    }

    #[test]
    fn test_missing_balance_sheet_yields_nothing() {
        let mut doc = document();
        doc.balance_sheet.clear();
        assert!(doc.to_facts("WDC").is_empty());
    }
}
