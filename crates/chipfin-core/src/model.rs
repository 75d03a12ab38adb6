use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{Money, Multiple};
use crate::ChipFinError;

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// The closed set of metrics tracked per company and quarter.
///
/// Serialized by display name (`"Cost Of Goods Sold"`), which is also the
/// column name in the wide artifact and the `Metric` value in the tidy one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Metric {
    Revenue,
    CostOfGoodsSold,
    GrossProfit,
    Inventory,
    CashOnHand,
    InventoryTurnover,
}

/// Which upstream statement a raw metric is reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    IncomeStatement,
    BalanceSheet,
}

impl Metric {
    /// Raw metrics, as reported upstream.
    pub const RAW: [Metric; 5] = [
        Metric::Revenue,
        Metric::CostOfGoodsSold,
        Metric::GrossProfit,
        Metric::Inventory,
        Metric::CashOnHand,
    ];

    /// Every metric, in artifact column order.
    pub const ALL: [Metric; 6] = [
        Metric::Revenue,
        Metric::CostOfGoodsSold,
        Metric::GrossProfit,
        Metric::Inventory,
        Metric::CashOnHand,
        Metric::InventoryTurnover,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::CostOfGoodsSold => "Cost Of Goods Sold",
            Metric::GrossProfit => "Gross Profit",
            Metric::Inventory => "Inventory",
            Metric::CashOnHand => "Cash On Hand",
            Metric::InventoryTurnover => "Inventory Turnover",
        }
    }

    /// True for metrics computed from other metrics rather than reported.
    pub fn is_derived(self) -> bool {
        matches!(self, Metric::InventoryTurnover)
    }

    /// Statement the metric is read from; `None` for derived metrics.
    pub fn statement(self) -> Option<Statement> {
        match self {
            Metric::Revenue | Metric::CostOfGoodsSold | Metric::GrossProfit => {
                Some(Statement::IncomeStatement)
            }
            Metric::Inventory | Metric::CashOnHand => Some(Statement::BalanceSheet),
            Metric::InventoryTurnover => None,
        }
    }

    /// Upstream statement row labels, most preferred first.
    pub fn statement_labels(self) -> &'static [&'static str] {
        match self {
            Metric::Revenue => &["Total Revenue", "Revenue"],
            Metric::CostOfGoodsSold => &["Cost Of Revenue", "Cost Of Goods Sold"],
            Metric::GrossProfit => &["Gross Profit"],
            Metric::Inventory => &["Inventory"],
            Metric::CashOnHand => &["Cash And Cash Equivalents", "Cash On Hand"],
            Metric::InventoryTurnover => &[],
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ChipFinError;

    /// Accepts display names, snake_case names and upstream statement labels,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .trim()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        match key.as_str() {
            "revenue" | "total revenue" => Ok(Metric::Revenue),
            "cost of goods sold" | "cost of revenue" | "cogs" => Ok(Metric::CostOfGoodsSold),
            "gross profit" => Ok(Metric::GrossProfit),
            "inventory" => Ok(Metric::Inventory),
            "cash on hand" | "cash and cash equivalents" | "cash" => Ok(Metric::CashOnHand),
            "inventory turnover" => Ok(Metric::InventoryTurnover),
            _ => Err(ChipFinError::InvalidInput {
                field: "metric".into(),
                reason: format!("unknown metric '{}'", s.trim()),
            }),
        }
    }
}

impl From<Metric> for &'static str {
    fn from(metric: Metric) -> Self {
        metric.name()
    }
}

impl TryFrom<String> for Metric {
    type Error = ChipFinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Raw facts
// ---------------------------------------------------------------------------

/// Text cells that mean "no value" rather than "bad value".
const MISSING_MARKERS: [&str; 6] = ["nan", "none", "null", "n/a", "na", "-"];

/// A raw fact value as received from a source: a number, text that may or
/// may not hold one, or any other JSON value, which is always malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(Decimal),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// Interpret the value as a number.
    ///
    /// `Ok(None)` for missing-data markers, `Err` with a reason for text that
    /// is not numeric and for booleans, arrays and objects.
    pub fn to_decimal(&self) -> Result<Option<Decimal>, String> {
        match self {
            RawValue::Number(d) => Ok(Some(*d)),
            RawValue::Text(s) => parse_numeric_text(s),
            RawValue::Other(v) => Err(format!("{v} is not a number")),
        }
    }
}

impl From<Decimal> for RawValue {
    fn from(value: Decimal) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

pub(crate) fn parse_numeric_text(text: &str) -> Result<Option<Decimal>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|m| trimmed.eq_ignore_ascii_case(m))
    {
        return Ok(None);
    }

    let cleaned = trimmed.replace(',', "");
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map(Some)
        .map_err(|_| format!("'{trimmed}' is not a number"))
}

/// One reported figure for a company in a quarter, in native currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialFact {
    pub company: String,
    pub period: NaiveDate,
    pub metric: Metric,
    #[serde(default)]
    pub value: Option<RawValue>,
}

impl FinancialFact {
    pub fn new(
        company: impl Into<String>,
        period: NaiveDate,
        metric: Metric,
        value: impl Into<RawValue>,
    ) -> Self {
        Self {
            company: company.into(),
            period,
            metric,
            value: Some(value.into()),
        }
    }

    /// A fact known to exist but carrying no value.
    pub fn missing(company: impl Into<String>, period: NaiveDate, metric: Metric) -> Self {
        Self {
            company: company.into(),
            period,
            metric,
            value: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Wide and tidy rows
// ---------------------------------------------------------------------------

/// One company-quarter with every figure in millions plus derived ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPeriodRecord {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Date")]
    pub period: NaiveDate,
    #[serde(rename = "Revenue")]
    pub revenue: Option<Money>,
    #[serde(rename = "Cost Of Goods Sold")]
    pub cost_of_goods_sold: Option<Money>,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: Option<Money>,
    #[serde(rename = "Inventory")]
    pub inventory: Option<Money>,
    #[serde(rename = "Cash On Hand")]
    pub cash_on_hand: Option<Money>,
    #[serde(rename = "Inventory Turnover")]
    pub inventory_turnover: Option<Multiple>,
}

impl CompanyPeriodRecord {
    /// A record with identifiers only; every metric absent.
    pub fn empty(company: impl Into<String>, period: NaiveDate) -> Self {
        Self {
            company: company.into(),
            period,
            revenue: None,
            cost_of_goods_sold: None,
            gross_profit: None,
            inventory: None,
            cash_on_hand: None,
            inventory_turnover: None,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::CostOfGoodsSold => self.cost_of_goods_sold,
            Metric::GrossProfit => self.gross_profit,
            Metric::Inventory => self.inventory,
            Metric::CashOnHand => self.cash_on_hand,
            Metric::InventoryTurnover => self.inventory_turnover,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<Decimal>) {
        let slot = match metric {
            Metric::Revenue => &mut self.revenue,
            Metric::CostOfGoodsSold => &mut self.cost_of_goods_sold,
            Metric::GrossProfit => &mut self.gross_profit,
            Metric::Inventory => &mut self.inventory,
            Metric::CashOnHand => &mut self.cash_on_hand,
            Metric::InventoryTurnover => &mut self.inventory_turnover,
        };
        *slot = value;
    }
}

/// One (company, period, metric) observation in long format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRow {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Date")]
    pub period: NaiveDate,
    #[serde(rename = "Metric")]
    pub metric: Metric,
    #[serde(rename = "Value")]
    pub value: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Duplicate handling
// ---------------------------------------------------------------------------

/// What to do when two facts share (company, period, metric).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the later fact, warn about the overwrite.
    #[default]
    LastWriteWins,
    /// Keep the earlier fact, warn about the ignored one.
    FirstWriteWins,
    /// Fail the normalization.
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_metric_parses_display_and_statement_labels() {
        assert_eq!("Cost Of Goods Sold".parse::<Metric>().unwrap(), Metric::CostOfGoodsSold);
        assert_eq!("cost_of_goods_sold".parse::<Metric>().unwrap(), Metric::CostOfGoodsSold);
        assert_eq!("Cost Of Revenue".parse::<Metric>().unwrap(), Metric::CostOfGoodsSold);
        assert_eq!("Total Revenue".parse::<Metric>().unwrap(), Metric::Revenue);
        assert_eq!(
            "  Cash And Cash Equivalents ".parse::<Metric>().unwrap(),
            Metric::CashOnHand
        );
        assert_eq!("inventory-turnover".parse::<Metric>().unwrap(), Metric::InventoryTurnover);
    }

    #[test]
    fn test_unknown_metric_rejected() {
        match "Operating Income".parse::<Metric>() {
            Err(ChipFinError::InvalidInput { field, .. }) => assert_eq!(field, "metric"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_metric_serializes_by_display_name() {
        let json = serde_json::to_string(&Metric::CashOnHand).unwrap();
        assert_eq!(json, "\"Cash On Hand\"");
        let back: Metric = serde_json::from_str("\"Gross Profit\"").unwrap();
        assert_eq!(back, Metric::GrossProfit);
    }

    #[test]
    fn test_statement_labels_round_trip_through_parse() {
        for metric in Metric::RAW {
            for label in metric.statement_labels() {
                assert_eq!(label.parse::<Metric>().unwrap(), metric);
            }
        }
    }

    #[test]
    fn test_raw_value_text_parsing() {
        assert_eq!(RawValue::from("2000000000").to_decimal(), Ok(Some(dec!(2000000000))));
        assert_eq!(RawValue::from("1,500,000").to_decimal(), Ok(Some(dec!(1500000))));
        assert_eq!(RawValue::from("2.5e9").to_decimal(), Ok(Some(dec!(2500000000))));
        assert_eq!(RawValue::from("NaN").to_decimal(), Ok(None));
        assert_eq!(RawValue::from("").to_decimal(), Ok(None));
        assert!(RawValue::from("twelve").to_decimal().is_err());
    }

    #[test]
    fn test_raw_value_deserializes_numbers_and_text() {
        let facts: Vec<FinancialFact> = serde_json::from_str(
            r#"[
                {"company": "MU", "period": "2023-06-01", "metric": "Revenue", "value": 3752000000},
                {"company": "MU", "period": "2023-06-01", "metric": "Inventory", "value": "n/a"},
                {"company": "MU", "period": "2023-06-01", "metric": "Cash On Hand"}
            ]"#,
        )
        .unwrap();
        assert_eq!(facts[0].value, Some(RawValue::Number(dec!(3752000000))));
        assert_eq!(facts[1].value, Some(RawValue::Text("n/a".into())));
        assert_eq!(facts[2].value, None);
    }

    #[test]
    fn test_record_get_set() {
        let period = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        let mut record = CompanyPeriodRecord::empty("WDC", period);
        for metric in Metric::ALL {
            assert_eq!(record.get(metric), None);
        }
        record.set(Metric::Inventory, Some(dec!(500)));
        assert_eq!(record.inventory, Some(dec!(500)));
        assert_eq!(record.get(Metric::Inventory), Some(dec!(500)));
    }
}
