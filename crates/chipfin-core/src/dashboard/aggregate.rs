use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Metric, TidyRow};
use crate::normalize::inventory_turnover;
use crate::types::Multiple;

/// Decimal places kept in per-company summary statistics.
const SUMMARY_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAverage {
    pub metric: Metric,
    /// `None` when no row carries a value.
    pub mean: Option<Decimal>,
    /// Rows with a value.
    pub data_points: usize,
}

/// Headline figures across the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub average_inventory: MetricAverage,
    pub average_revenue: MetricAverage,
    pub average_cogs: MetricAverage,
    pub average_cash: MetricAverage,
    /// Mean COGS over mean Inventory, guarded like the per-quarter ratio.
    pub inventory_turnover: Option<Multiple>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAverage {
    pub company: String,
    pub metric: Metric,
    pub mean: Option<Decimal>,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub company: String,
    pub metric: Metric,
    pub count: usize,
    pub mean: Option<Decimal>,
    pub median: Option<Decimal>,
    /// Sample standard deviation (n - 1); needs two values.
    pub std_dev: Option<Decimal>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn key_metrics(rows: &[TidyRow]) -> KeyMetrics {
    let average_inventory = average(rows, Metric::Inventory);
    let average_revenue = average(rows, Metric::Revenue);
    let average_cogs = average(rows, Metric::CostOfGoodsSold);
    let average_cash = average(rows, Metric::CashOnHand);
    let inventory_turnover = inventory_turnover(average_cogs.mean, average_inventory.mean);

    KeyMetrics {
        average_inventory,
        average_revenue,
        average_cogs,
        average_cash,
        inventory_turnover,
    }
}

/// Mean of `metric` per company, companies in sorted order. Companies whose
/// rows are all absent are listed with no mean.
pub fn average_by_company(rows: &[TidyRow], metric: Metric) -> Vec<CompanyAverage> {
    by_company(rows, metric)
        .into_iter()
        .map(|(company, values)| CompanyAverage {
            company,
            metric,
            mean: mean(&values),
            data_points: values.len(),
        })
        .collect()
}

/// Count, mean, median, sample std, min and max of `metric` per company,
/// rounded to two decimal places.
pub fn summary_stats(rows: &[TidyRow], metric: Metric) -> Vec<CompanySummary> {
    by_company(rows, metric)
        .into_iter()
        .map(|(company, mut values)| {
            values.sort();
            let round = |v: Option<Decimal>| v.map(|d| d.round_dp(SUMMARY_DP));
            CompanySummary {
                company,
                metric,
                count: values.len(),
                mean: round(mean(&values)),
                median: round(median(&values)),
                std_dev: round(sample_std_dev(&values)),
                min: round(values.first().copied()),
                max: round(values.last().copied()),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn average(rows: &[TidyRow], metric: Metric) -> MetricAverage {
    let values: Vec<Decimal> = rows
        .iter()
        .filter(|r| r.metric == metric)
        .filter_map(|r| r.value)
        .collect();
    MetricAverage {
        metric,
        mean: mean(&values),
        data_points: values.len(),
    }
}

fn by_company(rows: &[TidyRow], metric: Metric) -> BTreeMap<String, Vec<Decimal>> {
    let mut groups: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.metric == metric) {
        let values = groups.entry(row.company.clone()).or_default();
        if let Some(v) = row.value {
            values.push(v);
        }
    }
    groups
}

pub(crate) fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    checked_sum(values.iter().copied())?.checked_div(Decimal::from(values.len()))
}

/// `None` instead of a panic when the total leaves `Decimal` range.
pub(crate) fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Expects sorted input.
fn median(sorted: &[Decimal]) -> Option<Decimal> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => sorted[n / 2 - 1]
            .checked_add(sorted[n / 2])
            .and_then(|s| s.checked_div(Decimal::TWO)),
    }
}

fn sample_std_dev(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq = values.iter().try_fold(Decimal::ZERO, |acc, v| {
        let d = v.checked_sub(m)?;
        acc.checked_add(d.checked_mul(d)?)
    })?;
    let variance = sum_sq.checked_div(Decimal::from(values.len() - 1))?;
    variance.sqrt()
}
