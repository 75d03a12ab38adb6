use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::aggregate::checked_sum;
use crate::model::{Metric, TidyRow};
use crate::types::Rate;

/// Decimal places for growth percentages.
const GROWTH_DP: u32 = 2;

/// Decimal places for correlation coefficients.
const CORRELATION_DP: u32 = 6;

/// Quarter-over-quarter change for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub company: String,
    pub period: NaiveDate,
    pub metric: Metric,
    pub value: Decimal,
    pub previous: Decimal,
    /// Percent, e.g. 12.5 for +12.5%.
    pub growth_pct: Rate,
}

/// Pairwise Pearson correlation of one metric between companies, over the
/// dates both companies report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub metric: Metric,
    pub companies: Vec<String>,
    /// `matrix[i][j]` correlates `companies[i]` with `companies[j]`.
    pub matrix: Vec<Vec<Option<Decimal>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<Decimal> {
        let i = self.companies.iter().position(|c| c == a)?;
        let j = self.companies.iter().position(|c| c == b)?;
        self.matrix[i][j]
    }
}

/// Percent change between consecutive present values per company, companies
/// sorted, periods ascending. Absent values are skipped, so the change is
/// measured against the last known value. A zero previous value, or a change
/// too large for `Decimal`, produces no point.
pub fn growth_rates(rows: &[TidyRow], metric: Metric) -> Vec<GrowthPoint> {
    let mut points = Vec::new();
    for (company, series) in pivot(rows, metric) {
        let series: Vec<(NaiveDate, Decimal)> = series.into_iter().collect();
        for pair in series.windows(2) {
            let (_, previous) = pair[0];
            let (period, value) = pair[1];
            let Some(pct) = value
                .checked_sub(previous)
                .and_then(|change| change.checked_div(previous))
                .and_then(|ratio| ratio.checked_mul(dec!(100)))
            else {
                continue;
            };
            points.push(GrowthPoint {
                company: company.clone(),
                period,
                metric,
                value,
                previous,
                growth_pct: pct.round_dp(GROWTH_DP),
            });
        }
    }
    points
}

pub fn correlation(rows: &[TidyRow], metric: Metric) -> CorrelationMatrix {
    let table = pivot(rows, metric);
    let companies: Vec<String> = table.keys().cloned().collect();
    let series: Vec<&BTreeMap<NaiveDate, Decimal>> = table.values().collect();

    let matrix = series
        .iter()
        .map(|a| series.iter().map(|b| pearson(a, b)).collect())
        .collect();

    CorrelationMatrix {
        metric,
        companies,
        matrix,
    }
}

/// Company -> date -> value for one metric; absent values dropped, a later
/// row for the same date wins.
fn pivot(rows: &[TidyRow], metric: Metric) -> BTreeMap<String, BTreeMap<NaiveDate, Decimal>> {
    let mut table: BTreeMap<String, BTreeMap<NaiveDate, Decimal>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.metric == metric) {
        if let Some(v) = row.value {
            table
                .entry(row.company.clone())
                .or_default()
                .insert(row.period, v);
        }
    }
    table
}

fn pearson(
    xs: &BTreeMap<NaiveDate, Decimal>,
    ys: &BTreeMap<NaiveDate, Decimal>,
) -> Option<Decimal> {
    let pairs: Vec<(Decimal, Decimal)> = xs
        .iter()
        .filter_map(|(d, x)| ys.get(d).map(|y| (*x, *y)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = Decimal::from(pairs.len());
    let mean_x = checked_sum(pairs.iter().map(|p| p.0))?.checked_div(n)?;
    let mean_y = checked_sum(pairs.iter().map(|p| p.1))?.checked_div(n)?;

    let mut cov = Decimal::ZERO;
    let mut var_x = Decimal::ZERO;
    let mut var_y = Decimal::ZERO;
    for (x, y) in &pairs {
        let dx = x.checked_sub(mean_x)?;
        let dy = y.checked_sub(mean_y)?;
        cov = cov.checked_add(dx.checked_mul(dy)?)?;
        var_x = var_x.checked_add(dx.checked_mul(dx)?)?;
        var_y = var_y.checked_add(dy.checked_mul(dy)?)?;
    }

    let denominator = var_x.sqrt()?.checked_mul(var_y.sqrt()?)?;
    cov.checked_div(denominator)
        .map(|r| r.round_dp(CORRELATION_DP))
}
