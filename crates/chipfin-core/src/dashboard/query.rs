use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Metric, TidyRow};

/// Filter over tidy rows. Every unset criterion matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TidyQuery {
    /// Company symbols, compared case-insensitively.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companies: Vec<String>,
    /// Inclusive lower date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
    /// Case-insensitive substring of the company, metric name, ISO date or
    /// value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TidyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn company(mut self, symbol: impl Into<String>) -> Self {
        self.companies.push(symbol.into());
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = (!term.trim().is_empty()).then_some(term);
        self
    }

    pub fn matches(&self, row: &TidyRow) -> bool {
        if !self.companies.is_empty()
            && !self
                .companies
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&row.company))
        {
            return false;
        }
        if !self.metrics.is_empty() && !self.metrics.contains(&row.metric) {
            return false;
        }
        if self.from.is_some_and(|from| row.period < from) {
            return false;
        }
        if self.to.is_some_and(|to| row.period > to) {
            return false;
        }
        match &self.search {
            Some(term) => search_matches(row, term),
            None => true,
        }
    }

    pub fn apply(&self, rows: &[TidyRow]) -> Vec<TidyRow> {
        rows.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

fn search_matches(row: &TidyRow, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    let value = row.value.map(|v| v.to_string()).unwrap_or_default();
    [
        row.company.to_lowercase(),
        row.metric.name().to_lowercase(),
        row.period.to_string(),
        value,
    ]
    .iter()
    .any(|field| field.contains(&needle))
}

/// Distinct companies in first-seen order.
pub fn companies(rows: &[TidyRow]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        if !seen.contains(&row.company) {
            seen.push(row.company.clone());
        }
    }
    seen
}

/// Earliest and latest period, `None` for no rows.
pub fn date_bounds(rows: &[TidyRow]) -> Option<(NaiveDate, NaiveDate)> {
    let min = rows.iter().map(|r| r.period).min()?;
    let max = rows.iter().map(|r| r.period).max()?;
    Some((min, max))
}
