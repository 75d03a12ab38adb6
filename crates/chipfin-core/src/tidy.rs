use chrono::NaiveDate;
use std::collections::HashMap;

use crate::model::{CompanyPeriodRecord, Metric, TidyRow};

/// Rows emitted per wide record.
pub const ROWS_PER_RECORD: usize = Metric::ALL.len();

/// Melt wide records into long format: one row per metric per record, absent
/// values included. A pure reshape, so `len(out) == len(records) * 6`.
pub fn to_tidy(records: &[CompanyPeriodRecord]) -> Vec<TidyRow> {
    let mut rows = Vec::with_capacity(records.len() * ROWS_PER_RECORD);
    for record in records {
        for metric in Metric::ALL {
            rows.push(TidyRow {
                company: record.company.clone(),
                period: record.period,
                metric,
                value: record.get(metric),
            });
        }
    }
    rows
}

/// Pivot long rows back into wide records, in first-seen (company, period)
/// order. A later row for the same metric replaces an earlier one.
pub fn from_tidy(rows: &[TidyRow]) -> Vec<CompanyPeriodRecord> {
    let mut records: Vec<CompanyPeriodRecord> = Vec::new();
    let mut index: HashMap<(&str, NaiveDate), usize> = HashMap::new();

    for row in rows {
        let slot = *index
            .entry((row.company.as_str(), row.period))
            .or_insert_with(|| {
                records.push(CompanyPeriodRecord::empty(&row.company, row.period));
                records.len() - 1
            });
        records[slot].set(row.metric, row.value);
    }
    records
}
