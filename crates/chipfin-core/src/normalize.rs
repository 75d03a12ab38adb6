use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::time::Instant;
use tracing::warn;

use crate::model::{CompanyPeriodRecord, DuplicatePolicy, FinancialFact, Metric};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple};
use crate::{ChipFinError, ChipFinResult};

/// Raw upstream figures are in currency units; records are in millions.
pub const UNITS_PER_MILLION: Decimal = dec!(1_000_000);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fold raw facts into one record per (company, period), in first-seen order.
///
/// Present values are divided by one million; absent and malformed values stay
/// absent. Inventory Turnover is derived from the converted COGS and Inventory.
/// Malformed values are logged and reported in `warnings`; they never abort the
/// run. Duplicate facts are resolved by `policy`.
pub fn normalize(
    facts: &[FinancialFact],
    policy: DuplicatePolicy,
) -> ChipFinResult<ComputationOutput<Vec<CompanyPeriodRecord>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut groups: Vec<FactGroup> = Vec::new();
    let mut index: HashMap<(&str, NaiveDate), usize> = HashMap::new();

    for fact in facts {
        let slot = *index
            .entry((fact.company.as_str(), fact.period))
            .or_insert_with(|| {
                groups.push(FactGroup::new(&fact.company, fact.period));
                groups.len() - 1
            });
        let group = &mut groups[slot];

        if fact.metric.is_derived() {
            let msg = format!(
                "{} {}: ignoring reported {}; it is derived from COGS and Inventory",
                fact.company, fact.period, fact.metric
            );
            warn!("{msg}");
            warnings.push(msg);
            continue;
        }

        let value = match &fact.value {
            None => None,
            Some(raw) => match raw.to_decimal() {
                Ok(v) => v,
                Err(reason) => {
                    let msg = format!(
                        "{} {} {}: malformed value treated as absent ({reason})",
                        fact.company, fact.period, fact.metric
                    );
                    warn!("{msg}");
                    warnings.push(msg);
                    None
                }
            },
        };

        // An absent value only fills a gap; a present one is never displaced
        // by it, whatever the policy.
        let conflicting = match group.values.get(&fact.metric) {
            Some(Some(_)) if value.is_none() => continue,
            Some(Some(_)) => true,
            _ => false,
        };
        if conflicting {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(ChipFinError::DuplicateFact {
                        company: fact.company.clone(),
                        period: fact.period,
                        metric: fact.metric,
                    });
                }
                DuplicatePolicy::FirstWriteWins => {
                    let msg = format!(
                        "{} {} {}: duplicate fact ignored, keeping the first",
                        fact.company, fact.period, fact.metric
                    );
                    warn!("{msg}");
                    warnings.push(msg);
                    continue;
                }
                DuplicatePolicy::LastWriteWins => {
                    let msg = format!(
                        "{} {} {}: duplicate fact overwrites the earlier one",
                        fact.company, fact.period, fact.metric
                    );
                    warn!("{msg}");
                    warnings.push(msg);
                }
            }
        }

        group.values.insert(fact.metric, value);
    }

    let records: Vec<CompanyPeriodRecord> = groups.into_iter().map(FactGroup::into_record).collect();

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "unit_divisor": UNITS_PER_MILLION.to_string(),
        "duplicate_policy": policy,
        "inventory_turnover": "COGS / Inventory; absent unless both present and Inventory != 0",
        "rounding": "none",
    });

    Ok(with_metadata(
        "Quarterly metric normalization (native units to millions, derived Inventory Turnover)",
        &assumptions,
        warnings,
        elapsed,
        records,
    ))
}

/// Cost of goods sold over inventory, both in the same units.
///
/// Absent unless both operands are present and inventory is non-zero.
pub fn inventory_turnover(cogs: Option<Money>, inventory: Option<Money>) -> Option<Multiple> {
    match (cogs, inventory) {
        (Some(c), Some(i)) if !i.is_zero() => c.checked_div(i),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct FactGroup {
    company: String,
    period: NaiveDate,
    /// Key present means a fact was seen, even if its value is absent.
    values: HashMap<Metric, Option<Decimal>>,
}

impl FactGroup {
    fn new(company: &str, period: NaiveDate) -> Self {
        Self {
            company: company.to_string(),
            period,
            values: HashMap::new(),
        }
    }

    fn into_record(self) -> CompanyPeriodRecord {
        let mut record = CompanyPeriodRecord::empty(self.company, self.period);
        for metric in Metric::RAW {
            let millions = self
                .values
                .get(&metric)
                .copied()
                .flatten()
                .map(|raw| raw / UNITS_PER_MILLION);
            record.set(metric, millions);
        }
        record.inventory_turnover =
            inventory_turnover(record.cost_of_goods_sold, record.inventory);
        record
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
