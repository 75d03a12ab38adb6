use chipfin_core::{
    normalize, to_tidy, CompanyPeriodRecord, DuplicatePolicy, FinancialFact, Metric, RawValue,
};
use chipfin_core::sources::read_facts_json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

// ===========================================================================
// Fixtures
// ===========================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Four companies, two quarters, with the gaps real statements have.
fn peer_group_facts() -> Vec<FinancialFact> {
    let q1 = date(2023, 3, 31);
    let q2 = date(2023, 6, 30);
    vec![
        FinancialFact::new("WDC", q1, Metric::Revenue, dec!(2_803_000_000)),
        FinancialFact::new("WDC", q1, Metric::CostOfGoodsSold, dec!(2_484_000_000)),
        FinancialFact::new("WDC", q1, Metric::GrossProfit, dec!(319_000_000)),
        FinancialFact::new("WDC", q1, Metric::Inventory, dec!(3_329_000_000)),
        FinancialFact::new("WDC", q1, Metric::CashOnHand, dec!(2_165_000_000)),
        FinancialFact::new("MU", q2, Metric::Revenue, dec!(3_752_000_000)),
        FinancialFact::new("MU", q2, Metric::CostOfGoodsSold, dec!(4_460_000_000)),
        FinancialFact::new("MU", q2, Metric::Inventory, dec!(8_238_000_000)),
        FinancialFact::missing("MU", q2, Metric::CashOnHand),
        FinancialFact::new("TSM", q1, Metric::Revenue, dec!(508_633_000_000)),
        FinancialFact::new("TSM", q1, Metric::Inventory, Decimal::ZERO),
        FinancialFact::new("TSM", q1, Metric::CostOfGoodsSold, dec!(223_000_000_000)),
        FinancialFact::new("INTC", q2, Metric::Revenue, "not reported"),
        FinancialFact::missing("INTC", q2, Metric::Inventory),
    ]
}

fn find<'a>(records: &'a [CompanyPeriodRecord], company: &str) -> &'a CompanyPeriodRecord {
    records.iter().find(|r| r.company == company).unwrap()
}

// ===========================================================================
// Unit conversion
// ===========================================================================

#[test]
fn test_every_present_value_is_divided_by_one_million() {
    let facts = peer_group_facts();
    let out = normalize(&facts, DuplicatePolicy::default()).unwrap();

    for fact in &facts {
        let Some(RawValue::Number(raw)) = &fact.value else {
            continue;
        };
        let record = out
            .result
            .iter()
            .find(|r| r.company == fact.company && r.period == fact.period)
            .unwrap();
        let millions = record.get(fact.metric).unwrap();
        let diff = (millions - raw / dec!(1_000_000)).abs();
        assert!(diff <= dec!(0.000000001), "{} {}: {millions}", fact.company, fact.metric);
    }
}

#[test]
fn test_absence_is_never_coerced_to_zero() {
    let out = normalize(&peer_group_facts(), DuplicatePolicy::default()).unwrap();
    let mu = find(&out.result, "MU");
    assert_eq!(mu.cash_on_hand, None);
    assert_eq!(mu.gross_profit, None);
    let intc = find(&out.result, "INTC");
    assert_eq!(intc.revenue, None);
    assert_eq!(intc.inventory, None);
}

// ===========================================================================
// Inventory Turnover guard
// ===========================================================================

#[test]
fn test_turnover_present_only_when_guard_holds() {
    let out = normalize(&peer_group_facts(), DuplicatePolicy::default()).unwrap();
    for record in &out.result {
        let guard = matches!(
            (record.cost_of_goods_sold, record.inventory),
            (Some(_), Some(inv)) if !inv.is_zero()
        );
        assert_eq!(
            record.inventory_turnover.is_some(),
            guard,
            "{} turnover presence",
            record.company
        );
    }
}

#[test]
fn test_turnover_values() {
    let out = normalize(&peer_group_facts(), DuplicatePolicy::default()).unwrap();
    let wdc = find(&out.result, "WDC");
    assert_eq!(wdc.inventory_turnover, Some(dec!(2484) / dec!(3329)));
    // TSM reports zero inventory
    assert_eq!(find(&out.result, "TSM").inventory_turnover, None);
}

// ===========================================================================
// Grouping and reshape
// ===========================================================================

#[test]
fn test_one_record_per_company_period() {
    let facts = peer_group_facts();
    let out = normalize(&facts, DuplicatePolicy::default()).unwrap();
    let distinct: HashSet<(&str, NaiveDate)> =
        facts.iter().map(|f| (f.company.as_str(), f.period)).collect();
    assert_eq!(out.result.len(), distinct.len());
}

#[test]
fn test_tidy_length_is_six_per_distinct_pair() {
    let facts = peer_group_facts();
    let distinct: HashSet<(&str, NaiveDate)> =
        facts.iter().map(|f| (f.company.as_str(), f.period)).collect();
    let records = normalize(&facts, DuplicatePolicy::default()).unwrap().result;
    assert_eq!(to_tidy(&records).len(), 6 * distinct.len());
}

#[test]
fn test_to_tidy_called_twice_is_identical() {
    let records = normalize(&peer_group_facts(), DuplicatePolicy::default())
        .unwrap()
        .result;
    assert_eq!(to_tidy(&records), to_tidy(&records));
}

#[test]
fn test_scenario_wdc_quarter() {
    let q = date(2023, 3, 31);
    let facts = vec![
        FinancialFact::new("WDC", q, Metric::Revenue, dec!(2_000_000_000)),
        FinancialFact::new("WDC", q, Metric::CostOfGoodsSold, dec!(1_500_000_000)),
        FinancialFact::new("WDC", q, Metric::Inventory, dec!(500_000_000)),
    ];
    let records = normalize(&facts, DuplicatePolicy::default()).unwrap().result;
    let mut expected = CompanyPeriodRecord::empty("WDC", q);
    expected.revenue = Some(dec!(2000));
    expected.cost_of_goods_sold = Some(dec!(1500));
    expected.inventory = Some(dec!(500));
    expected.inventory_turnover = Some(dec!(3.0));
    assert_eq!(records, vec![expected]);
}

#[test]
fn test_scenario_group_with_no_values() {
    let q = date(2023, 9, 30);
    let facts: Vec<FinancialFact> = Metric::RAW
        .iter()
        .map(|&m| FinancialFact::missing("INTC", q, m))
        .collect();
    let records = normalize(&facts, DuplicatePolicy::default()).unwrap().result;
    assert_eq!(records, vec![CompanyPeriodRecord::empty("INTC", q)]);

    let rows = to_tidy(&records);
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.value.is_none()));
}

// ===========================================================================
// Error taxonomy
// ===========================================================================

#[test]
fn test_malformed_value_does_not_stop_other_groups() {
    let out = normalize(&peer_group_facts(), DuplicatePolicy::default()).unwrap();
    assert_eq!(out.result.len(), 4);
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].starts_with("INTC"));
}

#[test]
fn test_non_numeric_json_values_are_warned_and_absent() {
    let json = r#"[
        {"company": "MU", "period": "2023-06-01", "metric": "Revenue", "value": 3752000000},
        {"company": "MU", "period": "2023-06-01", "metric": "Inventory", "value": true},
        {"company": "MU", "period": "2023-06-01", "metric": "Cost Of Goods Sold", "value": [1, 2]}
    ]"#;
    let facts = read_facts_json(json.as_bytes()).unwrap();
    let out = normalize(&facts, DuplicatePolicy::default()).unwrap();

    let mu = &out.result[0];
    assert_eq!(mu.revenue, Some(dec!(3752)));
    assert_eq!(mu.inventory, None);
    assert_eq!(mu.cost_of_goods_sold, None);
    assert_eq!(mu.inventory_turnover, None);
    assert_eq!(out.warnings.len(), 2);
}

#[test]
fn test_envelope_describes_the_computation() {
    let out = normalize(&peer_group_facts(), DuplicatePolicy::FirstWriteWins).unwrap();
    assert!(!out.methodology.is_empty());
    assert_eq!(out.assumptions["duplicate_policy"], "first_write_wins");
    assert_eq!(out.assumptions["unit_divisor"], "1000000");
}
