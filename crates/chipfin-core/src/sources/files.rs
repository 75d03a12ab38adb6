use std::fs::File;
use std::io::{BufReader, Read};
use tracing::warn;

use super::{resolve_path, FactSource};
use crate::artifact::{parse_date, reader_for, required_column};
use crate::model::{FinancialFact, Metric, RawValue};
use crate::{ChipFinError, ChipFinResult};

/// Facts stored as a JSON array of `FinancialFact`.
#[derive(Debug, Clone)]
pub struct FactsJsonSource {
    path: String,
}

impl FactsJsonSource {
    /// `path` may contain `{symbol}`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl FactSource for FactsJsonSource {
    fn name(&self) -> &str {
        "facts_json"
    }

    fn fetch(&self, symbol: &str) -> ChipFinResult<Vec<FinancialFact>> {
        let path = resolve_path(&self.path, symbol);
        let failure = |reason: String| ChipFinError::Source {
            source_name: self.name().to_string(),
            reason: format!("{}: {reason}", path.display()),
        };
        let file = File::open(&path).map_err(|e| failure(e.to_string()))?;
        let facts = read_facts_json(BufReader::new(file)).map_err(|e| failure(e.to_string()))?;
        Ok(only_company(facts, symbol))
    }
}

/// Facts stored as CSV with `Company, Date, Metric, Value` columns.
#[derive(Debug, Clone)]
pub struct FactsCsvSource {
    path: String,
}

impl FactsCsvSource {
    /// `path` may contain `{symbol}`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl FactSource for FactsCsvSource {
    fn name(&self) -> &str {
        "facts_csv"
    }

    fn fetch(&self, symbol: &str) -> ChipFinResult<Vec<FinancialFact>> {
        let path = resolve_path(&self.path, symbol);
        let failure = |reason: String| ChipFinError::Source {
            source_name: self.name().to_string(),
            reason: format!("{}: {reason}", path.display()),
        };
        let file = File::open(&path).map_err(|e| failure(e.to_string()))?;
        let facts = read_facts_csv(file).map_err(|e| failure(e.to_string()))?;
        Ok(only_company(facts, symbol))
    }
}

pub fn read_facts_json<R: Read>(reader: R) -> ChipFinResult<Vec<FinancialFact>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Read facts from CSV. Values are kept as text so that malformed cells reach
/// the normalizer and get reported there; rows with an unreadable company,
/// date or metric are skipped with a warning.
pub fn read_facts_csv<R: Read>(reader: R) -> ChipFinResult<Vec<FinancialFact>> {
    let mut rdr = reader_for(reader);
    let headers = rdr.headers()?.clone();
    let company_col = required_column(&headers, "Company")?;
    let date_col = required_column(&headers, "Date")?;
    let metric_col = required_column(&headers, "Metric")?;
    let value_col = required_column(&headers, "Value")?;

    let mut facts = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let line_no = line + 2;

        let company = record.get(company_col).unwrap_or_default();
        if company.is_empty() {
            warn!(line = line_no, "skipping fact without a company");
            continue;
        }
        let period = match parse_date(record.get(date_col).unwrap_or_default()) {
            Ok(d) => d,
            Err(e) => {
                warn!(line = line_no, "skipping fact: {e}");
                continue;
            }
        };
        let metric: Metric = match record.get(metric_col).unwrap_or_default().parse() {
            Ok(m) => m,
            Err(e) => {
                warn!(line = line_no, "skipping fact: {e}");
                continue;
            }
        };
        let value = record
            .get(value_col)
            .filter(|cell| !cell.is_empty())
            .map(|cell| RawValue::Text(cell.to_string()));

        facts.push(FinancialFact {
            company: company.to_string(),
            period,
            metric,
            value,
        });
    }
    Ok(facts)
}

fn only_company(facts: Vec<FinancialFact>, symbol: &str) -> Vec<FinancialFact> {
    facts
        .into_iter()
        .filter(|f| f.company.eq_ignore_ascii_case(symbol))
        .collect()
}
