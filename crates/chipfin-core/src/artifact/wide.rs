use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

use super::{artifact_error, coerce_value, column, parse_date, reader_for, required_column};
use crate::model::{CompanyPeriodRecord, Metric};
use crate::normalize::inventory_turnover;
use crate::ChipFinResult;

pub const WIDE_HEADERS: [&str; 8] = [
    "Company",
    "Date",
    "Revenue",
    "Cost Of Goods Sold",
    "Gross Profit",
    "Inventory",
    "Cash On Hand",
    "Inventory Turnover",
];

/// Write wide records as CSV. The header row is written even for no records.
pub fn write_wide<W: Write>(writer: W, records: &[CompanyPeriodRecord]) -> ChipFinResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(WIDE_HEADERS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_wide_file(path: &Path, records: &[CompanyPeriodRecord]) -> ChipFinResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| artifact_error(path, e))?;
    }
    let file = File::create(path).map_err(|e| artifact_error(path, e))?;
    write_wide(file, records).map_err(|e| artifact_error(path, e))
}

pub fn read_wide<R: Read>(reader: R) -> ChipFinResult<Vec<CompanyPeriodRecord>> {
    let mut rdr = reader_for(reader);
    let headers = rdr.headers()?.clone();
    records_from_reader(&mut rdr, &headers)
}

pub fn read_wide_file(path: &Path) -> ChipFinResult<Vec<CompanyPeriodRecord>> {
    let file = File::open(path).map_err(|e| artifact_error(path, e))?;
    read_wide(file).map_err(|e| artifact_error(path, e))
}

pub(super) fn records_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    headers: &csv::StringRecord,
) -> ChipFinResult<Vec<CompanyPeriodRecord>> {
    let company_col = required_column(headers, "Company")?;
    let date_col = required_column(headers, "Date")?;
    let metric_cols: Vec<(Metric, Option<usize>)> = Metric::ALL
        .iter()
        .map(|&m| (m, column(headers, m.name())))
        .collect();
    let turnover_reported = column(headers, Metric::InventoryTurnover.name()).is_some();

    let mut records = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let row = result?;
        // Header is line 1
        let line_no = line + 2;

        let company = row.get(company_col).unwrap_or_default();
        if company.is_empty() {
            warn!(line = line_no, "skipping wide row without a company");
            continue;
        }
        let period = match parse_date(row.get(date_col).unwrap_or_default()) {
            Ok(d) => d,
            Err(e) => {
                warn!(line = line_no, "skipping wide row: {e}");
                continue;
            }
        };

        let mut record = CompanyPeriodRecord::empty(company, period);
        for (metric, col) in &metric_cols {
            let value = col.and_then(|i| row.get(i)).and_then(coerce_value);
            record.set(*metric, value);
        }
        if !turnover_reported {
            record.inventory_turnover =
                inventory_turnover(record.cost_of_goods_sold, record.inventory);
        }
        records.push(record);
    }
    Ok(records)
}
