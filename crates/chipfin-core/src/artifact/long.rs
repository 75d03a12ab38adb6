use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

use super::{artifact_error, coerce_value, parse_date, reader_for, required_column};
use crate::model::{Metric, TidyRow};
use crate::ChipFinResult;

pub const TIDY_HEADERS: [&str; 4] = ["Company", "Date", "Metric", "Value"];

/// Write tidy rows as CSV; absent values are empty cells.
pub fn write_tidy<W: Write>(writer: W, rows: &[TidyRow]) -> ChipFinResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(TIDY_HEADERS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_tidy_file(path: &Path, rows: &[TidyRow]) -> ChipFinResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| artifact_error(path, e))?;
    }
    let file = File::create(path).map_err(|e| artifact_error(path, e))?;
    write_tidy(file, rows).map_err(|e| artifact_error(path, e))
}

pub fn read_tidy<R: Read>(reader: R) -> ChipFinResult<Vec<TidyRow>> {
    let mut rdr = reader_for(reader);
    let headers = rdr.headers()?.clone();
    rows_from_reader(&mut rdr, &headers)
}

pub(super) fn rows_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    headers: &csv::StringRecord,
) -> ChipFinResult<Vec<TidyRow>> {
    let company_col = required_column(headers, "Company")?;
    let date_col = required_column(headers, "Date")?;
    let metric_col = required_column(headers, "Metric")?;
    let value_col = required_column(headers, "Value")?;

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let line_no = line + 2;

        let company = record.get(company_col).unwrap_or_default();
        if company.is_empty() {
            warn!(line = line_no, "skipping tidy row without a company");
            continue;
        }
        let period = match parse_date(record.get(date_col).unwrap_or_default()) {
            Ok(d) => d,
            Err(e) => {
                warn!(line = line_no, "skipping tidy row: {e}");
                continue;
            }
        };
        let metric: Metric = match record.get(metric_col).unwrap_or_default().parse() {
            Ok(m) => m,
            Err(e) => {
                warn!(line = line_no, "skipping tidy row: {e}");
                continue;
            }
        };

        rows.push(TidyRow {
            company: company.to_string(),
            period,
            metric,
            value: record.get(value_col).and_then(coerce_value),
        });
    }
    Ok(rows)
}
