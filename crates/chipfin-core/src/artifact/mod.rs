//! CSV artifacts exchanged with the presentation layer.
//!
//! Two layouts are supported:
//!
//! - wide: `Company, Date, Revenue, ..., Inventory Turnover`, one row per
//!   company-quarter, written by the collector;
//! - tidy: `Company, Date, Metric, Value`, one row per observation, read by
//!   dashboards.
//!
//! Readers are lenient the same way a dataframe loader is: unknown columns are
//! ignored, numeric cells that do not coerce become absent, and rows with an
//! unreadable date are skipped with a warning.

pub mod long;
pub mod wide;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::model::{parse_numeric_text, TidyRow};
use crate::tidy::to_tidy;
use crate::{ChipFinError, ChipFinResult};

pub use long::{read_tidy, write_tidy, write_tidy_file, TIDY_HEADERS};
pub use wide::{read_wide, read_wide_file, write_wide, write_wide_file, WIDE_HEADERS};

/// Layout of an artifact, detected from its header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Wide,
    Tidy,
}

impl ArtifactKind {
    pub fn detect(headers: &csv::StringRecord) -> ChipFinResult<Self> {
        let has = |name: &str| headers.iter().any(|h| h == name);
        if !has("Company") || !has("Date") {
            return Err(ChipFinError::InvalidInput {
                field: "headers".into(),
                reason: "artifact needs 'Company' and 'Date' columns".into(),
            });
        }
        if has("Metric") && has("Value") {
            Ok(ArtifactKind::Tidy)
        } else {
            Ok(ArtifactKind::Wide)
        }
    }
}

/// Load either artifact layout as tidy rows; wide files are melted on load.
pub fn load_tidy_rows(path: &Path) -> ChipFinResult<Vec<TidyRow>> {
    let file = open(path)?;
    let mut reader = reader_for(file);
    let headers = reader
        .headers()
        .map_err(|e| artifact_error(path, e))?
        .clone();

    let kind = ArtifactKind::detect(&headers).map_err(|e| artifact_error(path, e))?;
    debug!(path = %path.display(), ?kind, "loading artifact");

    let rows = match kind {
        ArtifactKind::Tidy => long::rows_from_reader(&mut reader, &headers),
        ArtifactKind::Wide => wide::records_from_reader(&mut reader, &headers).map(|r| to_tidy(&r)),
    };
    rows.map_err(|e| artifact_error(path, e))
}

/// Parse a date cell: `YYYY-MM-DD`, with an optional time part, or RFC 3339.
pub fn parse_date(cell: &str) -> ChipFinResult<NaiveDate> {
    let s = cell.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
        .map_err(|_| ChipFinError::DateError(format!("cannot parse '{s}' as a date")))
}

/// Coerce a numeric cell; anything non-numeric is absent.
pub fn coerce_value(cell: &str) -> Option<Decimal> {
    match parse_numeric_text(cell) {
        Ok(v) => v,
        Err(reason) => {
            debug!("coercing cell to missing: {reason}");
            None
        }
    }
}

pub(crate) fn reader_for<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub(crate) fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

pub(crate) fn required_column(headers: &csv::StringRecord, name: &str) -> ChipFinResult<usize> {
    column(headers, name).ok_or_else(|| ChipFinError::InvalidInput {
        field: "headers".into(),
        reason: format!("missing column '{name}'"),
    })
}

fn open(path: &Path) -> ChipFinResult<File> {
    File::open(path).map_err(|e| artifact_error(path, e))
}

pub(crate) fn artifact_error(path: &Path, e: impl std::fmt::Display) -> ChipFinError {
    ChipFinError::Artifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metric;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        assert_eq!(parse_date("2023-03-31").unwrap(), expected);
        assert_eq!(parse_date("2023-03-31 00:00:00").unwrap(), expected);
        assert_eq!(parse_date("2023-03-31T00:00:00").unwrap(), expected);
        assert_eq!(parse_date("2023-03-31T00:00:00+00:00").unwrap(), expected);
        assert!(matches!(parse_date("Q1 2023"), Err(ChipFinError::DateError(_))));
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("3.5"), Some(dec!(3.5)));
        assert_eq!(coerce_value(""), None);
        assert_eq!(coerce_value("nan"), None);
        assert_eq!(coerce_value("#REF!"), None);
    }

    #[test]
    fn test_detect_kind() {
        let tidy = csv::StringRecord::from(vec!["Company", "Date", "Metric", "Value"]);
        assert_eq!(ArtifactKind::detect(&tidy).unwrap(), ArtifactKind::Tidy);
        let wide = csv::StringRecord::from(WIDE_HEADERS.to_vec());
        assert_eq!(ArtifactKind::detect(&wide).unwrap(), ArtifactKind::Wide);
        let bad = csv::StringRecord::from(vec!["Ticker", "Quarter"]);
        assert!(ArtifactKind::detect(&bad).is_err());
    }

    #[test]
    fn test_load_wide_file_melts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Company,Date,Revenue,Cost Of Goods Sold,Gross Profit,Inventory,Cash On Hand,Inventory Turnover").unwrap();
        writeln!(file, "WDC,2023-03-31,2000,1500,,500,,3").unwrap();
        let rows = load_tidy_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 6);
        let turnover = rows.iter().find(|r| r.metric == Metric::InventoryTurnover).unwrap();
        assert_eq!(turnover.value, Some(dec!(3)));
    }

    #[test]
    fn test_load_tidy_file_as_is() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Company,Date,Metric,Value").unwrap();
        writeln!(file, "MU,2023-06-01 00:00:00,Revenue,3752").unwrap();
        writeln!(file, "MU,2023-06-01 00:00:00,Inventory,n/a").unwrap();
        let rows = load_tidy_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, Some(dec!(3752)));
        assert_eq!(rows[1].value, None);
    }

    #[test]
    fn test_missing_file_is_an_artifact_error() {
        let err = load_tidy_rows(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ChipFinError::Artifact { .. }));
    }
}
