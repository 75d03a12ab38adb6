use clap::Args;
use serde_json::{json, Value};
use std::path::Path;

use chipfin_core::artifact::{load_tidy_rows, write_tidy_file, write_wide_file};
use chipfin_core::{normalize, FinancialFact};

use super::DuplicatesArg;
use crate::input;

/// Arguments for normalizing raw facts into wide records
#[derive(Args)]
pub struct NormalizeArgs {
    /// Facts file: JSON array or CSV with Company,Date,Metric,Value
    #[arg(long)]
    pub input: Option<String>,

    /// Write the wide CSV artifact here instead of printing records
    #[arg(long)]
    pub out: Option<String>,

    /// Policy for facts repeated within a (company, period, metric)
    #[arg(long, value_enum, default_value = "last")]
    pub duplicates: DuplicatesArg,
}

/// Arguments for melting an artifact into tidy rows
#[derive(Args)]
pub struct TidyArgs {
    /// Wide or tidy CSV artifact
    #[arg(long)]
    pub artifact: String,

    /// Write the tidy CSV here instead of printing rows
    #[arg(long)]
    pub out: Option<String>,
}

pub fn run_normalize(args: NormalizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let facts: Vec<FinancialFact> = if let Some(ref path) = args.input {
        input::file::read_facts(path)?
    } else if let Some(facts) = input::stdin::read_stdin()? {
        facts
    } else {
        return Err("--input <file.json|file.csv> required (or pipe facts JSON on stdin)".into());
    };

    let output = normalize(&facts, args.duplicates.into())?;

    match args.out {
        Some(path) => {
            write_wide_file(Path::new(&path), &output.result)?;
            Ok(json!({
                "result": {
                    "artifact": path,
                    "facts": facts.len(),
                    "records": output.result.len(),
                },
                "warnings": output.warnings,
                "methodology": output.methodology,
            }))
        }
        None => Ok(serde_json::to_value(output)?),
    }
}

pub fn run_tidy(args: TidyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load_tidy_rows(Path::new(&args.artifact))?;

    match args.out {
        Some(path) => {
            write_tidy_file(Path::new(&path), &rows)?;
            Ok(json!({
                "result": {
                    "artifact": path,
                    "rows": rows.len(),
                }
            }))
        }
        None => Ok(json!({ "result": rows })),
    }
}

