use clap::Args;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use chipfin_core::artifact::write_wide_file;
use chipfin_core::normalize;
use chipfin_core::sources::{self, FactSource};

use super::DuplicatesArg;
use crate::config::{CompanyConfig, PipelineConfig, SourceConfig};

/// Arguments for a collection run
#[derive(Args)]
pub struct CollectArgs {
    /// Pipeline configuration (.yaml, .yml or .json)
    #[arg(long)]
    pub config: Option<String>,

    /// Extra source as KIND:PATH, KIND one of statements, facts_json, facts_csv.
    /// PATH may contain {symbol}. Repeatable.
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Company symbols, replacing the configured list (comma-separated)
    #[arg(long = "company", value_delimiter = ',')]
    pub companies: Vec<String>,

    /// Wide CSV artifact to write
    #[arg(long)]
    pub out: Option<String>,

    /// Pause between companies in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Policy for facts repeated within a (company, period, metric)
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicatesArg>,
}

pub fn run_collect(args: CollectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    for spec in &args.sources {
        config.sources.push(SourceConfig::parse_spec(spec)?);
    }
    if !args.companies.is_empty() {
        config.companies = args
            .companies
            .iter()
            .map(|symbol| CompanyConfig {
                symbol: symbol.trim().to_uppercase(),
                name: String::new(),
            })
            .collect();
    }
    if let Some(out) = args.out {
        config.output = out;
    }
    if let Some(ms) = args.delay_ms {
        config.request_delay_ms = ms;
    }
    if let Some(duplicates) = args.duplicates {
        config.duplicate_policy = duplicates.into();
    }

    if config.sources.is_empty() {
        return Err("no sources configured: add `sources` to --config or pass --source KIND:PATH".into());
    }

    let built: Vec<Box<dyn FactSource>> = config.sources.iter().map(SourceConfig::build).collect();
    let symbols = config.symbols();
    let report = sources::collect(
        &built,
        &symbols,
        Duration::from_millis(config.request_delay_ms),
    );

    let output = normalize(&report.facts, config.duplicate_policy)?;

    let artifact = if output.result.is_empty() {
        warn!("no records to save");
        None
    } else {
        write_wide_file(Path::new(&config.output), &output.result)?;
        info!(path = %config.output, records = output.result.len(), "saved wide artifact");
        Some(config.output.clone())
    };

    Ok(json!({
        "result": {
            "companies": symbols,
            "companies_with_data": report.companies_with_data,
            "facts": report.facts.len(),
            "records": output.result.len(),
            "artifact": artifact,
        },
        "source_failures": report.source_failures,
        "warnings": output.warnings,
    }))
}
