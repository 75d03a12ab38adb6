use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use chipfin_core::sources::{FactSource, FactsCsvSource, FactsJsonSource, StatementSource};
use chipfin_core::DuplicatePolicy;

/// Collector settings, read from YAML (or JSON by extension).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub companies: Vec<CompanyConfig>,
    pub sources: Vec<SourceConfig>,
    /// Wide artifact written by `collect`.
    pub output: String,
    pub duplicate_policy: DuplicatePolicy,
    /// Pause between companies, for rate-limited upstreams.
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Statements { path: String },
    FactsJson { path: String },
    FactsCsv { path: String },
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let company = |symbol: &str, name: &str| CompanyConfig {
            symbol: symbol.to_string(),
            name: name.to_string(),
        };
        Self {
            companies: vec![
                company("WDC", "Western Digital Corporation"),
                company("MU", "Micron Technology Inc."),
                company("TSM", "Taiwan Semiconductor Manufacturing Company Limited"),
                company("INTC", "Intel Corporation"),
            ],
            sources: Vec::new(),
            output: "automated_financial_data.csv".to_string(),
            duplicate_policy: DuplicatePolicy::LastWriteWins,
            request_delay_ms: 0,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {}", path, e))?;
        let is_json = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
        };
        Ok(config)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.companies.iter().map(|c| c.symbol.clone()).collect()
    }
}

impl SourceConfig {
    /// Parse a `KIND:PATH` command-line source.
    pub fn parse_spec(spec: &str) -> Result<Self, String> {
        let (kind, path) = spec
            .split_once(':')
            .ok_or_else(|| format!("source '{}' must look like KIND:PATH", spec))?;
        let path = path.to_string();
        match kind.trim() {
            "statements" => Ok(SourceConfig::Statements { path }),
            "facts_json" => Ok(SourceConfig::FactsJson { path }),
            "facts_csv" => Ok(SourceConfig::FactsCsv { path }),
            other => Err(format!(
                "unknown source kind '{}' (expected statements, facts_json or facts_csv)",
                other
            )),
        }
    }

    pub fn build(&self) -> Box<dyn FactSource> {
        match self {
            SourceConfig::Statements { path } => Box::new(StatementSource::new(path.clone())),
            SourceConfig::FactsJson { path } => Box::new(FactsJsonSource::new(path.clone())),
            SourceConfig::FactsCsv { path } => Box::new(FactsCsvSource::new(path.clone())),
        }
    }
}
