use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use chipfin_core::dashboard::{
    average_by_company, companies, correlation, date_bounds, growth_rates, key_metrics,
    summary_stats, ArtifactCache, TidyQuery,
};
use chipfin_core::{Metric, TidyRow};

/// Artifact produced by `collect` or `normalize --out`
#[derive(Args)]
pub struct ArtifactArgs {
    /// Wide or tidy CSV artifact
    #[arg(long, default_value = "automated_financial_data.csv")]
    pub artifact: String,
}

/// Row filters shared by the dashboard commands
#[derive(Args)]
pub struct FilterArgs {
    /// Company symbols to keep (comma-separated)
    #[arg(long = "company", value_delimiter = ',')]
    pub companies: Vec<String>,

    /// First date to keep (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last date to keep (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl FilterArgs {
    fn query(&self) -> TidyQuery {
        self.companies
            .iter()
            .fold(TidyQuery::new(), |q, c| q.company(c.trim()))
            .between(self.from, self.to)
    }
}

#[derive(Args)]
pub struct OverviewArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Arguments for commands that analyse a single metric
#[derive(Args)]
pub struct MetricArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Metric name, e.g. "Revenue", "Inventory Turnover" or cash_on_hand
    #[arg(long, default_value = "Revenue")]
    pub metric: Metric,
}

#[derive(Args)]
pub struct RowsArgs {
    #[command(flatten)]
    pub artifact: ArtifactArgs,
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Metrics to keep (repeatable)
    #[arg(long = "metric")]
    pub metrics: Vec<Metric>,

    /// Case-insensitive text matched against company, metric, date and value
    #[arg(long)]
    pub search: Option<String>,
}

fn load(args: &ArtifactArgs, cache: &mut ArtifactCache) -> Result<Arc<Vec<TidyRow>>, Box<dyn std::error::Error>> {
    Ok(cache.load(&args.artifact)?)
}

pub fn run_overview(args: OverviewArgs, cache: &mut ArtifactCache) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load(&args.artifact, cache)?;
    let query = args.filter.query();
    let filtered = query.apply(&rows);

    let range = date_bounds(&filtered).map(|(from, to)| json!({ "from": from, "to": to }));

    Ok(json!({
        "result": key_metrics(&filtered),
        "companies": companies(&filtered),
        "date_range": range,
        "rows": filtered.len(),
        "filters": query,
    }))
}

pub fn run_compare(args: MetricArgs, cache: &mut ArtifactCache) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load(&args.artifact, cache)?;
    let query = args.filter.query().metric(args.metric);
    Ok(json!({
        "result": average_by_company(&query.apply(&rows), args.metric),
        "filters": query,
    }))
}

pub fn run_stats(args: MetricArgs, cache: &mut ArtifactCache) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load(&args.artifact, cache)?;
    let query = args.filter.query().metric(args.metric);
    Ok(json!({
        "result": summary_stats(&query.apply(&rows), args.metric),
        "filters": query,
    }))
}

pub fn run_growth(args: MetricArgs, cache: &mut ArtifactCache) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load(&args.artifact, cache)?;
    let query = args.filter.query().metric(args.metric);
    Ok(json!({
        "result": growth_rates(&query.apply(&rows), args.metric),
        "filters": query,
    }))
}

pub fn run_correlation(args: MetricArgs, cache: &mut ArtifactCache) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load(&args.artifact, cache)?;
    let query = args.filter.query().metric(args.metric);
    let matrix = correlation(&query.apply(&rows), args.metric);

    // One row per company so table and csv output read as a matrix.
    let table: Vec<Value> = matrix
        .companies
        .iter()
        .zip(&matrix.matrix)
        .map(|(company, cells)| {
            let mut row = Map::new();
            row.insert("Company".to_string(), json!(company));
            for (other, cell) in matrix.companies.iter().zip(cells) {
                row.insert(other.clone(), json!(cell));
            }
            Value::Object(row)
        })
        .collect();

    Ok(json!({
        "result": table,
        "metric": matrix.metric,
        "filters": query,
    }))
}

pub fn run_rows(args: RowsArgs, cache: &mut ArtifactCache) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = load(&args.artifact, cache)?;
    let mut query = args
        .metrics
        .iter()
        .fold(args.filter.query(), |q, m| q.metric(*m));
    if let Some(term) = args.search {
        query = query.search(term);
    }
    Ok(json!({
        "result": query.apply(&rows),
        "filters": query,
    }))
}
