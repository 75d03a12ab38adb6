use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chipfin_core::sources::read_facts_csv;
use chipfin_core::FinancialFact;

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Read raw facts from a `.csv` file or a JSON array.
pub fn read_facts(path: &str) -> Result<Vec<FinancialFact>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let is_csv = canonical
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return read_json(path);
    }
    let file = File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let facts = read_facts_csv(file)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(facts)
}

/// Resolve and validate the path.
pub fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
