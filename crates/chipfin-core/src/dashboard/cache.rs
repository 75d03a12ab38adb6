use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use crate::artifact::{artifact_error, load_tidy_rows};
use crate::model::TidyRow;
use crate::ChipFinResult;

/// Memoized artifact loads, keyed by canonical path and invalidated when the
/// file's modification time changes.
///
/// Owned by whoever serves the dashboard and passed to the code that needs it;
/// there is no process-wide instance.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: HashMap<PathBuf, CachedArtifact>,
}

#[derive(Debug)]
struct CachedArtifact {
    modified: SystemTime,
    rows: Arc<Vec<TidyRow>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tidy rows of the artifact at `path`, read from disk only on first use
    /// or after the file changed.
    pub fn load(&mut self, path: impl AsRef<Path>) -> ChipFinResult<Arc<Vec<TidyRow>>> {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path).map_err(|e| artifact_error(path, e))?;
        let modified = fs::metadata(&canonical)
            .and_then(|m| m.modified())
            .map_err(|e| artifact_error(path, e))?;

        if let Some(entry) = self.entries.get(&canonical) {
            if entry.modified == modified {
                debug!(path = %canonical.display(), "artifact cache hit");
                return Ok(Arc::clone(&entry.rows));
            }
        }

        debug!(path = %canonical.display(), "artifact cache miss");
        let rows = Arc::new(load_tidy_rows(&canonical)?);
        self.entries.insert(
            canonical,
            CachedArtifact {
                modified,
                rows: Arc::clone(&rows),
            },
        );
        Ok(rows)
    }

    /// Drop the entry for `path`, if any.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) {
        if let Ok(canonical) = fs::canonicalize(path.as_ref()) {
            self.entries.remove(&canonical);
        }
    }

    /// Forget every artifact; the next load of each re-reads it.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;

    const HEADER: &str = "Company,Date,Metric,Value\n";

    fn write(path: &Path, body: &str) {
        let mut f = File::create(path).unwrap();
        f.write_all(HEADER.as_bytes()).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    fn touch(path: &Path, offset_secs: u64) {
        let f = File::options().write(true).open(path).unwrap();
        f.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
            .unwrap();
    }

    #[test]
    fn test_unchanged_file_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidy.csv");
        write(&path, "WDC,2023-03-31,Revenue,2803\n");

        let mut cache = ArtifactCache::new();
        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_modified_file_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidy.csv");
        write(&path, "WDC,2023-03-31,Revenue,2803\n");

        let mut cache = ArtifactCache::new();
        let first = cache.load(&path).unwrap();
        assert_eq!(first.len(), 1);

        write(&path, "WDC,2023-03-31,Revenue,2803\nMU,2023-06-01,Revenue,3752\n");
        touch(&path, 60);

        let second = cache.load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidy.csv");
        write(&path, "");

        let mut cache = ArtifactCache::new();
        cache.load(&path).unwrap();
        cache.invalidate(&path);
        assert!(cache.is_empty());

        assert!(cache.load(dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn test_clear_forgets_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let wdc = dir.path().join("wdc.csv");
        let mu = dir.path().join("mu.csv");
        write(&wdc, "WDC,2023-03-31,Revenue,2803\n");
        write(&mu, "MU,2023-06-01,Revenue,3752\n");

        let mut cache = ArtifactCache::new();
        let before = cache.load(&wdc).unwrap();
        cache.load(&mu).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());

        let after = cache.load(&wdc).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*after, *before);
    }
}
