/*!
 * Filesystem cache of raw sphere-query responses
 *
 * Entries live at `<dir>/<sanitized star>_<radius>.json` and hold the
 * unfiltered JSON array exactly as EDSM returned it. Searches only ever
 * write here; reading is an explicit operation for inspection and offline
 * use.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::core::api::format_radius;
use crate::core::model::StarSystem;
use crate::error::{Result, StarfinderError};

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Cache key for a star/radius pair, e.g. `Alpha_Centauri_10`
pub fn cache_key(name: &str, radius: f64) -> String {
    sanitize_name(&format!("{}_{}", sanitize_name(name), format_radius(radius)))
}

/// One file in the cache directory
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntryInfo {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl CacheEntryInfo {
    pub fn age(&self) -> Option<Duration> {
        self.modified
            .and_then(|m| SystemTime::now().duration_since(m).ok())
    }
}

/// Result of a clear operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearReport {
    pub removed: usize,
    /// Files that could not be removed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

/// Directory-backed store for sphere query results
#[derive(Debug, Clone)]
pub struct SphereCache {
    dir: PathBuf,
}

impl SphereCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str, radius: f64) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(name, radius)))
    }

    /// Write the raw response, replacing any existing entry for the key
    pub fn write(&self, name: &str, radius: f64, raw: &Value) -> Result<PathBuf> {
        let path = self.path_for(name, radius);
        let to_err = |message: String| StarfinderError::CacheWrite {
            path: path.clone(),
            message,
        };

        fs::create_dir_all(&self.dir).map_err(|e| to_err(e.to_string()))?;
        let body = serde_json::to_vec(raw).map_err(|e| to_err(e.to_string()))?;

        // Write to a sibling temp file first so readers never see a torn entry
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| to_err(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| to_err(e.to_string()))?;

        tracing::debug!(path = %path.display(), "cache entry written");
        Ok(path)
    }

    /// Read an entry regardless of age
    pub fn read(&self, name: &str, radius: f64) -> Result<Option<Vec<StarSystem>>> {
        let path = self.path_for(name, radius);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let systems: Vec<StarSystem> = serde_json::from_str(&contents)?;
        Ok(Some(systems))
    }

    /// Read an entry only if it is younger than `max_age`
    pub fn read_fresh(
        &self,
        name: &str,
        radius: f64,
        max_age: Duration,
    ) -> Result<Option<Vec<StarSystem>>> {
        let path = self.path_for(name, radius);
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > max_age {
            return Ok(None);
        }
        self.read(name, radius)
    }

    /// All cache entries, sorted by key
    pub fn list(&self) -> Result<Vec<CacheEntryInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let key = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(CacheEntryInfo {
                key,
                path,
                size: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Delete every entry for `name`, at any radius.
    ///
    /// Matching is by the `<sanitized name>_` file prefix, so clearing "Sol"
    /// also removes entries for systems whose names extend it, such as
    /// "Sol Sector AB-C d1" (`Sol_Sector_AB_C_d1_10.json`).
    pub fn clear_star(&self, name: &str) -> Result<ClearReport> {
        let prefix = format!("{}_", sanitize_name(name));
        self.clear_matching(|file_name| file_name.starts_with(&prefix))
    }

    /// Delete every file in the cache directory
    pub fn clear_all(&self) -> Result<ClearReport> {
        self.clear_matching(|_| true)
    }

    fn clear_matching<F>(&self, matches: F) -> Result<ClearReport>
    where
        F: Fn(&str) -> bool,
    {
        let mut report = ClearReport::default();
        if !self.dir.exists() {
            return Ok(report);
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !matches(&file_name) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "failed to remove cache file");
                    report.failures.push((entry.path(), e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
