/*!
 * Export and import of search results
 *
 * Results are stored as a pretty-printed JSON array (2-space indent), one
 * object per system, carrying every field EDSM returned.
 */

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::model::StarSystem;
use crate::error::{Result, StarfinderError};

/// File stem used when exporting without a star name
pub const DEFAULT_EXPORT_STEM: &str = "ExportedData";

/// `<results_dir>/<star>.json`, or `ExportedData.json` for an empty name
pub fn default_export_path(results_dir: &Path, star: &str) -> PathBuf {
    let star = star.trim();
    let stem = if star.is_empty() { DEFAULT_EXPORT_STEM } else { star };
    results_dir.join(format!("{}.json", stem))
}

/// Write `systems` to `path`, creating the parent directory if needed
pub fn export_results(path: &Path, systems: &[StarSystem]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| StarfinderError::Export(format!("{}: {}", parent.display(), e)))?;
        }
    }

    let body = serde_json::to_string_pretty(systems)?;
    fs::write(path, body)
        .map_err(|e| StarfinderError::Export(format!("{}: {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), count = systems.len(), "results exported");
    Ok(())
}

/// Load systems from a previously exported file, in file order
pub fn import_results(path: &Path) -> Result<Vec<StarSystem>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| StarfinderError::Import(format!("{}: {}", path.display(), e)))?;
    let systems: Vec<StarSystem> = serde_json::from_str(&contents)
        .map_err(|e| StarfinderError::Import(format!("{}: {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), count = systems.len(), "results imported");
    Ok(systems)
}
