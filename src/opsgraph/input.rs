//! Input file selection

use crate::adk::error::OpsGraphError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Resolve the input file for a workflow
///
/// An explicit path is used as given when it exists, otherwise it is looked up
/// relative to `dir`. Without one, the most recently modified file in `dir` wins.
pub fn pick_input(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf, OpsGraphError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        let relative = dir.join(path);
        if relative.is_file() {
            return Ok(relative);
        }
        return Err(OpsGraphError::config(format!(
            "Input file not found: {} (also tried {})",
            path.display(),
            relative.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        OpsGraphError::config(format!("Cannot read input directory {}: {}", dir.display(), e))
    })?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| OpsGraphError::config(format!("No input files in {}", dir.display())))
}
