use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::parsers::RosterFormat;

/// Finds donor roster files among files and directories given on the command line
pub struct RosterDiscovery {
    recursive: bool,
}

impl RosterDiscovery {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    /// Expand `paths` into roster files, de-duplicated in first-seen order.
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_file() {
                files.push(path.clone());
            } else if path.is_dir() {
                files.extend(self.discover_in_directory(path)?);
            } else {
                anyhow::bail!("Roster path does not exist: {}", path.display());
            }
        }

        let mut seen = HashSet::new();
        files.retain(|path| seen.insert(path.clone()));

        debug!("Discovered {} roster files", files.len());
        Ok(files)
    }

    fn discover_in_directory(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if self.recursive {
            for entry in WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && is_roster_file(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            let entries = fs::read_dir(dir)
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

            for entry in entries {
                let entry = entry.with_context(|| {
                    format!("Failed to read directory entry in: {}", dir.display())
                })?;
                let path = entry.path();

                if path.is_file() && is_roster_file(&path) {
                    files.push(path);
                }
            }
            files.sort();
        }

        Ok(files)
    }
}

fn is_roster_file(path: &Path) -> bool {
    RosterFormat::from_path(path).is_some()
}
