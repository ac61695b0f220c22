use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::matching::{MatchOptions, DEFAULT_MATCH_LIMIT};
use crate::output::ReportFormat;
use crate::statistics::{RefreshSchedule, DEFAULT_CRITICAL_THRESHOLD};

/// Settings loaded from `bloodsync.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads, 0 = one per CPU
    pub threads: usize,
    pub report: ReportConfig,
    pub matching: MatchingConfig,
    pub inventory: InventoryConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./reports"),
            format: ReportFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub limit: usize,
    pub location: Option<String>,
    pub recursive: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_MATCH_LIMIT,
            location: None,
            recursive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub critical_threshold: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.matching.limit == 0 {
            anyhow::bail!("matching.limit must be at least 1");
        }
        if self.refresh.interval_secs == 0 {
            anyhow::bail!("refresh.interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            location: self.matching.location.clone(),
            limit: self.matching.limit,
        }
    }

    pub fn refresh_schedule(&self) -> RefreshSchedule {
        RefreshSchedule::new(Duration::from_secs(self.refresh.interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.threads, 0);
        assert_eq!(config.matching.limit, 10);
        assert_eq!(config.inventory.critical_threshold, 20);
        assert_eq!(config.refresh_schedule().interval(), Duration::from_secs(30));
        assert_eq!(config.report.output_dir, PathBuf::from("./reports"));
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            threads = 4

            [report]
            format = "json"

            [matching]
            limit = 3
            location = "Mumbai"
            "#,
        )
        .unwrap();

        assert_eq!(config.threads, 4);
        assert!(matches!(config.report.format, ReportFormat::Json));
        assert_eq!(config.report.output_dir, PathBuf::from("./reports"));
        let options = config.match_options();
        assert_eq!(options.limit, 3);
        assert_eq!(options.location.as_deref(), Some("Mumbai"));
    }

    #[test]
    fn test_rejects_zero_limit() {
        assert!(Config::from_toml("[matching]\nlimit = 0").is_err());
        assert!(Config::from_toml("[refresh]\ninterval_secs = 0").is_err());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("bloodsync.toml");
        fs::write(&path, "[inventory]\ncritical_threshold = 5\n")?;

        let config = Config::load(&path)?;
        assert_eq!(config.inventory.critical_threshold, 5);
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
        Ok(())
    }
}
