use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunLogError};
use crate::logging::LogConfig;
use crate::models::DistanceUnit;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// General application settings
    pub settings: AppSettings,

    /// Data import preferences
    pub import: ImportSettings,

    /// Logging configuration
    pub log: LogConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Path to the run database
    pub database_path: PathBuf,

    /// Default distance unit for entry and display
    pub default_unit: DistanceUnit,
}

/// Data import preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Show a progress bar for directory imports
    pub show_progress: bool,

    /// Print every rejected row after an import
    pub report_rejected_rows: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: AppSettings {
                database_path: default_database_path(),
                default_unit: DistanceUnit::Kilometers,
            },
            import: ImportSettings {
                show_progress: true,
                report_rejected_rows: true,
            },
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RunLogError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration as TOML, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RunLogError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Default config file location under the platform config directory
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("runlog")
        .join("config.toml")
}

/// Default database location under the platform data directory
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("runlog")
        .join("runs.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.settings.default_unit, DistanceUnit::Kilometers);
        assert!(config.import.show_progress);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.settings.default_unit = DistanceUnit::Miles;
        config.import.report_rejected_rows = false;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.settings.default_unit, DistanceUnit::Miles);
        assert!(!loaded.import.report_rejected_rows);
    }

    #[test]
    fn test_load_or_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.settings.default_unit, DistanceUnit::Kilometers);
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(RunLogError::Config(_))
        ));
    }
}
