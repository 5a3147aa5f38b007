//! Application configuration

use crate::{AppError, StatusFilter};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub sync: SyncConfig,
    pub view: ViewConfig,
    pub sessions: Vec<SessionConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            sync: SyncConfig::default(),
            view: ViewConfig::default(),
            sessions: default_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Rolling log files older than this are deleted at startup
    pub log_retention_days: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_retention_days: 7,
        }
    }
}

/// Folder sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Auto-refresh period; clamped to 1s..=30s
    pub interval_ms: u64,
    /// Extensions picked up from the synced folder
    pub extensions: Vec<String>,
    pub show_hidden: bool,
}

impl SyncConfig {
    pub const MIN_INTERVAL_MS: u64 = 1_000;
    pub const MAX_INTERVAL_MS: u64 = 30_000;

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.clamp(Self::MIN_INTERVAL_MS, Self::MAX_INTERVAL_MS))
    }

    pub fn list_options(&self) -> app_fs::ListOptions {
        app_fs::ListOptions {
            show_hidden: self.show_hidden,
            ..app_fs::ListOptions::with_extensions(&self.extensions)
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            extensions: app_fs::DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            show_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub sort_order: SortOrder,
    pub status_filter: StatusFilter,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::Descending,
            status_filter: StatusFilter::All,
        }
    }
}

/// A reference session offered by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &std::path::Path) -> Result<Self, AppError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| AppError::Config(format!("{}: {}", config_path.display(), e)))?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), AppError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "RefBoard", "RefBoard")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}

fn default_sessions() -> Vec<SessionConfig> {
    let session = |id: &str, name: &str, refs: &[&str]| SessionConfig {
        id: id.into(),
        name: name.into(),
        references: refs.iter().map(|r| r.to_string()).collect(),
    };

    vec![
        session(
            "session_proj_alpha",
            "Project Alpha - Phase 1 Keywords",
            &["AlphaCore", "SynergyMax", "QuantumLeap", "NovaMetric", "ZenithPoint"],
        ),
        session(
            "session_client_beta",
            "Client Beta - Approved Product Names",
            &["ProductX", "ServiceY", "SolutionZ", "BetaFeature", "ClientBrandName"],
        ),
        session(
            "session_research_gamma",
            "Research Gamma - Core Concepts",
            &["MethodologyA", "TheoremB", "HypothesisC", "VariableD", "ConclusionE"],
        ),
        session(
            "session_marketing_q1",
            "Marketing Q1 - Campaign Tags",
            &["#SpringSale", "#NewProductLaunch", "#EarlyBird", "#LimitedTimeOffer", "#Q1Promo"],
        ),
        session(
            "session_dev_sprint_5",
            "Dev Sprint 5 - Feature IDs",
            &["FEAT-101", "FEAT-102-Subtask", "BUG-205", "UIUX-007", "API-042"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.sync.interval_ms = 5_000;
        config.view.sort_order = SortOrder::Ascending;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.sync.interval_ms, 5_000);
        assert_eq!(loaded.view.sort_order, SortOrder::Ascending);
        assert_eq!(loaded.sessions.len(), 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\ninterval_ms = 100\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.sync.interval(), Duration::from_millis(1_000));
        assert_eq!(loaded.sync.extensions.len(), 6);
        assert_eq!(loaded.view.sort_order, SortOrder::Descending);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.general.log_retention_days, 7);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync\ninterval_ms = \"soon\"\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("config.toml"));

        std::fs::create_dir(dir.path().join("dir.toml")).unwrap();
        assert!(matches!(AppConfig::load_from(&dir.path().join("dir.toml")), Err(AppError::Io(_))));
    }
}
