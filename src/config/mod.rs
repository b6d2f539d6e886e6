//! Configuration management for module hosts
//!
//! Handles configuration loading and validation for logging and the module
//! system. Files may be TOML or JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "module_host::module=debug").
    /// `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Module system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Enable module system
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory containing module manifests (`<dir>/<module>/module.toml`)
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// List of enabled modules (empty = all discovered)
    #[serde(default)]
    pub enabled_modules: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            modules_dir: default_modules_dir(),
            enabled_modules: Vec::new(),
        }
    }
}

impl ModuleConfig {
    /// Modules directory as a path
    pub fn modules_path(&self) -> PathBuf {
        PathBuf::from(&self.modules_dir)
    }
}

/// Host configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// Module system configuration
    #[serde(default)]
    pub modules: Option<ModuleConfig>,
}

impl HostConfig {
    /// Load configuration from file, picking the format from the extension
    /// (`.json` is JSON, anything else TOML)
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HostConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HostConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Module configuration, or defaults when the section is absent
    pub fn module_config(&self) -> ModuleConfig {
        self.modules.clone().unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(ref logging) = self.logging {
            if let Some(ref filter) = logging.filter {
                if filter.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "logging.filter must not be empty; omit it to use the default"
                    ));
                }
            }
        }

        if let Some(ref modules) = self.modules {
            if modules.modules_dir.trim().is_empty() {
                return Err(anyhow::anyhow!("modules.modules_dir must not be empty"));
            }
            if let Some(name) = modules.enabled_modules.iter().find(|n| n.trim().is_empty()) {
                return Err(anyhow::anyhow!(
                    "modules.enabled_modules contains an empty name: {:?}",
                    name
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert!(config.logging.is_none());
        let modules = config.module_config();
        assert!(modules.enabled);
        assert_eq!(modules.modules_dir, "modules");
        assert!(modules.enabled_modules.is_empty());
    }

    #[test]
    fn test_toml_round_trip_through_json() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("host.toml");
        std::fs::write(
            &toml_path,
            r#"
            [logging]
            filter = "debug"

            [modules]
            modules_dir = "plugins"
            enabled_modules = ["index"]
            "#,
        )
        .unwrap();

        let config = HostConfig::from_file(&toml_path).unwrap();
        let modules = config.module_config();
        assert!(modules.enabled);
        assert_eq!(modules.modules_path(), PathBuf::from("plugins"));
        assert_eq!(modules.enabled_modules, vec!["index"]);
        assert_eq!(config.logging.as_ref().unwrap().filter.as_deref(), Some("debug"));
        assert!(!config.logging.as_ref().unwrap().json_format);

        let json_path = temp_dir.path().join("host.json");
        config.to_json_file(&json_path).unwrap();
        assert_eq!(HostConfig::from_file(&json_path).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_empty_values() {
        let config = HostConfig {
            logging: None,
            modules: Some(ModuleConfig {
                modules_dir: " ".to_string(),
                ..ModuleConfig::default()
            }),
        };
        assert!(config.validate().is_err());

        let config = HostConfig {
            logging: Some(LoggingConfig {
                filter: Some(String::new()),
                json_format: false,
            }),
            modules: None,
        };
        assert!(config.validate().is_err());
    }
}
