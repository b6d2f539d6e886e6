//! Module manifest parsing and validation
//!
//! Handles parsing module.toml manifests and validating module metadata.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::module::traits::ModuleError;

/// Module manifest (module.toml structure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module name
    pub name: String,
    /// Module version (semantic versioning)
    pub version: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Concrete modules that must be active first
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Abstract capabilities that must be provided by some module
    #[serde(default)]
    pub requires: Vec<String>,
    /// Capability this module provides
    #[serde(default)]
    pub provides: Option<String>,
}

impl ModuleManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to read manifest file: {}", e))
        })?;
        contents.parse()
    }

    fn validate(&self) -> Result<(), ModuleError> {
        if self.name.trim().is_empty() {
            return Err(ModuleError::InvalidManifest(
                "Module name cannot be empty".to_string(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(ModuleError::InvalidManifest(format!(
                "Module {} has an empty version",
                self.name
            )));
        }
        if self.dependencies.iter().any(|d| d == &self.name) {
            return Err(ModuleError::CircularDependency(format!(
                "{} -> {}",
                self.name, self.name
            )));
        }
        Ok(())
    }
}

impl FromStr for ModuleManifest {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let manifest: ModuleManifest = toml::from_str(s)?;
        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let manifest: ModuleManifest = r#"
            name = "index"
            version = "0.2.0"
            description = "Block index"
            dependencies = ["disk"]
            requires = ["storage"]
            provides = "lookup"
        "#
        .parse()
        .unwrap();

        assert_eq!(manifest.name, "index");
        assert_eq!(manifest.dependencies, vec!["disk"]);
        assert_eq!(manifest.requires, vec!["storage"]);
        assert_eq!(manifest.provides.as_deref(), Some("lookup"));
    }

    #[test]
    fn test_optional_fields_default() {
        let manifest: ModuleManifest = "name = \"disk\"\nversion = \"1.0.0\"".parse().unwrap();
        assert!(manifest.description.is_none());
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.requires.is_empty());
        assert!(manifest.provides.is_none());
    }

    #[test]
    fn test_rejects_bad_manifests() {
        assert!(matches!(
            "name = \"\"\nversion = \"1\"".parse::<ModuleManifest>(),
            Err(ModuleError::InvalidManifest(_))
        ));
        assert!(matches!(
            "name = \"a\"".parse::<ModuleManifest>(),
            Err(ModuleError::InvalidManifest(_))
        ));
        assert!(matches!(
            "name = \"a\"\nversion = \"1\"\ndependencies = [\"a\"]".parse::<ModuleManifest>(),
            Err(ModuleError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_invalid_manifest() {
        match "name = [".parse::<ModuleManifest>() {
            Err(ModuleError::InvalidManifest(msg)) => {
                assert!(msg.starts_with("Failed to parse manifest TOML"), "{}", msg)
            }
            other => panic!("expected invalid manifest, got {:?}", other),
        }
    }
}
