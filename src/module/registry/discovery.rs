//! Module discovery
//!
//! Scans a modules directory for `*/module.toml` manifests.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::module::registry::manifest::ModuleManifest;
use crate::module::traits::ModuleError;

/// Manifest file looked for in each module directory
pub const MANIFEST_FILE: &str = "module.toml";

/// Discovered module information
#[derive(Debug, Clone)]
pub struct DiscoveredModule {
    /// Module directory path
    pub directory: PathBuf,
    /// Module manifest
    pub manifest: ModuleManifest,
}

/// Module discovery scanner
pub struct ModuleDiscovery {
    /// Base directory to scan for modules
    modules_dir: PathBuf,
}

impl ModuleDiscovery {
    /// Create a new module discovery scanner
    pub fn new<P: AsRef<Path>>(modules_dir: P) -> Self {
        Self {
            modules_dir: modules_dir.as_ref().to_path_buf(),
        }
    }

    /// Directory being scanned
    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Discover all modules in the modules directory, sorted by directory name
    ///
    /// Manifests that fail to parse are logged and skipped. A missing
    /// directory yields no modules.
    pub fn discover_modules(&self) -> Result<Vec<DiscoveredModule>, ModuleError> {
        info!("Discovering modules in {:?}", self.modules_dir);

        if !self.modules_dir.exists() {
            debug!("Modules directory does not exist: {:?}", self.modules_dir);
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.modules_dir).map_err(|e| {
            ModuleError::OperationError(format!("Failed to read modules directory: {}", e))
        })?;

        let mut directories = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ModuleError::OperationError(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.is_dir() {
                directories.push(path);
            }
        }
        directories.sort();

        let mut modules = Vec::new();
        for path in directories {
            let manifest_path = path.join(MANIFEST_FILE);
            if !manifest_path.exists() {
                debug!("No {} found in {:?}, skipping", MANIFEST_FILE, path);
                continue;
            }
            match ModuleManifest::from_file(&manifest_path) {
                Ok(manifest) => {
                    debug!("Found module {} in {:?}", manifest.name, path);
                    modules.push(DiscoveredModule {
                        directory: path,
                        manifest,
                    });
                }
                Err(e) => {
                    warn!("Failed to parse manifest in {:?}: {}", path, e);
                }
            }
        }

        info!("Discovered {} modules", modules.len());
        Ok(modules)
    }

    /// Discover a specific module by directory name
    pub fn discover_module(&self, module_name: &str) -> Result<DiscoveredModule, ModuleError> {
        let module_dir = self.modules_dir.join(module_name);
        let manifest_path = module_dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ModuleError::ModuleNotFound(format!(
                "Module {} not found (no {} in {:?})",
                module_name, MANIFEST_FILE, module_dir
            )));
        }

        let manifest = ModuleManifest::from_file(&manifest_path)?;
        Ok(DiscoveredModule {
            directory: module_dir,
            manifest,
        })
    }
}
