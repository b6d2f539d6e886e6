//! Load planning for manifest-described modules
//!
//! Applies the same resolution rules as the module manager to a set of
//! `module.toml` manifests: capabilities bind to the first module that
//! provides them, and the resulting graph is ordered dependencies first.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::module::registry::discovery::DiscoveredModule;
use crate::module::registry::manifest::ModuleManifest;
use crate::module::resolver::{plan_load_order, LoadPlan, Requirement};
use crate::module::traits::ModuleError;

/// Plans activation order for a set of manifests
#[derive(Debug, Clone)]
pub struct ManifestPlanner {
    /// Manifests in registration (discovery) order, unique by name
    manifests: Vec<ModuleManifest>,
    /// Capability -> providing module
    bindings: HashMap<String, String>,
}

impl ManifestPlanner {
    /// Create a planner; earlier manifests win name and capability conflicts
    pub fn new(manifests: Vec<ModuleManifest>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            if seen.insert(manifest.name.clone()) {
                unique.push(manifest);
            } else {
                warn!("Duplicate module {} ignored", manifest.name);
            }
        }

        let mut bindings: HashMap<String, String> = HashMap::new();
        for manifest in &unique {
            let Some(capability) = manifest.provides.as_ref() else {
                continue;
            };
            match bindings.get(capability) {
                Some(existing) => warn!(
                    "Conflicting providers for capability {}: keeping {}, ignoring {}",
                    capability, existing, manifest.name
                ),
                None => {
                    debug!("Capability {} bound to {}", capability, manifest.name);
                    bindings.insert(capability.clone(), manifest.name.clone());
                }
            }
        }

        Self {
            manifests: unique,
            bindings,
        }
    }

    /// Create a planner from discovery results
    pub fn from_discovered(modules: Vec<DiscoveredModule>) -> Self {
        Self::new(modules.into_iter().map(|m| m.manifest).collect())
    }

    /// Known manifests in registration order
    pub fn manifests(&self) -> &[ModuleManifest] {
        &self.manifests
    }

    /// Module bound to `capability`
    pub fn provider_of(&self, capability: &str) -> Option<&str> {
        self.bindings.get(capability).map(String::as_str)
    }

    /// Plan the enabled modules plus everything they transitively need
    ///
    /// An empty `enabled` list plans every known module.
    ///
    /// # Errors
    ///
    /// [`ModuleError::ModuleNotFound`] for an unknown enabled name, plus the
    /// configuration errors of [`plan_load_order`].
    pub fn plan(&self, enabled: &[String]) -> Result<LoadPlan<String>, ModuleError> {
        let by_name: HashMap<&str, &ModuleManifest> = self
            .manifests
            .iter()
            .map(|m| (m.name.as_str(), m))
            .collect();

        let mut selected: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        if enabled.is_empty() {
            queue.extend(self.manifests.iter().map(|m| m.name.as_str()));
        } else {
            for name in enabled {
                let manifest = by_name
                    .get(name.as_str())
                    .ok_or_else(|| ModuleError::ModuleNotFound(name.clone()))?;
                queue.push_back(manifest.name.as_str());
            }
        }

        while let Some(name) = queue.pop_front() {
            let Some(manifest) = by_name.get(name) else {
                continue;
            };
            if !selected.insert(manifest.name.as_str()) {
                continue;
            }
            queue.extend(manifest.dependencies.iter().map(String::as_str));
            queue.extend(
                manifest
                    .requires
                    .iter()
                    .filter_map(|c| self.bindings.get(c))
                    .map(String::as_str),
            );
        }

        let modules: Vec<(String, Vec<Requirement<String>>)> = self
            .manifests
            .iter()
            .filter(|m| selected.contains(m.name.as_str()))
            .map(|m| {
                let requirements = m
                    .dependencies
                    .iter()
                    .cloned()
                    .map(Requirement::Module)
                    .chain(m.requires.iter().cloned().map(Requirement::Capability))
                    .collect();
                (m.name.clone(), requirements)
            })
            .collect();

        plan_load_order(&modules, &self.bindings)
    }
}
