//! Module registry and discovery
//!
//! Handles module discovery, manifest parsing, and load planning for
//! manifest-described module sets.

pub mod discovery;
pub mod manifest;
pub mod planner;

pub use discovery::{DiscoveredModule, ModuleDiscovery};
pub use manifest::ModuleManifest;
pub use planner::ManifestPlanner;
