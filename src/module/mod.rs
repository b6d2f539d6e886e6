//! Module system
//!
//! Dependency-ordered activation of in-process modules.
//!
//! ## Architecture
//!
//! - **Descriptors**: each module type declares its dependencies, the capability
//!   it provides and the collaborators it wants injected ([`ModuleDefinition`])
//! - **Resolution**: capabilities are bound to providers, the dependency graph is
//!   checked for cycles and ordered dependencies first ([`resolver`])
//! - **Context**: modules are published into a shared scoped registry and each
//!   gets a child scope of its own ([`Context`])
//! - **Lifecycle**: the [`ModuleManager`] starts modules in order and stops them
//!   in reverse
//! - **Manifests**: `module.toml` sets are planned with the same rules ([`registry`])

pub mod context;
pub mod descriptor;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod traits;

pub use context::{Context, ContextError, Releasable};
pub use descriptor::{Capability, DescriptorCache, ModuleDescriptor, ModuleRef, Slot, SlotTarget, TypeKey};
pub use manager::{ManagerPhase, ModuleManager, MODULES_SCOPE};
pub use registry::{DiscoveredModule, ManifestPlanner, ModuleDiscovery, ModuleManifest};
pub use resolver::{plan_load_order, LoadPlan, Requirement};
pub use traits::{Module, ModuleDefinition, ModuleError, ModuleState};
