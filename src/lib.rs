//! Module Host - dependency-ordered lifecycle management for in-process modules
//!
//! This crate orchestrates a set of modules that depend on each other, either
//! directly or through abstract capabilities, and shares state between them
//! through a tree of scoped, type-keyed contexts.
//!
//! ## Components
//!
//! 1. [`graph`]: generic directed/undirected graph with traversal, cycle
//!    detection and topological ordering
//! 2. [`module`]: module contract, descriptors, scoped contexts, dependency
//!    resolution and the [`ModuleManager`]
//! 3. [`config`]: host configuration (logging, module discovery)
//! 4. [`utils`]: logging setup and log-and-continue helpers
//!
//! ## Design Principles
//!
//! 1. **Fail before starting**: configuration errors (cycles, unbound
//!    capabilities, missing modules) are reported before any module is created
//! 2. **Contain runtime failures**: one module failing to start does not stop
//!    the others
//! 3. **Deterministic**: the same registrations always produce the same order
//!
//! ## Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use module_host::{Context, Module, ModuleDefinition, ModuleError, ModuleManager};
//!
//! #[derive(Default)]
//! struct Metrics {
//!     running: AtomicBool,
//! }
//!
//! impl Module for Metrics {
//!     fn start(&self) -> Result<(), ModuleError> {
//!         self.running.store(true, Ordering::SeqCst);
//!         Ok(())
//!     }
//!     fn stop(&self) -> Result<(), ModuleError> {
//!         self.running.store(false, Ordering::SeqCst);
//!         Ok(())
//!     }
//!     fn is_running(&self) -> bool {
//!         self.running.load(Ordering::SeqCst)
//!     }
//! }
//!
//! impl ModuleDefinition for Metrics {
//!     fn create() -> Result<Self, ModuleError> {
//!         Ok(Self::default())
//!     }
//! }
//!
//! let mut manager = ModuleManager::new(Context::root());
//! manager.register::<Metrics>()?;
//! manager.init()?;
//! assert!(manager.get_module::<Metrics>().unwrap().is_running());
//! manager.shutdown()?;
//! # Ok::<(), ModuleError>(())
//! ```

pub mod config;
pub mod graph;
pub mod module;
pub mod utils;

pub use config::{HostConfig, LoggingConfig, ModuleConfig};
pub use graph::{DiGraph, Graph, GraphError, NodeId, UnGraph};
pub use module::{
    Capability, Context, ContextError, Module, ModuleDefinition, ModuleError, ModuleManager,
    ModuleRef, ModuleState, Slot,
};
