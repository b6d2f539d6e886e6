//! Module system traits and interfaces
//!
//! Defines the lifecycle contract every orchestrated module implements and
//! the type-level metadata the manager reads to wire modules together.

use thiserror::Error;

use crate::module::context::ContextError;
use crate::module::descriptor::{Capability, ModuleRef, Slot};

/// Lifecycle state of a module as tracked by the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    /// Registered but not yet instantiated
    Registered,
    /// Instantiated and bound to its scoped context
    Instantiated,
    /// `start()` returned successfully
    Running,
    /// `stop()` returned successfully
    Stopped,
    /// Instantiation, `start()` or `stop()` failed
    Failed(String),
}

/// Module trait that all orchestrated modules implement
///
/// Modules are shared through the context as `Arc<M>`, so lifecycle methods
/// take `&self` and implementations keep their running flag in interior
/// mutable state. `start()` on a running module and `stop()` on a stopped one
/// must be no-ops.
///
/// Neither call has a timeout: a module that blocks here stalls the whole
/// activation or shutdown sequence.
pub trait Module: Send + Sync {
    /// Start the module
    ///
    /// Should return once initialization is scheduled; background work the
    /// module spawns is not awaited.
    fn start(&self) -> Result<(), ModuleError>;

    /// Stop the module and release what it holds
    fn stop(&self) -> Result<(), ModuleError>;

    /// Whether the module is currently running
    fn is_running(&self) -> bool;
}

/// Type-level metadata for a concrete module type
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use module_host::module::{Capability, Module, ModuleDefinition, ModuleError, ModuleRef, Slot};
///
/// pub trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// #[derive(Default)]
/// struct SystemClock {
///     running: AtomicBool,
/// }
///
/// impl Clock for SystemClock {
///     fn now(&self) -> u64 {
///         42
///     }
/// }
///
/// impl Module for SystemClock {
///     fn start(&self) -> Result<(), ModuleError> {
///         self.running.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///     fn stop(&self) -> Result<(), ModuleError> {
///         self.running.store(false, Ordering::SeqCst);
///         Ok(())
///     }
///     fn is_running(&self) -> bool {
///         self.running.load(Ordering::SeqCst)
///     }
/// }
///
/// impl ModuleDefinition for SystemClock {
///     fn create() -> Result<Self, ModuleError> {
///         Ok(Self::default())
///     }
///
///     fn provides() -> Option<Capability<Self>> {
///         Some(Capability::new(|m: Arc<Self>| m as Arc<dyn Clock>))
///     }
/// }
///
/// #[derive(Default)]
/// struct Scheduler {
///     clock: Option<Arc<dyn Clock>>,
///     running: AtomicBool,
/// }
///
/// impl Module for Scheduler {
///     fn start(&self) -> Result<(), ModuleError> {
///         self.clock
///             .as_ref()
///             .ok_or_else(|| ModuleError::InitializationError("no clock".into()))?;
///         self.running.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///     fn stop(&self) -> Result<(), ModuleError> {
///         self.running.store(false, Ordering::SeqCst);
///         Ok(())
///     }
///     fn is_running(&self) -> bool {
///         self.running.load(Ordering::SeqCst)
///     }
/// }
///
/// impl ModuleDefinition for Scheduler {
///     fn create() -> Result<Self, ModuleError> {
///         Ok(Self::default())
///     }
///
///     fn dependencies() -> Vec<ModuleRef> {
///         vec![ModuleRef::capability::<dyn Clock>()]
///     }
///
///     fn slots() -> Vec<Slot<Self>> {
///         vec![Slot::of("clock", |m: &mut Self, clock: Arc<dyn Clock>| m.clock = Some(clock))]
///     }
/// }
/// ```
pub trait ModuleDefinition: Module + Sized + 'static {
    /// Build a fresh, not yet started instance
    fn create() -> Result<Self, ModuleError>;

    /// Modules and capabilities that must be active before this one
    fn dependencies() -> Vec<ModuleRef> {
        Vec::new()
    }

    /// The abstract capability this module fulfils, if any
    fn provides() -> Option<Capability<Self>> {
        None
    }

    /// Collaborators to inject from the module's scoped context before `start()`
    fn slots() -> Vec<Slot<Self>> {
        Vec::new()
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module initialization failed: {0}")]
    InitializationError(String),

    #[error("Module operation failed: {0}")]
    OperationError(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Cannot register abstract capability {0} as a module")]
    AbstractModule(String),

    #[error("Module dependency missing: {0}")]
    DependencyMissing(String),

    #[error("Module {module} requires capability {capability}, but no registered module provides it")]
    UnresolvedCapability { module: String, capability: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Operation not allowed while module manager is {0}")]
    InvalidPhase(String),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

impl ModuleError {
    /// Whether this is a configuration error that aborts `init()` as a whole
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ModuleError::UnresolvedCapability { .. }
                | ModuleError::CircularDependency(_)
                | ModuleError::DependencyMissing(_)
        )
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}

impl From<toml::de::Error> for ModuleError {
    fn from(e: toml::de::Error) -> Self {
        ModuleError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
    }
}
