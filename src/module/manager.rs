//! Module manager for orchestrating all modules
//!
//! Registers module types (pulling in their declared dependencies), resolves
//! the dependency graph, activates modules in dependency order with their
//! collaborators injected from context, and tears everything down in reverse.
//!
//! ## Failure policy
//!
//! - Configuration errors (cycles, unbound capabilities, missing modules) abort
//!   `init()` before any module is created.
//! - A module whose `create()` or `start()` fails is logged and marked
//!   [`ModuleState::Failed`]; activation continues with the next module.
//! - A missing collaborator is logged and the module starts without it.
//! - `shutdown()` stops every module even if some `stop()` calls fail.
//!
//! The manager is driven from a single controlling thread and does no
//! internal locking. A module that blocks in `start()` or `stop()` blocks the
//! whole sequence.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::module::context::Context;
use crate::module::descriptor::{DescriptorCache, ModuleDescriptor, ModuleRef, TypeKey};
use crate::module::resolver::{plan_load_order, Requirement};
use crate::module::traits::{Module, ModuleDefinition, ModuleError, ModuleState};
use crate::utils::result_to_option;

/// Name of the shared scope the manager creates under the root context
pub const MODULES_SCOPE: &str = "modules";

/// Manager lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerPhase {
    /// Accepting registrations; `init()` not run yet (or it was rejected)
    Idle,
    /// Modules activated; `shutdown()` pending
    Active,
    /// Torn down; the manager cannot be reused
    ShutDown,
}

impl fmt::Display for ManagerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerPhase::Idle => f.write_str("idle"),
            ManagerPhase::Active => f.write_str("active"),
            ManagerPhase::ShutDown => f.write_str("shut down"),
        }
    }
}

/// Managed module instance
struct ManagedModule {
    descriptor: Arc<ModuleDescriptor>,
    state: ModuleState,
    instance: Option<Arc<dyn Module>>,
    any: Option<Arc<dyn Any + Send + Sync>>,
    scope: Option<Context>,
}

impl ManagedModule {
    fn new(descriptor: Arc<ModuleDescriptor>) -> Self {
        Self {
            descriptor,
            state: ModuleState::Registered,
            instance: None,
            any: None,
            scope: None,
        }
    }

    fn is_running(&self) -> bool {
        self.instance.as_ref().is_some_and(|m| m.is_running())
    }

    fn stop(&mut self) {
        let key = self.descriptor.key();
        let Some(instance) = self.instance.as_ref() else {
            return;
        };
        match instance.stop() {
            Ok(()) => {
                if !matches!(self.state, ModuleState::Failed(_)) {
                    self.state = ModuleState::Stopped;
                }
                info!(module = %key, "Module stopped");
            }
            Err(e) => {
                warn!(module = %key, "Error stopping module: {}", e);
                self.state = ModuleState::Failed(e.to_string());
            }
        }
    }
}

/// Module manager coordinates all registered modules
pub struct ModuleManager {
    /// Process-scoped root context supplied by the host
    root: Context,
    /// Shared scope every module is published into (exists while active)
    scope: Option<Context>,
    phase: ManagerPhase,
    cache: DescriptorCache,
    /// Registration order; ties in the load order follow it
    registered: Vec<TypeKey>,
    modules: HashMap<TypeKey, ManagedModule>,
    /// Capability -> bound provider (first registration wins)
    bindings: HashMap<TypeKey, TypeKey>,
    load_order: Vec<TypeKey>,
}

impl ModuleManager {
    /// Create a module manager that activates modules under `root`
    pub fn new(root: Context) -> Self {
        Self {
            root,
            scope: None,
            phase: ManagerPhase::Idle,
            cache: DescriptorCache::new(),
            registered: Vec::new(),
            modules: HashMap::new(),
            bindings: HashMap::new(),
            load_order: Vec::new(),
        }
    }

    /// Register a module type and, recursively, its concrete dependencies
    pub fn register<M: ModuleDefinition>(&mut self) -> Result<(), ModuleError> {
        self.register_ref(ModuleRef::module::<M>())
    }

    /// Register a module by reference
    ///
    /// Registering an abstract capability fails: capabilities are satisfied
    /// by registering a module that provides them.
    pub fn register_ref(&mut self, module: ModuleRef) -> Result<(), ModuleError> {
        self.expect_phase(ManagerPhase::Idle)?;
        if module.is_abstract() {
            return Err(ModuleError::AbstractModule(module.key().name().to_string()));
        }
        self.register_recursive(module)
    }

    fn register_recursive(&mut self, module: ModuleRef) -> Result<(), ModuleError> {
        if self.modules.contains_key(&module.key()) {
            debug!(module = %module.key(), "Module already registered");
            return Ok(());
        }

        let descriptor = self.cache.describe(&module)?;
        let key = descriptor.key();
        self.registered.push(key);
        self.modules
            .insert(key, ManagedModule::new(Arc::clone(&descriptor)));
        info!(module = %key, "Registered module");

        if let Some(capability) = descriptor.provides() {
            self.bind_capability(capability, key);
        }

        for dependency in descriptor.dependencies() {
            if dependency.is_abstract() {
                debug!(
                    module = %key,
                    "Capability {} will be resolved at init",
                    dependency.key()
                );
                continue;
            }
            self.register_recursive(*dependency)?;
        }
        Ok(())
    }

    fn bind_capability(&mut self, capability: TypeKey, provider: TypeKey) {
        match self.bindings.get(&capability) {
            Some(existing) if *existing != provider => {
                warn!(
                    "Conflicting providers for capability {}: keeping {}, ignoring {}",
                    capability, existing, provider
                );
            }
            Some(_) => {}
            None => {
                debug!("Capability {} bound to {}", capability, provider);
                self.bindings.insert(capability, provider);
            }
        }
    }

    /// Resolve the dependency graph and activate every registered module
    ///
    /// Configuration errors are returned before any module is created and
    /// leave the manager idle. Per-module failures are logged and do not stop
    /// the remaining modules from starting.
    pub fn init(&mut self) -> Result<(), ModuleError> {
        self.expect_phase(ManagerPhase::Idle)?;
        info!("Initializing {} modules", self.registered.len());

        let modules: Vec<(TypeKey, Vec<Requirement<TypeKey>>)> = self
            .registered
            .iter()
            .filter_map(|key| self.modules.get(key))
            .map(|managed| {
                let requirements = managed
                    .descriptor
                    .dependencies()
                    .iter()
                    .map(|dependency| {
                        if dependency.is_abstract() {
                            Requirement::Capability(dependency.key())
                        } else {
                            Requirement::Module(dependency.key())
                        }
                    })
                    .collect();
                (managed.descriptor.key(), requirements)
            })
            .collect();

        let plan = plan_load_order(&modules, &self.bindings).map_err(|e| {
            error!("Module configuration rejected: {}", e);
            e
        })?;

        let shared = self.root.create_child(MODULES_SCOPE)?;
        for key in &plan.order {
            self.activate(*key, &shared);
        }

        let running = self.modules.values().filter(|m| m.is_running()).count();
        info!(
            "Module initialization complete: {} of {} modules running",
            running,
            plan.order.len()
        );
        self.load_order = plan.order;
        self.scope = Some(shared);
        self.phase = ManagerPhase::Active;
        Ok(())
    }

    /// Instantiate, wire, publish and start one module, recovering from failures
    fn activate(&mut self, key: TypeKey, shared: &Context) {
        let Some(managed) = self.modules.get_mut(&key) else {
            return;
        };
        let bound = managed
            .descriptor
            .provides()
            .is_some_and(|capability| self.bindings.get(&capability) == Some(&key));

        let active = match managed.descriptor.activate(shared, bound) {
            Ok(active) => active,
            Err(e) => {
                error!(module = %key, "Failed to instantiate module: {}", e);
                managed.state = ModuleState::Failed(e.to_string());
                return;
            }
        };
        managed.state = ModuleState::Instantiated;
        managed.scope = Some(active.scope);
        managed.any = Some(active.any);
        let instance = managed.instance.insert(active.instance);

        if instance.is_running() {
            debug!(module = %key, "Module already running, not starting again");
            managed.state = ModuleState::Running;
            return;
        }
        match instance.start() {
            Ok(()) => {
                managed.state = ModuleState::Running;
                info!(module = %key, "Module started");
            }
            Err(e) => {
                error!(module = %key, "Failed to start module: {}", e);
                managed.state = ModuleState::Failed(e.to_string());
            }
        }
    }

    /// Release the shared scope and stop every module in reverse load order
    ///
    /// Individual `stop()` failures are logged; every module still gets its
    /// turn. Calling this when the manager is not active is an error and
    /// changes nothing.
    pub fn shutdown(&mut self) -> Result<(), ModuleError> {
        self.expect_phase(ManagerPhase::Active)?;
        info!("Shutting down module manager");

        if let Some(scope) = self.scope.take() {
            result_to_option(scope.release(), "Error releasing module scope");
        }

        for key in self.load_order.iter().rev() {
            if let Some(managed) = self.modules.get_mut(key) {
                managed.stop();
            }
        }

        for key in &self.registered {
            if let Some(managed) = self.modules.get_mut(key) {
                if managed.is_running() {
                    warn!(module = %key, "Module still running after shutdown pass, stopping again");
                    managed.stop();
                }
            }
        }

        self.modules.clear();
        self.registered.clear();
        self.bindings.clear();
        self.load_order.clear();
        self.cache.clear();
        self.phase = ManagerPhase::ShutDown;
        info!("Module manager shut down");
        Ok(())
    }

    /// Running (or at least instantiated) instance of `M`
    pub fn get_module<M: ModuleDefinition>(&self) -> Option<Arc<M>> {
        let any = self.modules.get(&TypeKey::of::<M>())?.any.clone()?;
        any.downcast::<M>().ok()
    }

    /// Instance published under capability `K`
    pub fn get_capability<K>(&self) -> Option<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        self.scope.as_ref()?.get_local::<K>()
    }

    /// Lifecycle state of a registered module
    pub fn state_of(&self, key: TypeKey) -> Option<ModuleState> {
        self.modules.get(&key).map(|m| m.state.clone())
    }

    /// Lifecycle state of `M`
    pub fn state<M: ModuleDefinition>(&self) -> Option<ModuleState> {
        self.state_of(TypeKey::of::<M>())
    }

    /// Whether `M` has been registered
    pub fn is_registered<M: ModuleDefinition>(&self) -> bool {
        self.modules.contains_key(&TypeKey::of::<M>())
    }

    /// Registered modules in registration order
    pub fn registered(&self) -> &[TypeKey] {
        &self.registered
    }

    /// Activation order computed by `init()`
    pub fn load_order(&self) -> &[TypeKey] {
        &self.load_order
    }

    /// Provider bound to `capability`
    pub fn capability_provider(&self, capability: TypeKey) -> Option<TypeKey> {
        self.bindings.get(&capability).copied()
    }

    /// Scoped context of an activated module
    pub fn module_scope(&self, key: TypeKey) -> Option<Context> {
        self.modules.get(&key)?.scope.clone()
    }

    /// Shared scope modules are published into (while active)
    pub fn scope(&self) -> Option<&Context> {
        self.scope.as_ref()
    }

    /// Root context supplied at construction
    pub fn root(&self) -> &Context {
        &self.root
    }

    /// Current phase
    pub fn phase(&self) -> ManagerPhase {
        self.phase
    }

    fn expect_phase(&self, expected: ManagerPhase) -> Result<(), ModuleError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ModuleError::InvalidPhase(self.phase.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Standalone {
        running: AtomicBool,
    }

    impl Module for Standalone {
        fn start(&self) -> Result<(), ModuleError> {
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn stop(&self) -> Result<(), ModuleError> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }
        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    impl ModuleDefinition for Standalone {
        fn create() -> Result<Self, ModuleError> {
            Ok(Self::default())
        }
    }

    trait Feature: Send + Sync {}

    #[test]
    fn test_manager_creation() {
        let manager = ModuleManager::new(Context::root());
        assert_eq!(manager.phase(), ManagerPhase::Idle);
        assert!(manager.registered().is_empty());
        assert!(manager.scope().is_none());
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut manager = ModuleManager::new(Context::root());
        manager.register::<Standalone>().unwrap();
        manager.register::<Standalone>().unwrap();
        assert_eq!(manager.registered().len(), 1);
        assert_eq!(manager.state::<Standalone>(), Some(ModuleState::Registered));
    }

    #[test]
    fn test_register_abstract_fails() {
        let mut manager = ModuleManager::new(Context::root());
        let err = manager
            .register_ref(ModuleRef::capability::<dyn Feature>())
            .unwrap_err();
        assert!(matches!(err, ModuleError::AbstractModule(_)));
    }

    #[test]
    fn test_phase_transitions() {
        let root = Context::root();
        let mut manager = ModuleManager::new(root.clone());
        manager.register::<Standalone>().unwrap();
        manager.init().unwrap();
        assert_eq!(manager.phase(), ManagerPhase::Active);
        assert!(matches!(manager.init(), Err(ModuleError::InvalidPhase(_))));
        assert!(matches!(
            manager.register::<Standalone>(),
            Err(ModuleError::InvalidPhase(_))
        ));
        assert_eq!(root.children().len(), 1);

        manager.shutdown().unwrap();
        assert_eq!(manager.phase(), ManagerPhase::ShutDown);
        assert!(root.children().is_empty());
        assert!(!root.is_released());
        assert!(matches!(manager.shutdown(), Err(ModuleError::InvalidPhase(_))));
    }

    #[test]
    fn test_get_module_after_init() {
        let mut manager = ModuleManager::new(Context::root());
        manager.register::<Standalone>().unwrap();
        assert!(manager.get_module::<Standalone>().is_none());
        manager.init().unwrap();
        let module = manager.get_module::<Standalone>().unwrap();
        assert!(module.is_running());
        let scope = manager.module_scope(TypeKey::of::<Standalone>()).unwrap();
        assert_eq!(scope.name(), "Standalone");

        manager.shutdown().unwrap();
        assert!(!module.is_running());
        assert!(manager.get_module::<Standalone>().is_none());
        assert!(scope.is_released());
    }
}
