//! Module descriptors
//!
//! A [`ModuleDescriptor`] is the cached, type-erased view of a
//! [`ModuleDefinition`]: its key, what it depends on, which capability it
//! provides, and how to activate it. Dependencies are expressed as
//! [`ModuleRef`]s, which are either concrete (they know how to describe the
//! referenced module) or abstract capabilities that must be bound to a
//! concrete provider before the dependency graph is built.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::module::context::{Context, ContextError};
use crate::module::traits::{Module, ModuleDefinition, ModuleError};

/// Identity of a module or capability type
///
/// Equality and hashing use the `TypeId` only; the name is carried for logs
/// and error messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T` (trait objects allowed, e.g. `TypeKey::of::<dyn Storage>()`)
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Underlying `TypeId`
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path or generic arguments
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Short name; the alternate form (`{:#}`) prints the full path
impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str(self.name)
        } else {
            f.write_str(self.short_name())
        }
    }
}

/// Reference to a dependency: a concrete module type or an abstract capability
#[derive(Clone, Copy)]
pub struct ModuleRef {
    key: TypeKey,
    describe: Option<fn() -> ModuleDescriptor>,
}

impl ModuleRef {
    /// Concrete module dependency
    pub fn module<M: ModuleDefinition>() -> Self {
        Self {
            key: TypeKey::of::<M>(),
            describe: Some(ModuleDescriptor::of::<M>),
        }
    }

    /// Abstract capability dependency, satisfied by whichever registered
    /// module provides `K`
    pub fn capability<K: ?Sized + 'static>() -> Self {
        Self {
            key: TypeKey::of::<K>(),
            describe: None,
        }
    }

    /// Referenced type
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Whether this names a capability rather than a module
    pub fn is_abstract(&self) -> bool {
        self.describe.is_none()
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_abstract() {
            write!(f, "capability {:?}", self.key)
        } else {
            write!(f, "module {:?}", self.key)
        }
    }
}

type BindFn<M> = Box<dyn Fn(Arc<M>, &Context) -> Result<(), ContextError> + Send + Sync>;

/// Capability a module provides, with the upcast used to publish it
pub struct Capability<M> {
    key: TypeKey,
    bind: BindFn<M>,
}

impl<M: Send + Sync + 'static> Capability<M> {
    /// Declare that `M` provides `K`
    ///
    /// `upcast` is normally just a coercion: `|m: Arc<Self>| m as Arc<dyn K>`.
    pub fn new<K, F>(upcast: F) -> Self
    where
        K: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<M>) -> Arc<K> + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<K>(),
            bind: Box::new(move |module, context| context.put::<K>(upcast(module))),
        }
    }

    /// Capability type
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Register `module` in `context` under the capability key
    pub(crate) fn bind(&self, module: Arc<M>, context: &Context) -> Result<(), ContextError> {
        (self.bind)(module, context)
    }
}

/// What a slot asks the context for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTarget {
    /// A value registered under this type
    Type(TypeKey),
    /// The module's own scoped context
    Scope,
}

impl fmt::Display for SlotTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotTarget::Type(key) => write!(f, "{}", key),
            SlotTarget::Scope => f.write_str("scope"),
        }
    }
}

type AssignFn<M> = Box<dyn Fn(&mut M, &Context) -> bool + Send + Sync>;

/// An injectable collaborator: slot name, wanted type, and its setter
pub struct Slot<M> {
    name: &'static str,
    target: SlotTarget,
    assign: AssignFn<M>,
}

impl<M: 'static> Slot<M> {
    /// Fill `name` with the `T` found in the module's scoped context
    pub fn of<T, F>(name: &'static str, set: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut M, Arc<T>) + Send + Sync + 'static,
    {
        Self {
            name,
            target: SlotTarget::Type(TypeKey::of::<T>()),
            assign: Box::new(move |module, scope| match scope.get::<T>() {
                Some(value) => {
                    set(module, value);
                    true
                }
                None => false,
            }),
        }
    }

    /// Fill `name` with the module's own scoped context
    pub fn scope<F>(name: &'static str, set: F) -> Self
    where
        F: Fn(&mut M, Context) + Send + Sync + 'static,
    {
        Self {
            name,
            target: SlotTarget::Scope,
            assign: Box::new(move |module, scope| {
                set(module, scope.clone());
                true
            }),
        }
    }

    /// Slot name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// What the slot wants
    pub fn target(&self) -> SlotTarget {
        self.target
    }

    /// Resolve against `scope` and assign; returns `false` if nothing was found
    pub(crate) fn inject(&self, module: &mut M, scope: &Context) -> bool {
        (self.assign)(module, scope)
    }
}

/// A module that has been instantiated, wired and published
pub(crate) struct ActiveModule {
    pub(crate) instance: Arc<dyn Module>,
    pub(crate) any: Arc<dyn Any + Send + Sync>,
    pub(crate) scope: Context,
}

type ActivateFn = fn(&ModuleDescriptor, &Context, bool) -> Result<ActiveModule, ModuleError>;

/// Slot setters and capability upcast of one module type, built at derivation
struct Wiring<M> {
    slots: Vec<Slot<M>>,
    provides: Option<Capability<M>>,
}

/// Cached per-type module metadata
///
/// Two descriptors are equal iff they describe the same module type.
pub struct ModuleDescriptor {
    key: TypeKey,
    dependencies: Vec<ModuleRef>,
    provides: Option<TypeKey>,
    slots: Vec<(&'static str, SlotTarget)>,
    /// Always a `Wiring<M>` for the key's `M`
    wiring: Box<dyn Any + Send + Sync>,
    activate: ActivateFn,
}

impl ModuleDescriptor {
    /// Derive the descriptor of `M`
    pub fn of<M: ModuleDefinition>() -> Self {
        let wiring = Wiring::<M> {
            slots: M::slots(),
            provides: M::provides(),
        };
        Self {
            key: TypeKey::of::<M>(),
            dependencies: M::dependencies(),
            provides: wiring.provides.as_ref().map(Capability::key),
            slots: wiring.slots.iter().map(|s| (s.name(), s.target())).collect(),
            wiring: Box::new(wiring),
            activate: activate::<M>,
        }
    }

    /// Module type
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Short module name
    pub fn name(&self) -> &'static str {
        self.key.short_name()
    }

    /// Declared dependencies, in declaration order
    pub fn dependencies(&self) -> &[ModuleRef] {
        &self.dependencies
    }

    /// Provided capability, if any
    pub fn provides(&self) -> Option<TypeKey> {
        self.provides
    }

    /// Declared injection slots
    pub fn slots(&self) -> &[(&'static str, SlotTarget)] {
        &self.slots
    }

    /// Instantiate, wire and publish the module into `shared`
    ///
    /// `bind_capability` is false for a provider that lost its capability
    /// to an earlier registration.
    pub(crate) fn activate(
        &self,
        shared: &Context,
        bind_capability: bool,
    ) -> Result<ActiveModule, ModuleError> {
        (self.activate)(self, shared, bind_capability)
    }
}

impl PartialEq for ModuleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ModuleDescriptor {}

impl Hash for ModuleDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("key", &self.key)
            .field("dependencies", &self.dependencies)
            .field("provides", &self.provides)
            .field("slots", &self.slots)
            .finish()
    }
}

fn activate<M: ModuleDefinition>(
    descriptor: &ModuleDescriptor,
    shared: &Context,
    bind_capability: bool,
) -> Result<ActiveModule, ModuleError> {
    let key = TypeKey::of::<M>();
    let wiring = descriptor
        .wiring
        .downcast_ref::<Wiring<M>>()
        .ok_or_else(|| {
            ModuleError::InitializationError(format!(
                "Descriptor {:#} is not for {:#}",
                descriptor.key, key
            ))
        })?;
    let mut module = M::create()?;
    let scope = shared.create_child(key.short_name())?;

    for slot in &wiring.slots {
        if slot.inject(&mut module, &scope) {
            debug!(module = %key, slot = slot.name(), "Injected {}", slot.target());
        } else {
            warn!(
                module = %key,
                slot = slot.name(),
                "Collaborator {} not found in context, continuing without it",
                slot.target()
            );
        }
    }

    let module = Arc::new(module);
    shared.put::<M>(Arc::clone(&module))?;
    if bind_capability {
        if let Some(capability) = &wiring.provides {
            capability.bind(Arc::clone(&module), shared)?;
            debug!(module = %key, "Published as capability {}", capability.key());
        }
    }

    let instance: Arc<dyn Module> = module.clone();
    let any: Arc<dyn Any + Send + Sync> = module;
    Ok(ActiveModule {
        instance,
        any,
        scope,
    })
}

/// Descriptor cache: each module type is derived once, setters included
#[derive(Default)]
pub struct DescriptorCache {
    entries: HashMap<TypeKey, Arc<ModuleDescriptor>>,
}

impl DescriptorCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for a concrete module reference, derived on first use
    ///
    /// Abstract capabilities cannot be described; they must be bound to a
    /// concrete provider first.
    pub fn describe(&mut self, module: &ModuleRef) -> Result<Arc<ModuleDescriptor>, ModuleError> {
        if let Some(found) = self.entries.get(&module.key) {
            return Ok(Arc::clone(found));
        }
        let describe = module
            .describe
            .ok_or_else(|| ModuleError::AbstractModule(module.key.name().to_string()))?;
        let descriptor = Arc::new(describe());
        debug!("Derived descriptor for {}", descriptor.key());
        self.entries
            .insert(module.key, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Previously derived descriptor
    pub fn get(&self, key: &TypeKey) -> Option<Arc<ModuleDescriptor>> {
        self.entries.get(key).cloned()
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been described yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached descriptor
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
