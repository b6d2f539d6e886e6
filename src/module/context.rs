//! Scoped contexts
//!
//! A [`Context`] is a node in a tree of type-keyed registries. The host
//! creates one root per process; the module manager hangs a shared scope
//! under it and a child scope per activated module.
//!
//! ## Lookup
//!
//! `get::<T>()` checks the local registry, then each ancestor's own registry
//! walking up, then the context's descendants breadth-first. A value placed in
//! one child is therefore visible from that child and everything below it
//! (and from the ancestors' downward search), but never from a sibling.
//!
//! ## Release
//!
//! `release()` releases children first, then every tracked [`Releasable`]
//! in reverse insertion order, clears the registry and detaches from the
//! parent. Releasing twice is an error ([`ContextError::AlreadyReleased`]);
//! so is writing into a released context. Lookups on a released context
//! find nothing.
//!
//! The registry lock only guards the map itself. Reading from other threads
//! while the controlling thread releases the tree is the caller's problem.

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// An entry that needs explicit teardown when its context is released
pub trait Releasable: Send + Sync {
    /// Free whatever the entry holds
    fn release(&self) -> anyhow::Result<()>;
}

/// Context errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Context {0} has already been released")]
    AlreadyReleased(String),
}

struct Entry {
    type_name: &'static str,
    /// Always an `Arc<T>` for the key's `T`
    value: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct State {
    released: bool,
    entries: HashMap<TypeId, Entry>,
    releasables: Vec<(TypeId, Arc<dyn Releasable>)>,
    children: Vec<Context>,
}

struct Inner {
    id: Uuid,
    name: String,
    parent: Option<Weak<Inner>>,
    state: RwLock<State>,
}

/// Handle to a scoped registry; clones share the same context
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Create a parentless root context
    pub fn root() -> Self {
        Self::with_parent("root".to_string(), None)
    }

    fn with_parent(name: String, parent: Option<Weak<Inner>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                name,
                parent,
                state: RwLock::new(State::default()),
            }),
        }
    }

    /// Create a child context owned by this one
    pub fn create_child(&self, name: impl Into<String>) -> Result<Context, ContextError> {
        let mut state = self.write();
        if state.released {
            return Err(self.released_error());
        }
        let child = Self::with_parent(name.into(), Some(Arc::downgrade(&self.inner)));
        debug!("Created context {} under {}", child.name(), self.name());
        state.children.push(child.clone());
        Ok(child)
    }

    /// Store `value` keyed by `T`, replacing any previous `T`
    ///
    /// `T` may be a trait object: `put::<dyn Storage>(disk)`.
    pub fn put<T>(&self, value: Arc<T>) -> Result<(), ContextError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert(value, None)
    }

    /// Store `value` keyed by `T` and release it when this context is released
    pub fn put_releasable<T>(&self, value: Arc<T>) -> Result<(), ContextError>
    where
        T: Releasable + 'static,
    {
        let tracked: Arc<dyn Releasable> = value.clone();
        self.insert(value, Some(tracked))
    }

    fn insert<T>(
        &self,
        value: Arc<T>,
        tracked: Option<Arc<dyn Releasable>>,
    ) -> Result<(), ContextError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeId::of::<T>();
        let incoming = Arc::as_ptr(&value) as *const ();
        let displaced = {
            let mut state = self.write();
            if state.released {
                return Err(self.released_error());
            }
            state.entries.insert(
                key,
                Entry {
                    type_name: type_name::<T>(),
                    value: Box::new(value),
                },
            );
            let displaced = take_tracked(&mut state.releasables, key);
            match (tracked, displaced) {
                (Some(tracked), displaced) => {
                    state.releasables.push((key, tracked));
                    displaced
                }
                // Re-storing the tracked value keeps it tracked
                (None, Some(old)) if Arc::as_ptr(&old) as *const () == incoming => {
                    state.releasables.push((key, old));
                    None
                }
                (None, displaced) => displaced,
            }
        };

        // A replaced releasable can no longer be reached for teardown
        if let Some(old) = displaced {
            if Arc::as_ptr(&old) as *const () != incoming {
                release_one(self.name(), type_name::<T>(), &old);
            }
        }
        Ok(())
    }

    /// Look up `T` here, then in ancestors, then in descendants
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.is_released() {
            return None;
        }
        if let Some(found) = self.get_local::<T>() {
            return Some(found);
        }

        let mut ancestor = self.parent();
        while let Some(context) = ancestor {
            if let Some(found) = context.get_local::<T>() {
                return Some(found);
            }
            ancestor = context.parent();
        }

        let mut queue: VecDeque<Context> = self.children().into();
        while let Some(context) = queue.pop_front() {
            if let Some(found) = context.get_local::<T>() {
                return Some(found);
            }
            queue.extend(context.children());
        }
        None
    }

    /// Look up `T` in this context's own registry only
    pub fn get_local<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let state = self.read();
        if state.released {
            return None;
        }
        state
            .entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Whether `get::<T>()` would find something
    pub fn has<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get::<T>().is_some()
    }

    /// Whether `T` is in this context's own registry
    pub fn contains_local<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.read().entries.contains_key(&TypeId::of::<T>())
    }

    /// Remove `T` from the local registry, releasing it if it is tracked
    ///
    /// Returns whether an entry was removed.
    pub fn release_entry<T>(&self) -> Result<bool, ContextError>
    where
        T: ?Sized + 'static,
    {
        let key = TypeId::of::<T>();
        let (removed, tracked) = {
            let mut state = self.write();
            if state.released {
                return Err(self.released_error());
            }
            let removed = state.entries.remove(&key);
            (removed, take_tracked(&mut state.releasables, key))
        };
        if let Some(tracked) = tracked {
            release_one(self.name(), type_name::<T>(), &tracked);
        }
        Ok(removed.is_some())
    }

    /// Release children, tracked entries and the registry, then detach
    pub fn release(&self) -> Result<(), ContextError> {
        let children = {
            let mut state = self.write();
            if state.released {
                return Err(self.released_error());
            }
            state.released = true;
            std::mem::take(&mut state.children)
        };

        for child in children {
            if let Err(e) = child.release() {
                debug!("Skipping child of {}: {}", self.name(), e);
            }
        }

        let (entries, releasables) = {
            let mut state = self.write();
            (
                std::mem::take(&mut state.entries),
                std::mem::take(&mut state.releasables),
            )
        };
        for (key, tracked) in releasables.into_iter().rev() {
            let name = entries.get(&key).map_or("<removed>", |e| e.type_name);
            release_one(self.name(), name, &tracked);
        }
        drop(entries);

        if let Some(parent) = self.parent() {
            parent
                .write()
                .children
                .retain(|c| !Arc::ptr_eq(&c.inner, &self.inner));
        }
        debug!("Released context {}", self.name());
        Ok(())
    }

    /// Parent context, if this is not a root and the parent is still alive
    pub fn parent(&self) -> Option<Context> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Context { inner })
    }

    /// Live child contexts in creation order
    pub fn children(&self) -> Vec<Context> {
        self.read().children.clone()
    }

    /// Whether `release()` has run
    pub fn is_released(&self) -> bool {
        self.read().released
    }

    /// Context name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unique instance id
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Number of entries in the local registry
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Whether the local registry is empty
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    fn released_error(&self) -> ContextError {
        ContextError::AlreadyReleased(self.name().to_string())
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        let mut entries: Vec<&str> = state.entries.values().map(|e| e.type_name).collect();
        entries.sort_unstable();
        f.debug_struct("Context")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("released", &state.released)
            .field("entries", &entries)
            .field("children", &state.children.len())
            .finish()
    }
}

fn take_tracked(
    releasables: &mut Vec<(TypeId, Arc<dyn Releasable>)>,
    key: TypeId,
) -> Option<Arc<dyn Releasable>> {
    let position = releasables.iter().position(|(k, _)| *k == key)?;
    Some(releasables.remove(position).1)
}

fn release_one(context: &str, entry: &str, tracked: &Arc<dyn Releasable>) {
    match tracked.release() {
        Ok(()) => debug!("Released {} in context {}", entry, context),
        Err(e) => warn!("Failed to release {} in context {}: {}", entry, context, e),
    }
}
