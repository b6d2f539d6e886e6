//! Module dependency resolution
//!
//! Turns a set of modules and their requirements into a dependency graph and
//! a load order (dependencies first). Used by the [`ModuleManager`] for
//! compiled-in module types and by the manifest planner for `module.toml`
//! sets, so both reject the same configurations the same way.
//!
//! Edges point from a dependent to each of its dependencies. Every node's
//! out-edges therefore name only its own dependencies, which is what lets
//! [`dependency_order`] read "zero unresolved outgoing edges" as "everything
//! this module needs is already placed".
//!
//! [`ModuleManager`]: crate::module::manager::ModuleManager

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use tracing::debug;

use crate::graph::{dependency_order, find_cycle, DiGraph};
use crate::module::traits::ModuleError;

/// One thing a module needs before it can start
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement<K> {
    /// A specific module
    Module(K),
    /// Whichever module is bound to this capability
    Capability(K),
}

/// Resolved dependency graph and the order to activate it in
#[derive(Debug, Clone)]
pub struct LoadPlan<K: Clone + Eq + Hash> {
    /// Activation order, dependencies first
    pub order: Vec<K>,
    /// Dependent -> dependency edges with capabilities already resolved
    pub graph: DiGraph<K>,
}

impl<K: Clone + Eq + Hash> LoadPlan<K> {
    /// Teardown order (exact reverse of the activation order)
    pub fn shutdown_order(&self) -> Vec<K> {
        self.order.iter().rev().cloned().collect()
    }

    /// Resolved direct dependencies of `module`
    pub fn dependencies_of(&self, module: &K) -> Vec<K> {
        self.graph.neighbors(module).cloned().collect()
    }
}

/// Build the dependency graph, reject bad configurations and order it
///
/// `modules` must be in registration order; ties in the load order are
/// broken by it. `bindings` maps each capability to its provider.
///
/// # Errors
///
/// - [`ModuleError::DependencyMissing`] if a module names a module outside the set
/// - [`ModuleError::UnresolvedCapability`] if no provider is bound for a capability
/// - [`ModuleError::CircularDependency`] if the graph has a cycle
pub fn plan_load_order<K>(
    modules: &[(K, Vec<Requirement<K>>)],
    bindings: &HashMap<K, K>,
) -> Result<LoadPlan<K>, ModuleError>
where
    K: Clone + Eq + Hash + Display,
{
    let mut graph = DiGraph::new();
    for (module, _) in modules {
        graph.add_node(module.clone());
    }

    for (module, requirements) in modules {
        for requirement in requirements {
            let target = match requirement {
                Requirement::Module(dependency) => dependency,
                Requirement::Capability(capability) => {
                    bindings
                        .get(capability)
                        .ok_or_else(|| ModuleError::UnresolvedCapability {
                            module: format!("{:#}", module),
                            capability: format!("{:#}", capability),
                        })?
                }
            };
            if !graph.contains(target) {
                return Err(ModuleError::DependencyMissing(format!(
                    "{:#} requires {:#}, which is not registered",
                    module, target
                )));
            }
            graph.add_edge(module.clone(), target.clone());
        }
    }

    if let Some(cycle) = find_cycle(&graph) {
        let path: Vec<String> = cycle.iter().map(|k| format!("{:#}", k)).collect();
        return Err(ModuleError::CircularDependency(path.join(" -> ")));
    }

    let order = dependency_order(&graph)
        .map_err(|e| ModuleError::CircularDependency(e.to_string()))?;

    debug!(
        "Dependency resolution complete: {}",
        order
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(LoadPlan { order, graph })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, requirements: &[Requirement<&'static str>]) -> (String, Vec<Requirement<String>>) {
        let requirements = requirements
            .iter()
            .map(|r| match r {
                Requirement::Module(m) => Requirement::Module(m.to_string()),
                Requirement::Capability(c) => Requirement::Capability(c.to_string()),
            })
            .collect();
        (name.to_string(), requirements)
    }

    fn bindings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn test_capability_resolution_orders_provider_first() {
        let modules = vec![
            module("c", &[Requirement::Capability("k")]),
            module("b", &[Requirement::Module("a")]),
            module("a", &[]),
        ];
        let plan = plan_load_order(&modules, &bindings(&[("k", "b")])).unwrap();
        assert_eq!(plan.order, vec!["a", "b", "c"]);
        assert_eq!(plan.shutdown_order(), vec!["c", "b", "a"]);
        assert_eq!(plan.dependencies_of(&"c".to_string()), vec!["b"]);
    }

    #[test]
    fn test_out_edges_are_own_dependencies_only() {
        let modules = vec![
            module("app", &[Requirement::Module("db"), Requirement::Module("log")]),
            module("db", &[Requirement::Module("log")]),
            module("log", &[]),
        ];
        let plan = plan_load_order(&modules, &HashMap::new()).unwrap();
        for (name, requirements) in &modules {
            let declared: Vec<String> = requirements
                .iter()
                .map(|r| match r {
                    Requirement::Module(m) | Requirement::Capability(m) => m.clone(),
                })
                .collect();
            assert_eq!(plan.dependencies_of(name), declared);
        }
        assert_eq!(plan.order, vec!["log", "db", "app"]);
    }

    #[test]
    fn test_unbound_capability_is_fatal() {
        let modules = vec![module("c", &[Requirement::Capability("k")])];
        let err = plan_load_order(&modules, &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::UnresolvedCapability { ref module, ref capability }
                if module == "c" && capability == "k"
        ));
    }

    #[test]
    fn test_missing_module_is_fatal() {
        let modules = vec![module("c", &[Requirement::Module("ghost")])];
        let err = plan_load_order(&modules, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ModuleError::DependencyMissing(_)));
    }

    #[test]
    fn test_cycle_is_reported_with_path() {
        let modules = vec![
            module("x", &[Requirement::Module("y")]),
            module("y", &[Requirement::Module("x")]),
        ];
        match plan_load_order(&modules, &HashMap::new()) {
            Err(ModuleError::CircularDependency(path)) => assert_eq!(path, "x -> y -> x"),
            other => panic!("expected cycle, got {:?}", other.map(|p| p.order)),
        }
    }

    mod left {
        pub struct Cache;
    }

    mod right {
        pub struct Cache;
    }

    #[test]
    fn test_type_key_errors_use_full_paths() {
        use crate::module::TypeKey;

        let left = TypeKey::of::<left::Cache>();
        let right = TypeKey::of::<right::Cache>();
        let modules = vec![
            (left, vec![Requirement::Module(right)]),
            (right, vec![Requirement::Module(left)]),
        ];
        match plan_load_order(&modules, &HashMap::new()) {
            Err(ModuleError::CircularDependency(path)) => {
                assert!(path.contains("left::Cache"), "{}", path);
                assert!(path.contains("right::Cache"), "{}", path);
            }
            other => panic!("expected cycle, got {:?}", other.map(|p| p.order)),
        }

        let modules = vec![(left, vec![Requirement::Capability(TypeKey::of::<dyn Send>())])];
        match plan_load_order(&modules, &HashMap::new()) {
            Err(ModuleError::UnresolvedCapability { module, .. }) => {
                assert!(module.ends_with("left::Cache"), "{}", module)
            }
            other => panic!("expected unresolved capability, got {:?}", other.map(|p| p.order)),
        }
        assert_eq!(left.to_string(), "Cache");
    }
}
