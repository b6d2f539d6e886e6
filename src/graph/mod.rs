//! Generic graph ADT used by the module planner
//!
//! Nodes are identified by value and stored in an arena; adjacency lists hold
//! [`NodeId`] indices rather than references, so a graph with cycles never
//! owns itself and tearing it down is a plain drop.
//!
//! ## Flavors
//!
//! - [`DiGraph`]: `add_edge(a, b)` links `a -> b` only
//! - [`UnGraph`]: `add_edge(a, b)` links both directions, counted once
//!
//! Algorithms live in submodules and work over either flavor:
//!
//! - [`traversal`] - DFS/BFS visitation, path reconstruction, connected components
//! - [`cycle`] - cycle detection for directed graphs
//! - [`topo`] - deterministic topological orderings

pub mod cycle;
pub mod topo;
pub mod traversal;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use thiserror::Error;

pub use cycle::{find_cycle, has_cycle};
pub use topo::{dependency_order, topological_order};
pub use traversal::{bfs, bfs_path, connected_components, dfs, dfs_path};

/// Graph algorithm errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("graph contains a cycle ({unplaced} of {total} nodes could not be ordered)")]
    Cycle { unplaced: usize, total: usize },
}

/// Stable index of a node inside one graph
///
/// Ids are never reused after [`Graph::delete_node`], so an id held across a
/// deletion simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Edge direction marker
pub trait EdgeType {
    /// Whether `add_edge(a, b)` creates only `a -> b`
    const DIRECTED: bool;
}

/// Marker for directed graphs
#[derive(Debug, Clone, Copy, Default)]
pub struct Directed;

/// Marker for undirected graphs
#[derive(Debug, Clone, Copy, Default)]
pub struct Undirected;

impl EdgeType for Directed {
    const DIRECTED: bool = true;
}

impl EdgeType for Undirected {
    const DIRECTED: bool = false;
}

/// A graph node: its value plus ordered outgoing adjacency
///
/// The adjacency list never holds the same neighbor twice.
#[derive(Debug, Clone)]
pub struct Node<T> {
    value: T,
    adjacent: Vec<NodeId>,
}

impl<T> Node<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            adjacent: Vec::new(),
        }
    }

    /// Node value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Outgoing neighbors in insertion order
    pub fn adjacent(&self) -> &[NodeId] {
        &self.adjacent
    }

    /// Add `to` unless already present; returns whether it was added
    fn link(&mut self, to: NodeId) -> bool {
        if self.adjacent.contains(&to) {
            return false;
        }
        self.adjacent.push(to);
        true
    }

    fn unlink(&mut self, to: NodeId) -> bool {
        let before = self.adjacent.len();
        self.adjacent.retain(|&n| n != to);
        before != self.adjacent.len()
    }
}

/// Directed graph
pub type DiGraph<T> = Graph<T, Directed>;

/// Undirected graph
pub type UnGraph<T> = Graph<T, Undirected>;

/// Arena-backed graph keyed by node value
#[derive(Clone)]
pub struct Graph<T, D: EdgeType = Directed> {
    slots: Vec<Option<Node<T>>>,
    index: HashMap<T, NodeId>,
    _direction: PhantomData<D>,
}

impl<T, D> Default for Graph<T, D>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> Graph<T, D>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
{
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            _direction: PhantomData,
        }
    }

    /// Whether edges are one-directional
    pub fn is_directed(&self) -> bool {
        D::DIRECTED
    }

    /// Insert a node, returning its id (existing id if already present)
    pub fn add_node(&mut self, value: T) -> NodeId {
        if let Some(&id) = self.index.get(&value) {
            return id;
        }
        let id = NodeId(self.slots.len());
        self.index.insert(value.clone(), id);
        self.slots.push(Some(Node::new(value)));
        id
    }

    /// Remove a node and every edge that touches it
    ///
    /// Returns `false` if the node was not present.
    pub fn delete_node(&mut self, value: &T) -> bool {
        let Some(id) = self.index.remove(value) else {
            return false;
        };
        self.slots[id.0] = None;
        for node in self.slots.iter_mut().flatten() {
            node.unlink(id);
        }
        true
    }

    /// Add an edge, inserting both endpoints if needed
    ///
    /// Returns `true` if the edge did not exist before.
    pub fn add_edge(&mut self, from: T, to: T) -> bool {
        let a = self.add_node(from);
        let b = self.add_node(to);
        let added = self.node_mut(a).link(b);
        if !D::DIRECTED && a != b {
            self.node_mut(b).link(a);
        }
        added
    }

    /// Remove an edge; returns whether it existed
    pub fn remove_edge(&mut self, from: &T, to: &T) -> bool {
        let (Some(a), Some(b)) = (self.node_id(from), self.node_id(to)) else {
            return false;
        };
        let removed = self.node_mut(a).unlink(b);
        if !D::DIRECTED && a != b {
            self.node_mut(b).unlink(a);
        }
        removed
    }

    /// Whether `from` links to `to`
    pub fn has_edge(&self, from: &T, to: &T) -> bool {
        match (self.node_id(from), self.node_id(to)) {
            (Some(a), Some(b)) => self.adjacent_ids(a).contains(&b),
            _ => false,
        }
    }

    /// Whether the node is present
    pub fn contains(&self, value: &T) -> bool {
        self.index.contains_key(value)
    }

    /// Id of a present node
    pub fn node_id(&self, value: &T) -> Option<NodeId> {
        self.index.get(value).copied()
    }

    /// Node behind an id, if it has not been deleted
    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Number of edges
    ///
    /// Directed: sum of out-degrees. Undirected: each `{a, b}` once.
    pub fn edge_count(&self) -> usize {
        self.live()
            .map(|(id, node)| {
                if D::DIRECTED {
                    node.adjacent.len()
                } else {
                    node.adjacent.iter().filter(|&&n| n >= id).count()
                }
            })
            .sum()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Node values in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &T> + '_ {
        self.live().map(|(_, node)| &node.value)
    }

    /// Outgoing neighbors of `value` in adjacency order (empty if absent)
    pub fn neighbors<'a>(&'a self, value: &T) -> impl Iterator<Item = &'a T> + 'a {
        let adjacent = self
            .node_id(value)
            .map(|id| self.adjacent_ids(id))
            .unwrap_or(&[]);
        adjacent.iter().filter_map(move |&n| self.value_of(n))
    }

    /// Out-degree of `value` (0 if absent)
    pub fn out_degree(&self, value: &T) -> usize {
        self.node_id(value)
            .map(|id| self.adjacent_ids(id).len())
            .unwrap_or(0)
    }

    /// In-degree of `value` (0 if absent)
    pub fn in_degree(&self, value: &T) -> usize {
        let Some(target) = self.node_id(value) else {
            return 0;
        };
        self.live()
            .filter(|(_, node)| node.adjacent.contains(&target))
            .count()
    }

    /// All edges as `(from, to)` pairs
    ///
    /// Undirected graphs report each edge once.
    pub fn edges(&self) -> Vec<(T, T)> {
        let mut out = Vec::with_capacity(self.edge_count());
        for (id, node) in self.live() {
            for &n in &node.adjacent {
                if !D::DIRECTED && n < id {
                    continue;
                }
                if let Some(to) = self.value_of(n) {
                    out.push((node.value.clone(), to.clone()));
                }
            }
        }
        out
    }

    pub(crate) fn live(&self) -> impl Iterator<Item = (NodeId, &Node<T>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeId(i), node)))
    }

    pub(crate) fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.live().map(|(id, _)| id)
    }

    pub(crate) fn adjacent_ids(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.adjacent.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn value_of(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|n| &n.value)
    }

    /// Size of the id space (including deleted slots)
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.slots[id.0].as_mut() {
            Some(node) => node,
            None => unreachable!("indexed node {} has been deleted", id.0),
        }
    }
}

impl<T, D> fmt::Debug for Graph<T, D>
where
    T: Clone + Eq + Hash + fmt::Debug,
    D: EdgeType,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (_, node) in self.live() {
            let targets: Vec<&T> = node
                .adjacent
                .iter()
                .filter_map(|&n| self.value_of(n))
                .collect();
            map.entry(&node.value, &targets);
        }
        map.finish()
    }
}
