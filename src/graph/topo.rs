//! Topological ordering (Kahn's algorithm)
//!
//! Both orderings break ties by insertion order, so the same graph built in
//! the same order always yields the same sequence.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hash::Hash;

use super::{DiGraph, GraphError, NodeId};

/// Order where every edge `u -> v` has `u` before `v`
///
/// Fails with [`GraphError::Cycle`] exactly when the graph has a cycle.
pub fn topological_order<T>(graph: &DiGraph<T>) -> Result<Vec<T>, GraphError>
where
    T: Clone + Eq + Hash,
{
    let mut pending = vec![0usize; graph.capacity()];
    for (_, node) in graph.live() {
        for &to in node.adjacent() {
            pending[to.0] += 1;
        }
    }
    // Successors unlock once all their predecessors are placed
    let successors: Vec<Vec<NodeId>> = (0..graph.capacity())
        .map(|i| graph.adjacent_ids(NodeId(i)).to_vec())
        .collect();
    kahn(graph, pending, &successors)
}

/// Order where every edge `u -> v` has `v` before `u`
///
/// Edges read as "depends on": a node is placed only once everything it
/// points at has been placed, i.e. dependencies first, dependents last.
pub fn dependency_order<T>(graph: &DiGraph<T>) -> Result<Vec<T>, GraphError>
where
    T: Clone + Eq + Hash,
{
    let mut pending = vec![0usize; graph.capacity()];
    let mut dependents: Vec<Vec<NodeId>> = vec![Vec::new(); graph.capacity()];
    for (id, node) in graph.live() {
        pending[id.0] = node.adjacent().len();
        for &to in node.adjacent() {
            dependents[to.0].push(id);
        }
    }
    kahn(graph, pending, &dependents)
}

/// Place nodes whose `pending` count is zero, decrementing `unlocks` as we go
fn kahn<T>(
    graph: &DiGraph<T>,
    mut pending: Vec<usize>,
    unlocks: &[Vec<NodeId>],
) -> Result<Vec<T>, GraphError>
where
    T: Clone + Eq + Hash,
{
    let mut ready: BinaryHeap<Reverse<NodeId>> = graph
        .live_ids()
        .filter(|id| pending[id.0] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(id)) = ready.pop() {
        if let Some(value) = graph.value_of(id) {
            order.push(value.clone());
        }
        for &next in &unlocks[id.0] {
            pending[next.0] -= 1;
            if pending[next.0] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != graph.node_count() {
        return Err(GraphError::Cycle {
            unplaced: graph.node_count() - order.len(),
            total: graph.node_count(),
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::has_cycle;

    #[test]
    fn test_chain_orders_are_reverses() {
        let mut g = DiGraph::new();
        g.add_edge("c", "b");
        g.add_edge("b", "a");
        assert_eq!(topological_order(&g).unwrap(), vec!["c", "b", "a"]);
        assert_eq!(dependency_order(&g).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let mut g = DiGraph::new();
        g.add_node("z");
        g.add_node("m");
        g.add_node("a");
        g.add_edge("m", "a");
        assert_eq!(topological_order(&g).unwrap(), vec!["z", "m", "a"]);
        assert_eq!(dependency_order(&g).unwrap(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_cycle_fails_both_orders() {
        let mut g = DiGraph::new();
        g.add_edge("root", "x");
        g.add_edge("x", "y");
        g.add_edge("y", "x");
        assert!(has_cycle(&g));
        assert_eq!(
            topological_order(&g),
            Err(GraphError::Cycle { unplaced: 2, total: 3 })
        );
        assert_eq!(
            dependency_order(&g),
            Err(GraphError::Cycle { unplaced: 3, total: 3 })
        );
    }

    #[test]
    fn test_deleted_nodes_are_ignored() {
        let mut g = DiGraph::new();
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        g.delete_node(&2);
        assert_eq!(topological_order(&g).unwrap(), vec![1, 3]);
    }
}
