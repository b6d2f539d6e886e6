//! Graph traversal
//!
//! Depth-first and breadth-first visitation, path reconstruction and
//! connected components. Everything here works on [`Graph`] regardless of
//! edge direction.
//!
//! A root that is not in the graph has no adjacency, so traversing from it
//! yields just the root itself.

use std::collections::VecDeque;
use std::hash::Hash;

use super::{EdgeType, Graph, NodeId, UnGraph};

/// Depth-first pre-order from `root`
///
/// Neighbors are visited in adjacency order, exactly as a recursive DFS
/// would, but with an explicit stack.
pub fn dfs<T, D>(graph: &Graph<T, D>, root: &T) -> Vec<T>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
{
    let Some(start) = graph.node_id(root) else {
        return vec![root.clone()];
    };
    let mut visited = vec![false; graph.capacity()];
    dfs_from(graph, start, &mut visited, |_, _| {})
        .into_iter()
        .filter_map(|id| graph.value_of(id).cloned())
        .collect()
}

/// Path from `root` to `target` along the DFS discovery tree
///
/// Not necessarily the shortest path; see [`bfs_path`] for that.
pub fn dfs_path<T, D>(graph: &Graph<T, D>, root: &T, target: &T) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
{
    if root == target {
        return Some(vec![root.clone()]);
    }
    let start = graph.node_id(root)?;
    let goal = graph.node_id(target)?;
    let mut visited = vec![false; graph.capacity()];
    let mut parent: Vec<Option<NodeId>> = vec![None; graph.capacity()];
    dfs_from(graph, start, &mut visited, |from, to| parent[to.0] = Some(from));
    if !visited[goal.0] {
        return None;
    }
    rebuild_path(graph, &parent, start, goal)
}

/// Breadth-first visitation order from `root`
pub fn bfs<T, D>(graph: &Graph<T, D>, root: &T) -> Vec<T>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
{
    let Some(start) = graph.node_id(root) else {
        return vec![root.clone()];
    };
    bfs_from(graph, start, |_, _| {})
        .into_iter()
        .filter_map(|id| graph.value_of(id).cloned())
        .collect()
}

/// Shortest path (in edges) from `root` to `target`
pub fn bfs_path<T, D>(graph: &Graph<T, D>, root: &T, target: &T) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
{
    if root == target {
        return Some(vec![root.clone()]);
    }
    let start = graph.node_id(root)?;
    let goal = graph.node_id(target)?;
    let mut parent: Vec<Option<NodeId>> = vec![None; graph.capacity()];
    let order = bfs_from(graph, start, |from, to| parent[to.0] = Some(from));
    if !order.contains(&goal) {
        return None;
    }
    rebuild_path(graph, &parent, start, goal)
}

/// Connected components of an undirected graph
///
/// Components come out in the insertion order of their first node; each
/// component lists its nodes in DFS pre-order.
pub fn connected_components<T>(graph: &UnGraph<T>) -> Vec<Vec<T>>
where
    T: Clone + Eq + Hash,
{
    let mut visited = vec![false; graph.capacity()];
    let mut components = Vec::new();
    let remaining: Vec<NodeId> = graph.live_ids().collect();
    for id in remaining {
        if visited[id.0] {
            continue;
        }
        let component = dfs_from(graph, id, &mut visited, |_, _| {})
            .into_iter()
            .filter_map(|n| graph.value_of(n).cloned())
            .collect();
        components.push(component);
    }
    components
}

/// Iterative DFS; `on_discover(parent, child)` fires once per tree edge
fn dfs_from<T, D, F>(
    graph: &Graph<T, D>,
    start: NodeId,
    visited: &mut [bool],
    mut on_discover: F,
) -> Vec<NodeId>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
    F: FnMut(NodeId, NodeId),
{
    let mut order = vec![start];
    visited[start.0] = true;
    // (node, index of the next neighbor to try)
    let mut stack = vec![(start, 0usize)];

    while let Some(frame) = stack.last_mut() {
        let (node, next) = *frame;
        let adjacent = graph.adjacent_ids(node);
        match adjacent.get(next) {
            Some(&child) => {
                frame.1 += 1;
                if !visited[child.0] {
                    visited[child.0] = true;
                    on_discover(node, child);
                    order.push(child);
                    stack.push((child, 0));
                }
            }
            None => {
                stack.pop();
            }
        }
    }
    order
}

fn bfs_from<T, D, F>(graph: &Graph<T, D>, start: NodeId, mut on_discover: F) -> Vec<NodeId>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
    F: FnMut(NodeId, NodeId),
{
    let mut visited = vec![false; graph.capacity()];
    let mut order = Vec::new();
    let mut frontier = VecDeque::from([start]);
    visited[start.0] = true;

    while let Some(node) = frontier.pop_front() {
        order.push(node);
        for &child in graph.adjacent_ids(node) {
            if !visited[child.0] {
                visited[child.0] = true;
                on_discover(node, child);
                frontier.push_back(child);
            }
        }
    }
    order
}

fn rebuild_path<T, D>(
    graph: &Graph<T, D>,
    parent: &[Option<NodeId>],
    start: NodeId,
    goal: NodeId,
) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
    D: EdgeType,
{
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = parent[current.0]?;
        path.push(current);
    }
    path.reverse();
    path.into_iter()
        .map(|id| graph.value_of(id).cloned())
        .collect()
}
