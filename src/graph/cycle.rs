//! Cycle detection for directed graphs
//!
//! Three-state DFS: a node is unvisited, on the current DFS stack, or
//! finished. Reaching a node that is on the stack closes a cycle; reaching a
//! finished node is safe (every path out of it has already been explored).

use std::hash::Hash;

use super::{DiGraph, NodeId};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Finished,
}

/// Whether the directed graph contains any cycle (self-loops included)
pub fn has_cycle<T>(graph: &DiGraph<T>) -> bool
where
    T: Clone + Eq + Hash,
{
    search(graph).is_some()
}

/// One cycle as a closed path `[n0, n1, ..., n0]`, if any exists
pub fn find_cycle<T>(graph: &DiGraph<T>) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
{
    search(graph).map(|ids| {
        ids.into_iter()
            .filter_map(|id| graph.value_of(id).cloned())
            .collect()
    })
}

fn search<T>(graph: &DiGraph<T>) -> Option<Vec<NodeId>>
where
    T: Clone + Eq + Hash,
{
    let mut marks = vec![Mark::Unvisited; graph.capacity()];
    let roots: Vec<NodeId> = graph.live_ids().collect();

    for root in roots {
        if marks[root.0] != Mark::Unvisited {
            continue;
        }
        marks[root.0] = Mark::OnStack;
        let mut stack = vec![(root, 0usize)];

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            match graph.adjacent_ids(node).get(next) {
                Some(&child) => {
                    frame.1 += 1;
                    match marks[child.0] {
                        Mark::Unvisited => {
                            marks[child.0] = Mark::OnStack;
                            stack.push((child, 0));
                        }
                        Mark::OnStack => {
                            let start = stack.iter().position(|&(n, _)| n == child)?;
                            let mut cycle: Vec<NodeId> =
                                stack[start..].iter().map(|&(n, _)| n).collect();
                            cycle.push(child);
                            return Some(cycle);
                        }
                        Mark::Finished => {}
                    }
                }
                None => {
                    marks[node.0] = Mark::Finished;
                    stack.pop();
                }
            }
        }
    }
    None
}
