//! Property tests for graph algorithms

use proptest::prelude::*;

use module_host::graph::{
    bfs, connected_components, dependency_order, dfs, find_cycle, has_cycle, topological_order,
    DiGraph, UnGraph,
};

fn edges_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..12).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..30)))
}

fn digraph(n: usize, edges: &[(usize, usize)]) -> DiGraph<usize> {
    let mut graph = DiGraph::new();
    for node in 0..n {
        graph.add_node(node);
    }
    for &(a, b) in edges {
        graph.add_edge(a, b);
    }
    graph
}

fn position(order: &[usize], node: usize) -> usize {
    order.iter().position(|&n| n == node).unwrap()
}

proptest! {
    #[test]
    fn topological_order_respects_every_edge((n, edges) in edges_strategy()) {
        // Forward-only edges are acyclic by construction
        let forward: Vec<(usize, usize)> = edges
            .iter()
            .filter(|(a, b)| a < b)
            .copied()
            .collect();
        let graph = digraph(n, &forward);

        let order = topological_order(&graph).unwrap();
        prop_assert_eq!(order.len(), n);
        for &(a, b) in &forward {
            prop_assert!(position(&order, a) < position(&order, b));
        }

        let deps_first = dependency_order(&graph).unwrap();
        prop_assert_eq!(deps_first.len(), n);
        for &(a, b) in &forward {
            prop_assert!(position(&deps_first, b) < position(&deps_first, a));
        }
    }

    #[test]
    fn cycle_detection_agrees_with_ordering((n, edges) in edges_strategy()) {
        let graph = digraph(n, &edges);
        let cyclic = has_cycle(&graph);
        prop_assert_eq!(cyclic, topological_order(&graph).is_err());
        prop_assert_eq!(cyclic, dependency_order(&graph).is_err());

        match find_cycle(&graph) {
            Some(path) => {
                prop_assert!(cyclic);
                prop_assert!(path.len() >= 2);
                prop_assert_eq!(path.first(), path.last());
                for pair in path.windows(2) {
                    prop_assert!(graph.has_edge(&pair[0], &pair[1]));
                }
            }
            None => prop_assert!(!cyclic),
        }
    }

    #[test]
    fn adding_edges_is_idempotent((n, edges) in edges_strategy()) {
        let once = digraph(n, &edges);
        let mut twice = digraph(n, &edges);
        for &(a, b) in &edges {
            prop_assert!(!twice.add_edge(a, b));
        }
        prop_assert_eq!(once.edge_count(), twice.edge_count());
        for node in 0..n {
            let neighbors: Vec<&usize> = twice.neighbors(&node).collect();
            let mut unique = neighbors.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(neighbors.len(), unique.len());
        }
    }

    #[test]
    fn traversals_visit_each_reachable_node_once((n, edges) in edges_strategy()) {
        let graph = digraph(n, &edges);
        let depth = dfs(&graph, &0);
        let breadth = bfs(&graph, &0);
        prop_assert_eq!(depth.first(), Some(&0));
        prop_assert_eq!(breadth.first(), Some(&0));

        let mut a = depth.clone();
        let mut b = breadth.clone();
        a.sort();
        b.sort();
        prop_assert_eq!(&a, &b);
        a.dedup();
        prop_assert_eq!(a.len(), depth.len());
    }

    #[test]
    fn components_partition_undirected_graph((n, edges) in edges_strategy()) {
        let mut graph = UnGraph::new();
        for node in 0..n {
            graph.add_node(node);
        }
        for &(a, b) in &edges {
            graph.add_edge(a, b);
        }

        let components = connected_components(&graph);
        let mut all: Vec<usize> = components.iter().flatten().copied().collect();
        all.sort();
        prop_assert_eq!(all, (0..n).collect::<Vec<_>>());

        for &(a, b) in &edges {
            let home = components.iter().position(|c| c.contains(&a));
            prop_assert_eq!(home, components.iter().position(|c| c.contains(&b)));
        }
    }
}
