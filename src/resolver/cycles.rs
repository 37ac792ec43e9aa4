//! Simple cycle enumeration.
//!
//! Johnson's algorithm: for each start node in index order, restrict the
//! graph to nodes at or above it, take the strongly connected component
//! holding the start, and walk every elementary circuit through it. Each
//! cycle is reported once, beginning at its lowest-indexed node.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// Every elementary cycle of `graph`, as node sequences.
///
/// Cycles come out grouped by their lowest node index, so a graph whose
/// nodes were added in sorted order yields deterministic output.
pub fn simple_cycles<N, E>(graph: &DiGraph<N, E>) -> Vec<Vec<NodeIndex>> {
    let n = graph.node_count();
    let adjacency: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            let mut next: Vec<usize> = graph
                .neighbors(NodeIndex::new(i))
                .map(|w| w.index())
                .collect();
            next.sort_unstable();
            next.dedup();
            next
        })
        .collect();

    let mut cycles = Vec::new();

    for start in 0..n {
        let subgraph = graph.filter_map(
            |idx, _| (idx.index() >= start).then_some(idx.index()),
            |_, _| Some(()),
        );
        let component = tarjan_scc(&subgraph)
            .into_iter()
            .find(|scc| scc.iter().any(|&i| subgraph[i] == start));
        let Some(component) = component else {
            continue;
        };

        let self_loop = adjacency[start].contains(&start);
        if component.len() == 1 && !self_loop {
            continue;
        }

        let mut in_component = vec![false; n];
        for i in component {
            in_component[subgraph[i]] = true;
        }

        let mut search = CircuitSearch {
            adjacency: &adjacency,
            in_component,
            blocked: vec![false; n],
            blocked_by: vec![Vec::new(); n],
            stack: Vec::new(),
            start,
            cycles: &mut cycles,
        };
        search.circuit(start);
    }

    cycles
        .into_iter()
        .map(|cycle| cycle.into_iter().map(NodeIndex::new).collect())
        .collect()
}

struct CircuitSearch<'a> {
    adjacency: &'a [Vec<usize>],
    in_component: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<Vec<usize>>,
    stack: Vec<usize>,
    start: usize,
    cycles: &'a mut Vec<Vec<usize>>,
}

impl CircuitSearch<'_> {
    fn circuit(&mut self, v: usize) -> bool {
        let mut closed = false;
        self.stack.push(v);
        self.blocked[v] = true;

        let adjacency = self.adjacency;
        for &w in &adjacency[v] {
            if !self.in_component[w] {
                continue;
            }
            if w == self.start {
                self.cycles.push(self.stack.clone());
                closed = true;
            } else if !self.blocked[w] && self.circuit(w) {
                closed = true;
            }
        }

        if closed {
            self.unblock(v);
        } else {
            for &w in &adjacency[v] {
                if self.in_component[w] && !self.blocked_by[w].contains(&v) {
                    self.blocked_by[w].push(v);
                }
            }
        }

        self.stack.pop();
        closed
    }

    fn unblock(&mut self, u: usize) {
        self.blocked[u] = false;
        let waiting = std::mem::take(&mut self.blocked_by[u]);
        for w in waiting {
            if self.blocked[w] {
                self.unblock(w);
            }
        }
    }
}
