//! The dependency graph over resolved targets.
//!
//! A freshly built graph is [`Unvalidated`]: it may hold cycles, which can
//! be listed for diagnostics. [`DependencyGraph::validate`] consumes it and
//! returns a [`Validated`] graph only when no cycle exists. Closure queries
//! are only available on a validated graph.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;

use super::cycles::simple_cycles;
use super::errors::GraphError;
use crate::core::target::{Target, TargetKind};

/// Graph state: built, cycles not yet checked.
#[derive(Debug, Clone, Copy)]
pub struct Unvalidated;

/// Graph state: checked acyclic.
#[derive(Debug, Clone, Copy)]
pub struct Validated;

/// Directed graph where an edge `a -> b` means `a` depends on `b`.
#[derive(Debug, Clone)]
pub struct DependencyGraph<S = Unvalidated> {
    /// Target graph; nodes share the registry's targets
    graph: DiGraph<Arc<Target>, ()>,

    /// Map from target key to node index
    nodes: HashMap<String, NodeIndex>,

    state: PhantomData<S>,
}

impl DependencyGraph<Unvalidated> {
    /// Build the graph from a frozen registry.
    ///
    /// Nodes are added in key order so every derived ordering is stable.
    pub fn build(targets: &BTreeMap<String, Arc<Target>>) -> Self {
        let mut graph = DiGraph::with_capacity(targets.len(), 0);
        let mut nodes = HashMap::with_capacity(targets.len());

        for (key, target) in targets {
            let node = graph.add_node(Arc::clone(target));
            nodes.insert(key.clone(), node);
        }

        for (key, target) in targets {
            let from = nodes[key];
            for dependency in target.dependencies() {
                match nodes.get(dependency) {
                    Some(&to) => {
                        graph.add_edge(from, to, ());
                    }
                    None => tracing::warn!(
                        "{} depends on {} which is not registered",
                        key,
                        dependency
                    ),
                }
            }
        }

        tracing::debug!(
            "Built dependency graph with {} targets and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        DependencyGraph {
            graph,
            nodes,
            state: PhantomData,
        }
    }

    /// Check for cycles, reporting every one found.
    pub fn validate(self) -> Result<DependencyGraph<Validated>, GraphError> {
        let cycles = self.cycles();
        if !cycles.is_empty() {
            return Err(GraphError::CircularDependency { cycles });
        }

        Ok(DependencyGraph {
            graph: self.graph,
            nodes: self.nodes,
            state: PhantomData,
        })
    }
}

impl<S> DependencyGraph<S> {
    /// Every simple cycle as a list of keys, starting at its smallest key.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = simple_cycles(&self.graph)
            .into_iter()
            .map(|cycle| {
                cycle
                    .into_iter()
                    .map(|n| self.graph[n].key().to_string())
                    .collect()
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Get a target by key.
    pub fn target(&self, key: &str) -> Option<&Arc<Target>> {
        self.nodes.get(key).map(|&n| &self.graph[n])
    }

    /// Check if a key is in the graph.
    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.nodes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Every edge as `(dependent, dependency)`, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| {
                (
                    self.graph[a].key().to_string(),
                    self.graph[b].key().to_string(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    /// Direct dependencies of a target, sorted by key.
    pub fn dependencies_of(&self, key: &str) -> Result<Vec<Arc<Target>>, GraphError> {
        let node = self.node(key)?;
        let mut deps: Vec<Arc<Target>> = self
            .graph
            .neighbors(node)
            .map(|n| Arc::clone(&self.graph[n]))
            .collect();
        deps.sort();
        Ok(deps)
    }

    /// Get the number of targets.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn node(&self, key: &str) -> Result<NodeIndex, GraphError> {
        self.nodes
            .get(key)
            .copied()
            .ok_or_else(|| GraphError::UnknownTarget {
                key: key.to_string(),
                known: self.keys(),
            })
    }
}

impl DependencyGraph<Validated> {
    /// Every target reachable from `key`, dependencies before dependents.
    ///
    /// Ties are broken by key. The target itself is not included. With
    /// `include_third_party` unset, requirement targets are left out.
    pub fn transitive_dependencies(
        &self,
        key: &str,
        include_third_party: bool,
    ) -> Result<Vec<Arc<Target>>, GraphError> {
        let root = self.node(key)?;

        let mut reachable = BTreeSet::new();
        let mut dfs = Dfs::new(&self.graph, root);
        while let Some(node) = dfs.next(&self.graph) {
            if node != root {
                reachable.insert(node);
            }
        }

        // Kahn's algorithm on the reachable subgraph, run against edge
        // direction so leaves come out first.
        let mut pending: HashMap<NodeIndex, usize> = reachable
            .iter()
            .map(|&n| {
                let outgoing = self
                    .graph
                    .neighbors(n)
                    .filter(|m| reachable.contains(m))
                    .collect::<BTreeSet<_>>()
                    .len();
                (n, outgoing)
            })
            .collect();

        let mut ready: BTreeSet<(&str, NodeIndex)> = pending
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&n, _)| (self.graph[n].key(), n))
            .collect();

        let mut order = Vec::with_capacity(reachable.len());
        while let Some(entry) = ready.pop_first() {
            let (_, node) = entry;
            order.push(Arc::clone(&self.graph[node]));

            let dependents: BTreeSet<NodeIndex> = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .filter(|m| reachable.contains(m))
                .collect();
            for dependent in dependents {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert((self.graph[dependent].key(), dependent));
                    }
                }
            }
        }

        if !include_third_party {
            order.retain(|t| t.kind() != TargetKind::Requirement);
        }
        Ok(order)
    }

    /// Whole-graph build order, dependencies first.
    pub fn build_order(&self) -> Vec<Arc<Target>> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| {
                let outgoing = self.graph.neighbors(n).collect::<BTreeSet<_>>().len();
                (n, outgoing)
            })
            .collect();
        let mut ready: BTreeSet<(&str, NodeIndex)> = pending
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&n, _)| (self.graph[n].key(), n))
            .collect();

        while let Some((_, node)) = ready.pop_first() {
            order.push(Arc::clone(&self.graph[node]));
            let dependents: BTreeSet<NodeIndex> = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .collect();
            for dependent in dependents {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert((self.graph[dependent].key(), dependent));
                    }
                }
            }
        }
        order
    }
}
