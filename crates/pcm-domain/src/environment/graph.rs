//! Reference graph over named environments.
//!
//! An edge `a -> b` means environment `a` includes environment `b`'s input
//! file. Locking walks the graph so that every referenced environment is
//! finished before the environments that build on it.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::{is_cyclic_directed, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("environment references form a cycle: {}", environments.join(" -> "))]
    Cycle { environments: Vec<String> },
    #[error("{}", describe_unknown(missing))]
    UnknownReferences { missing: Vec<(String, String)> },
}

fn describe_unknown(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(env, reference)| {
            format!("environment '{env}' references '{reference}', which has no input file")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug)]
pub struct EnvironmentGraph {
    graph: DiGraph<String, ()>,
    nodes: BTreeMap<String, NodeIndex>,
    references: BTreeMap<String, BTreeSet<String>>,
    recursive: RefCell<HashMap<NodeIndex, BTreeSet<String>>>,
    clusters: RefCell<HashMap<NodeIndex, BTreeSet<String>>>,
}

impl EnvironmentGraph {
    /// Build the graph from each environment's direct references.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownReferences`] when a reference names an
    /// environment that is not a key of `references`.
    pub fn from_references(
        references: BTreeMap<String, BTreeSet<String>>,
    ) -> Result<Self, GraphError> {
        let mut graph = DiGraph::new();
        let mut nodes = BTreeMap::new();
        for name in references.keys() {
            nodes.insert(name.clone(), graph.add_node(name.clone()));
        }

        let mut missing = Vec::new();
        for (name, refs) in &references {
            let from = nodes[name];
            for reference in refs {
                match nodes.get(reference) {
                    Some(&to) => {
                        graph.add_edge(from, to, ());
                    }
                    None => missing.push((name.clone(), reference.clone())),
                }
            }
        }
        if !missing.is_empty() {
            return Err(GraphError::UnknownReferences { missing });
        }

        debug!(
            environments = nodes.len(),
            edges = graph.edge_count(),
            "built environment graph"
        );
        Ok(Self {
            graph,
            nodes,
            references,
            recursive: RefCell::new(HashMap::new()),
            clusters: RefCell::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Direct references of `name`.
    #[must_use]
    pub fn references(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.references.get(name)
    }

    /// Every environment name, referenced environments before their
    /// referrers. Environments at the same depth are ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] when the references are not acyclic.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        if is_cyclic_directed(&self.graph) {
            return Err(GraphError::Cycle {
                environments: self.cycle_members(),
            });
        }
        let sorted = toposort(&self.graph, None).map_err(|cycle| GraphError::Cycle {
            environments: vec![self.graph[cycle.node_id()].clone()],
        })?;

        // toposort yields referrers first; walk it backwards so every
        // reference already has a depth.
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        for &node in sorted.iter().rev() {
            let level = self
                .graph
                .neighbors(node)
                .filter_map(|child| depth.get(&child))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(node, level);
        }

        let mut ordered: Vec<(usize, &str)> = depth
            .iter()
            .map(|(node, level)| (*level, self.graph[*node].as_str()))
            .collect();
        ordered.sort_unstable();
        Ok(ordered.into_iter().map(|(_, name)| name.to_string()).collect())
    }

    fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .flatten()
            .map(|node| self.graph[node].clone())
            .collect();
        members.sort();
        members
    }

    /// Transitive closure of references reachable from `name`, excluding
    /// `name` itself. Unknown names have no references.
    #[must_use]
    pub fn recursive_refs(&self, name: &str) -> BTreeSet<String> {
        let Some(&start) = self.nodes.get(name) else {
            return BTreeSet::new();
        };
        if let Some(cached) = self.recursive.borrow().get(&start) {
            return cached.clone();
        }
        let mut reached = BTreeSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                reached.insert(self.graph[node].clone());
            }
        }
        self.recursive.borrow_mut().insert(start, reached.clone());
        reached
    }

    /// Every environment connected to `name` by references in either
    /// direction, including `name`.
    #[must_use]
    pub fn reference_cluster(&self, name: &str) -> BTreeSet<String> {
        let Some(&start) = self.nodes.get(name) else {
            return BTreeSet::from([name.to_string()]);
        };
        if let Some(cached) = self.clusters.borrow().get(&start) {
            return cached.clone();
        }
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_undirected(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        let cluster: BTreeSet<String> = seen
            .into_iter()
            .map(|node| self.graph[node].clone())
            .collect();
        let mut cache = self.clusters.borrow_mut();
        for member in &cluster {
            cache.insert(self.nodes[member], cluster.clone());
        }
        cluster
    }
}
