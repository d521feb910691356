//! Resolution graph construction and traversal.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use carton_core::dependency::ResolvedDependency;
use carton_core::project::ProjectIdentifier;
use carton_core::version::VersionSpecifier;

/// A node in the resolution graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    /// The manifest being resolved, labelled with the project directory name.
    Root { name: String },
    Project(ResolvedDependency),
}

impl GraphNode {
    pub fn project(&self) -> Option<&ProjectIdentifier> {
        match self {
            GraphNode::Root { .. } => None,
            GraphNode::Project(dep) => Some(&dep.project),
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Root { name } => f.write_str(name),
            GraphNode::Project(dep) => write!(f, "{} {}", dep.project, dep.version),
        }
    }
}

/// Edge label: the constraint the parent's manifest places on the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub constraint: VersionSpecifier,
}

/// Resolved projects and the manifest edges between them, backed by petgraph.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, DepEdge>,
    index: HashMap<ProjectIdentifier, NodeIndex>,
    root: NodeIndex,
}

impl DependencyGraph {
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(GraphNode::Root {
            name: root_name.into(),
        });
        Self {
            graph,
            index: HashMap::new(),
            root,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Add or retrieve the node for a pinned project. A project appears at
    /// most once; adding it again returns the existing index.
    pub fn add_project(&mut self, dep: ResolvedDependency) -> NodeIndex {
        if let Some(&idx) = self.index.get(&dep.project) {
            return idx;
        }
        let project = dep.project.clone();
        let idx = self.graph.add_node(GraphNode::Project(dep));
        self.index.insert(project, idx);
        idx
    }

    /// Add a dependency edge from `from` to `to`.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn find(&self, project: &ProjectIdentifier) -> Option<NodeIndex> {
        self.index.get(project).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    /// Direct dependencies of a node, in the order they were added.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight()))
            .collect();
        deps.sort_by_key(|(id, _, _)| *id);
        deps.into_iter().map(|(_, target, edge)| (target, edge)).collect()
    }

    /// Reverse dependencies (who depends on this node).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), e.source(), e.weight()))
            .collect();
        deps.sort_by_key(|(id, _, _)| *id);
        deps.into_iter().map(|(_, source, edge)| (source, edge)).collect()
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Each group of projects that depend on one another, including a project
    /// that depends on itself.
    pub fn cycles(&self) -> Vec<Vec<&ProjectIdentifier>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || scc
                        .first()
                        .is_some_and(|&idx| self.graph.contains_edge(idx, idx))
            })
            .map(|mut scc| {
                scc.sort();
                scc.iter()
                    .filter_map(|&idx| self.graph[idx].project())
                    .collect()
            })
            .collect()
    }

    /// Render the graph as a tree rooted at the manifest.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = format!("{}\n", self.graph[self.root]);
        let mut visited = HashSet::new();
        visited.insert(self.root);

        let deps = self.dependencies_of(self.root);
        let count = deps.len();
        for (i, (idx, edge)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(&mut output, *idx, edge, "", is_last, 1, max_depth, &mut visited);
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &DepEdge,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        match &edge.constraint {
            VersionSpecifier::Any => output.push_str(&format!("{prefix}{connector}{node}\n")),
            constraint => output.push_str(&format!("{prefix}{connector}{node} ({constraint})\n")),
        }

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, child_edge)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                child_edge,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find a path from the root to a project.
    ///
    /// Accepts the project's full identifier (`owner/name`, a URL) or just its
    /// short name.
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&GraphNode>> {
        let target = self.resolve_key(target_key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(self.root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    /// Resolve a user-provided key to a node index: full identifier first,
    /// then short name.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        let by_ident = self
            .graph
            .node_indices()
            .find(|&idx| self.graph[idx].project().is_some_and(|p| p.to_string() == key));
        by_ident.or_else(|| {
            self.graph
                .node_indices()
                .find(|&idx| self.graph[idx].project().is_some_and(|p| p.name() == key))
        })
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }

    /// Render what depends on a project, up to the root.
    pub fn print_inverted_tree(&self, target_key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.resolve_key(target_key) else {
            return output;
        };

        output.push_str(&format!("{}\n", self.graph[idx]));

        let mut visited = HashSet::new();
        visited.insert(idx);

        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(&mut output, *dep_idx, "", is_last, &mut visited);
        }

        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(output, *dep_idx, &child_prefix, is_last, visited);
        }

        visited.remove(&idx);
    }

    /// Number of pinned projects (excluding root).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
