//! Graph construction and validation for workflow definitions.
//!
//! Models the node/edge structure as a `petgraph` directed graph. Cycle
//! detection runs a depth-first search with an explicit recursion stack,
//! so a back edge (an edge into a node currently on the stack) is reported
//! with the node it re-enters. Overall validation is O(V + E).

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use flowmill_types::workflow::{NodeType, ValidationReport, WorkflowDefinition};

// ---------------------------------------------------------------------------
// WorkflowGraph
// ---------------------------------------------------------------------------

/// Adjacency view over a workflow definition.
///
/// Successor lists preserve the definition's edge declaration order, which
/// fixes the traversal order for sequential execution.
pub struct WorkflowGraph {
    graph: DiGraph<String, usize>,
    index_of: HashMap<String, NodeIndex>,
    /// Edge indices into `definition.edges`, keyed by source node id, in
    /// declaration order.
    outgoing: HashMap<String, Vec<usize>>,
    /// Node ids with no inbound edges that are triggers.
    entry_nodes: Vec<String>,
}

impl WorkflowGraph {
    /// Build the adjacency view. Assumes the definition has already passed
    /// [`validate`]; unknown edge endpoints are skipped here rather than
    /// re-reported.
    pub fn build(definition: &WorkflowDefinition) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();
        for node in &definition.nodes {
            let idx = graph.add_node(node.id.clone());
            index_of.insert(node.id.clone(), idx);
        }

        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        let mut has_inbound: HashSet<&str> = HashSet::new();
        for (edge_idx, edge) in definition.edges.iter().enumerate() {
            let (Some(&from), Some(&to)) = (index_of.get(&edge.source), index_of.get(&edge.target))
            else {
                continue;
            };
            graph.add_edge(from, to, edge_idx);
            outgoing
                .entry(edge.source.clone())
                .or_default()
                .push(edge_idx);
            has_inbound.insert(edge.target.as_str());
        }

        let entry_nodes = definition
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Trigger && !has_inbound.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect();

        Self {
            graph,
            index_of,
            outgoing,
            entry_nodes,
        }
    }

    /// Trigger nodes with no inbound edges; traversal starts here.
    pub fn entry_nodes(&self) -> &[String] {
        &self.entry_nodes
    }

    /// Edge indices leaving `node_id`, in declaration order.
    pub fn outgoing_edges(&self, node_id: &str) -> &[usize] {
        self.outgoing
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All node ids reachable from `node_id`, excluding `node_id` itself.
    pub fn descendants(&self, node_id: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let Some(&start) = self.index_of.get(node_id) else {
            return result;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                result.insert(self.graph[idx].clone());
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a workflow definition's graph structure.
///
/// Errors (fatal): duplicate node ids, edges referencing unknown nodes,
/// self-loops, no trigger node, cycles. Warnings: nodes unreachable from
/// any trigger.
pub fn validate(definition: &WorkflowDefinition) -> ValidationReport {
    let mut report = ValidationReport::valid();

    // Duplicate node ids.
    let mut seen = HashSet::new();
    for node in &definition.nodes {
        if !seen.insert(node.id.as_str()) {
            report
                .errors
                .push(format!("duplicate node id '{}'", node.id));
        }
    }

    if definition.nodes.is_empty() {
        report.errors.push("workflow has no nodes".to_string());
    }

    // Edge endpoints.
    for edge in &definition.edges {
        if !seen.contains(edge.source.as_str()) {
            report.errors.push(format!(
                "edge '{}' references unknown source node '{}'",
                edge.id, edge.source
            ));
        }
        if !seen.contains(edge.target.as_str()) {
            report.errors.push(format!(
                "edge '{}' references unknown target node '{}'",
                edge.id, edge.target
            ));
        }
        if edge.source == edge.target {
            report.errors.push(format!(
                "edge '{}' is a self-loop on node '{}'",
                edge.id, edge.source
            ));
        }
    }

    // At least one trigger.
    let trigger_count = definition
        .nodes
        .iter()
        .filter(|n| n.node_type == NodeType::Trigger)
        .count();
    if !definition.nodes.is_empty() && trigger_count == 0 {
        report
            .errors
            .push("workflow has no trigger node".to_string());
    }

    // Config variant must agree with the declared node type.
    for node in &definition.nodes {
        let config_type = node.config.node_type();
        if config_type != node.node_type {
            report.errors.push(format!(
                "node '{}' is declared '{}' but configured as '{}'",
                node.id, node.node_type, config_type
            ));
        }
    }

    // Cycle detection and reachability only make sense once the endpoints
    // check out.
    if report.errors.is_empty() {
        if let Some(node_id) = find_cycle(definition) {
            report
                .errors
                .push(format!("cycle detected involving node '{}'", node_id));
        }

        let graph = WorkflowGraph::build(definition);
        let reachable = reachable_from_entries(&graph);
        for node in &definition.nodes {
            if !reachable.contains(node.id.as_str()) {
                report
                    .warnings
                    .push(format!("node '{}' is unreachable from any trigger", node.id));
            }
        }
    }

    report.is_valid = report.errors.is_empty();
    report
}

/// DFS cycle detection with an explicit recursion stack.
///
/// Returns the id of a node a back edge re-enters, or `None` when the
/// graph is acyclic.
fn find_cycle(definition: &WorkflowDefinition) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let index_of: HashMap<&str, usize> = definition
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); definition.nodes.len()];
    for edge in &definition.edges {
        let (Some(&from), Some(&to)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) else {
            continue;
        };
        adjacency[from].push(to);
    }

    let mut color = vec![Color::White; definition.nodes.len()];

    for start in 0..definition.nodes.len() {
        if color[start] != Color::White {
            continue;
        }

        // (node, next-successor cursor) frames emulate the recursion stack;
        // Gray marks nodes currently on it.
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        color[start] = Color::Gray;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if let Some(&next) = adjacency[node].get(frame.1) {
                frame.1 += 1;
                match color[next] {
                    Color::Gray => return Some(definition.nodes[next].id.clone()),
                    Color::White => {
                        color[next] = Color::Gray;
                        stack.push((next, 0));
                    }
                    Color::Black => {}
                }
            } else {
                color[node] = Color::Black;
                stack.pop();
            }
        }
    }

    None
}

fn reachable_from_entries(graph: &WorkflowGraph) -> HashSet<String> {
    let mut reachable = HashSet::new();
    for entry in graph.entry_nodes() {
        reachable.insert(entry.clone());
        reachable.extend(graph.descendants(entry));
    }
    reachable
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
