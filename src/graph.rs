// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Commit graph construction and temporal weighting
//!
//! The graph is undirected with one namespace for node identities: commit
//! hashes and contributor names share it. Adding an identity that already
//! exists reuses the node, and adding an edge between two nodes that are
//! already connected replaces that edge rather than creating a parallel one.

use crate::types::{CommitEdge, CommitNode, CommitRecord, EdgeLabel, NodeKind, Timestamp};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Default name given to commit graphs
pub const DEFAULT_GRAPH_NAME: &str = "Commit Graph";

/// Commits, contributors and the edges between them
pub struct CommitGraph {
    name: String,
    /// The underlying undirected graph
    graph: UnGraph<CommitNode, CommitEdge>,
    /// Map from node identity to node index
    node_indices: HashMap<String, NodeIndex>,
}

impl Default for CommitGraph {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_NAME)
    }
}

impl CommitGraph {
    /// Create an empty commit graph
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            graph: UnGraph::default(),
            node_indices: HashMap::new(),
        }
    }

    /// Graph name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a commit from its own record, setting its timestamp
    ///
    /// An existing node with this identity becomes a commit carrying
    /// `timestamp`, replacing whatever it held before.
    pub fn add_commit(&mut self, id: &str, timestamp: Timestamp) -> NodeIndex {
        let kind = NodeKind::Commit {
            timestamp: Some(timestamp),
        };
        let idx = self.upsert_node(id, kind);
        self.graph[idx].kind = kind;
        idx
    }

    /// Add a commit known only as someone's parent
    ///
    /// Keeps the timestamp of an existing commit node.
    pub fn add_parent_ref(&mut self, id: &str) -> NodeIndex {
        let idx = self.upsert_node(id, NodeKind::Commit { timestamp: None });
        if self.graph[idx].kind.is_contributor() {
            self.graph[idx].kind = NodeKind::Commit { timestamp: None };
        }
        idx
    }

    /// Add a contributor
    pub fn add_contributor(&mut self, name: &str) -> NodeIndex {
        let idx = self.upsert_node(name, NodeKind::Contributor);
        self.graph[idx].kind = NodeKind::Contributor;
        idx
    }

    /// Fold one commit record into the graph
    pub fn add_record(&mut self, record: &CommitRecord) {
        let commit = self.add_commit(&record.commit_id, record.timestamp);
        let contributor = self.add_contributor(&record.contributor);
        self.upsert_edge(contributor, commit, EdgeLabel::Contributor);

        for parent_id in &record.parent_ids {
            let parent = self.add_parent_ref(parent_id);
            self.upsert_edge(parent, commit, EdgeLabel::Parent);
        }
    }

    fn upsert_node(&mut self, id: &str, kind: NodeKind) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(id) {
            return idx;
        }

        let idx = self.graph.add_node(CommitNode {
            id: id.to_string(),
            kind,
        });
        self.node_indices.insert(id.to_string(), idx);
        idx
    }

    /// Connect `from` and `to`, replacing any edge already between them
    ///
    /// The replacement keeps `from` as the stored source so parent edges
    /// always point parent to child.
    fn upsert_edge(&mut self, from: NodeIndex, to: NodeIndex, label: EdgeLabel) {
        if let Some(existing) = self.graph.find_edge(from, to) {
            self.graph.remove_edge(existing);
        }
        self.graph.add_edge(from, to, CommitEdge::new(label));
    }

    /// Weight every parent edge with the seconds elapsed from parent to child
    ///
    /// Must run after every record has been added, since a parent's
    /// timestamp may come from a record later in the log. Edges touching a
    /// contributor get no weight; edges missing a timestamp get `0.0`.
    pub fn annotate_elapsed(&mut self) {
        let mut weighted = 0usize;

        for edge in self.graph.edge_indices() {
            if self.graph[edge].label != EdgeLabel::Parent {
                continue;
            }

            let Some((parent, child)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            let elapsed = elapsed_seconds(&self.graph[parent].kind, &self.graph[child].kind);
            self.graph[edge].elapsed = elapsed;

            if elapsed.is_some() {
                weighted += 1;
            }
        }

        debug!("Weighted {} parent edges", weighted);
    }

    /// Get a node by identity
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&CommitNode> {
        self.node_indices.get(id).map(|&idx| &self.graph[idx])
    }

    /// Get the edge between two identities, in either direction
    #[must_use]
    pub fn edge(&self, a: &str, b: &str) -> Option<&CommitEdge> {
        let a = *self.node_indices.get(a)?;
        let b = *self.node_indices.get(b)?;
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &CommitNode> {
        self.graph.raw_nodes().iter().map(|n| &n.weight)
    }

    /// All edges as (source, target, payload)
    pub fn edges(&self) -> impl Iterator<Item = (&CommitNode, &CommitNode, &CommitEdge)> {
        self.graph.edge_references().map(move |e| {
            (
                &self.graph[e.source()],
                &self.graph[e.target()],
                e.weight(),
            )
        })
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Count nodes of the contributor role
    #[must_use]
    pub fn contributor_count(&self) -> usize {
        self.nodes().filter(|n| n.kind.is_contributor()).count()
    }

    /// Count edges carrying `label`
    #[must_use]
    pub fn edges_labelled(&self, label: EdgeLabel) -> usize {
        self.graph
            .raw_edges()
            .iter()
            .filter(|e| e.weight.label == label)
            .count()
    }

    /// Counts for the run summary
    #[must_use]
    pub fn summary(&self) -> GraphSummary {
        let contributors = self.contributor_count();
        GraphSummary {
            name: self.name.clone(),
            multigraph: false,
            nodes: self.node_count(),
            edges: self.edge_count(),
            breakdown: vec![
                ("commit nodes", self.node_count() - contributors),
                ("contributor nodes", contributors),
                ("parent edges", self.edges_labelled(EdgeLabel::Parent)),
                ("contributor edges", self.edges_labelled(EdgeLabel::Contributor)),
            ],
        }
    }
}

/// Build the structural graph from a record stream, in file order
///
/// Parent edges carry no weight until [`CommitGraph::annotate_elapsed`] runs.
pub fn build_graph<I>(name: &str, records: I) -> CommitGraph
where
    I: IntoIterator<Item = CommitRecord>,
{
    let mut graph = CommitGraph::new(name);
    let mut folded = 0usize;

    for record in records {
        graph.add_record(&record);
        folded += 1;
    }

    debug!(
        "Folded {} records into {} nodes and {} edges",
        folded,
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

/// Seconds from `parent` to `child`, or `None` when either is a contributor
fn elapsed_seconds(parent: &NodeKind, child: &NodeKind) -> Option<f64> {
    match (parent, child) {
        (
            NodeKind::Commit {
                timestamp: Some(parent_ts),
            },
            NodeKind::Commit {
                timestamp: Some(child_ts),
            },
        ) => {
            let delta = child_ts.signed_duration_since(*parent_ts);
            #[allow(clippy::cast_precision_loss)]
            let seconds = delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1e9;
            Some(seconds)
        }
        (NodeKind::Commit { .. }, NodeKind::Commit { .. }) => Some(0.0),
        _ => None,
    }
}

/// Size report for a built graph, printed like a graph `info` dump
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSummary {
    /// Graph name
    pub name: String,
    /// Whether parallel edges are kept
    pub multigraph: bool,
    /// Node count
    pub nodes: usize,
    /// Edge count
    pub edges: usize,
    /// Per-role counts
    pub breakdown: Vec<(&'static str, usize)>,
}

impl GraphSummary {
    /// Mean number of edge endpoints per node
    #[must_use]
    pub fn average_degree(&self) -> f64 {
        if self.nodes == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let degree = (2 * self.edges) as f64 / self.nodes as f64;
        degree
    }
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(
            f,
            "Type: {}",
            if self.multigraph { "MultiGraph" } else { "Graph" }
        )?;
        writeln!(f, "Number of nodes: {}", self.nodes)?;
        writeln!(f, "Number of edges: {}", self.edges)?;
        for (role, count) in &self.breakdown {
            writeln!(f, "  {role}: {count}")?;
        }
        write!(f, "Average degree: {:>8.4}", self.average_degree())
    }
}
