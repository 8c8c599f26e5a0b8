// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Export - coerces attributes to serialization-safe values and writes graphs
//!
//! Every node and edge attribute map passes through [`coerce`] before any
//! writer sees it: timestamps become `%Y-%m-%dT%H:%M:%S%z` text and absent
//! values are dropped. Writers only ever handle text and floats.

use crate::email::EmailGraph;
use crate::graph::CommitGraph;
use crate::types::{AttrMap, AttrValue, Timestamp, ISO8601_DATETIME};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while writing a graph out
#[derive(Debug, Error)]
pub enum ExportError {
    /// One attribute name carries both text and numbers within a domain
    #[error("attribute {name:?} on {domain} elements mixes text and numeric values")]
    ConflictingAttributeType {
        /// `graph`, `node` or `edge`
        domain: &'static str,
        /// Attribute name
        name: String,
    },

    /// Writing the output failed
    #[error(transparent)]
    Io(#[from] io::Error),

    /// JSON encoding failed
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// GraphML interchange format
    #[value(name = "graphml")]
    GraphMl,
    /// Node-link JSON
    Json,
    /// Graphviz DOT format
    Dot,
}

impl ExportFormat {
    /// Get file extension for format
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GraphMl => "graphml",
            Self::Json => "json",
            Self::Dot => "dot",
        }
    }

    /// Human readable name
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GraphMl => "GraphML",
            Self::Json => "JSON",
            Self::Dot => "DOT",
        }
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Attribute value after coercion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExportValue {
    /// Text, including formatted timestamps
    Text(String),
    /// Floating point number
    Float(f64),
}

impl ExportValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Float(_) => "double",
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Float(f) => format!("{f:?}"),
        }
    }
}

/// Attribute map after coercion
pub type CoercedMap = BTreeMap<String, ExportValue>;

/// Format a timestamp the way it is written out
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(ISO8601_DATETIME).to_string()
}

/// Coerce one value; `None` means the attribute is dropped
#[must_use]
pub fn coerce_value(value: AttrValue) -> Option<ExportValue> {
    match value {
        AttrValue::Text(s) => Some(ExportValue::Text(s)),
        AttrValue::Float(f) => Some(ExportValue::Float(f)),
        AttrValue::Timestamp(ts) => Some(ExportValue::Text(format_timestamp(&ts))),
        AttrValue::Absent => None,
    }
}

/// Coerce a whole attribute map
#[must_use]
pub fn coerce(attrs: AttrMap) -> CoercedMap {
    attrs
        .into_iter()
        .filter_map(|(key, value)| coerce_value(value).map(|v| (key, v)))
        .collect()
}

/// A graph that can be handed to the writers
pub trait AttributedGraph {
    /// Graph name, written as a graph-level attribute
    fn graph_name(&self) -> &str;

    /// Whether parallel edges may appear
    fn is_multigraph(&self) -> bool;

    /// (id, attributes) per node, in a stable order
    fn node_attributes(&self) -> Vec<(String, AttrMap)>;

    /// (source, target, attributes) per edge, in a stable order
    fn edge_attributes(&self) -> Vec<(String, String, AttrMap)>;
}

impl AttributedGraph for CommitGraph {
    fn graph_name(&self) -> &str {
        self.name()
    }

    fn is_multigraph(&self) -> bool {
        false
    }

    fn node_attributes(&self) -> Vec<(String, AttrMap)> {
        self.nodes()
            .map(|node| {
                let mut attrs = AttrMap::new();
                attrs.insert("type".into(), node.kind.type_name().into());
                if !node.kind.is_contributor() {
                    attrs.insert("timestamp".into(), node.kind.timestamp().into());
                }
                (node.id.clone(), attrs)
            })
            .collect()
    }

    fn edge_attributes(&self) -> Vec<(String, String, AttrMap)> {
        self.edges()
            .map(|(source, target, edge)| {
                let mut attrs = AttrMap::new();
                attrs.insert("label".into(), edge.label.as_str().into());
                attrs.insert("elapsed".into(), edge.elapsed.into());
                (source.id.clone(), target.id.clone(), attrs)
            })
            .collect()
    }
}

impl AttributedGraph for EmailGraph {
    fn graph_name(&self) -> &str {
        self.name()
    }

    fn is_multigraph(&self) -> bool {
        true
    }

    fn node_attributes(&self) -> Vec<(String, AttrMap)> {
        self.addresses()
            .map(|address| {
                let mut attrs = AttrMap::new();
                attrs.insert("email".into(), address.into());
                (address.to_string(), attrs)
            })
            .collect()
    }

    fn edge_attributes(&self) -> Vec<(String, String, AttrMap)> {
        self.messages()
            .map(|(source, target, message)| {
                let mut attrs = AttrMap::new();
                attrs.insert("sent".into(), AttrValue::Timestamp(message.sent));
                attrs.insert("subject".into(), message.subject.clone().into());
                (source.to_string(), target.to_string(), attrs)
            })
            .collect()
    }
}

/// Node after coercion
#[derive(Debug, Clone, Serialize)]
pub struct CoercedNode {
    /// Node identity
    pub id: String,
    /// Coerced attributes
    #[serde(flatten)]
    pub attrs: CoercedMap,
}

/// Edge after coercion
#[derive(Debug, Clone, Serialize)]
pub struct CoercedEdge {
    /// Source identity
    pub source: String,
    /// Target identity
    pub target: String,
    /// Coerced attributes
    #[serde(flatten)]
    pub attrs: CoercedMap,
}

/// Graph-level attributes for node-link output
#[derive(Debug, Clone, Serialize)]
pub struct GraphAttrs {
    /// Graph name
    pub name: String,
}

/// Whole graph after coercion, serialized as node-link JSON
#[derive(Debug, Clone, Serialize)]
pub struct CoercedGraph {
    /// Always false; graphs here are undirected
    pub directed: bool,
    /// Whether parallel edges may appear
    pub multigraph: bool,
    /// Graph-level attributes
    pub graph: GraphAttrs,
    /// Nodes in insertion order
    pub nodes: Vec<CoercedNode>,
    /// Edges in insertion order
    #[serde(rename = "links")]
    pub edges: Vec<CoercedEdge>,
}

/// Apply the coercion rule to every node and edge of `graph`
pub fn coerce_graph<G: AttributedGraph + ?Sized>(graph: &G) -> CoercedGraph {
    CoercedGraph {
        directed: false,
        multigraph: graph.is_multigraph(),
        graph: GraphAttrs {
            name: graph.graph_name().to_string(),
        },
        nodes: graph
            .node_attributes()
            .into_iter()
            .map(|(id, attrs)| CoercedNode {
                id,
                attrs: coerce(attrs),
            })
            .collect(),
        edges: graph
            .edge_attributes()
            .into_iter()
            .map(|(source, target, attrs)| CoercedEdge {
                source,
                target,
                attrs: coerce(attrs),
            })
            .collect(),
    }
}

// =============================================================================
// Writers
// =============================================================================

/// Coerce `graph` and write it to `path`, replacing any existing file
pub fn write_graph<G: AttributedGraph + ?Sized>(
    graph: &G,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    info!("Writing {} to {}", format.display_name(), path.display());

    let coerced = coerce_graph(graph);
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    match format {
        ExportFormat::GraphMl => write_graphml(&coerced, &mut out)?,
        ExportFormat::Json => write_json(&coerced, &mut out)?,
        ExportFormat::Dot => write_dot(&coerced, &mut out)?,
    }

    out.flush()?;
    debug!(
        "Wrote {} nodes and {} edges",
        coerced.nodes.len(),
        coerced.edges.len()
    );
    Ok(())
}

/// Write node-link JSON
pub fn write_json<W: Write>(graph: &CoercedGraph, mut out: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut out, graph)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// A declared GraphML attribute
struct Key {
    id: String,
    domain: &'static str,
    name: String,
    attr_type: &'static str,
}

/// Collect the attribute declarations for one domain, rejecting mixed types
fn collect_keys<'a, I>(
    domain: &'static str,
    maps: I,
    keys: &mut Vec<Key>,
) -> Result<BTreeMap<String, String>, ExportError>
where
    I: Iterator<Item = &'a CoercedMap>,
{
    let mut types: BTreeMap<&str, &'static str> = BTreeMap::new();
    for attrs in maps {
        for (name, value) in attrs {
            match types.get(name.as_str()) {
                Some(&existing) if existing != value.type_name() => {
                    return Err(ExportError::ConflictingAttributeType {
                        domain,
                        name: name.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    types.insert(name.as_str(), value.type_name());
                }
            }
        }
    }

    let mut ids = BTreeMap::new();
    for (name, attr_type) in types {
        let id = format!("d{}", keys.len());
        ids.insert(name.to_string(), id.clone());
        keys.push(Key {
            id,
            domain,
            name: name.to_string(),
            attr_type,
        });
    }
    Ok(ids)
}

fn write_data<W: Write>(
    out: &mut W,
    indent: &str,
    ids: &BTreeMap<String, String>,
    attrs: &CoercedMap,
) -> io::Result<()> {
    for (name, value) in attrs {
        if let Some(id) = ids.get(name) {
            writeln!(
                out,
                "{indent}<data key=\"{id}\">{}</data>",
                xml_escape(&value.render())
            )?;
        }
    }
    Ok(())
}

/// Write GraphML
pub fn write_graphml<W: Write>(graph: &CoercedGraph, mut out: W) -> Result<(), ExportError> {
    let mut keys = Vec::new();

    let mut graph_attrs = CoercedMap::new();
    graph_attrs.insert("name".into(), ExportValue::Text(graph.graph.name.clone()));
    let graph_ids = collect_keys("graph", std::iter::once(&graph_attrs), &mut keys)?;
    let node_ids = collect_keys("node", graph.nodes.iter().map(|n| &n.attrs), &mut keys)?;
    let edge_ids = collect_keys("edge", graph.edges.iter().map(|e| &e.attrs), &mut keys)?;

    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        out,
        "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:schemaLocation=\"http://graphml.graphdrawing.org/xmlns \
         http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd\">"
    )?;

    for key in &keys {
        writeln!(
            out,
            "  <key id=\"{}\" for=\"{}\" attr.name=\"{}\" attr.type=\"{}\" />",
            key.id,
            key.domain,
            xml_escape(&key.name),
            key.attr_type
        )?;
    }

    writeln!(out, "  <graph edgedefault=\"undirected\">")?;
    write_data(&mut out, "    ", &graph_ids, &graph_attrs)?;

    for node in &graph.nodes {
        writeln!(out, "    <node id=\"{}\">", xml_escape(&node.id))?;
        write_data(&mut out, "      ", &node_ids, &node.attrs)?;
        writeln!(out, "    </node>")?;
    }

    for edge in &graph.edges {
        writeln!(
            out,
            "    <edge source=\"{}\" target=\"{}\">",
            xml_escape(&edge.source),
            xml_escape(&edge.target)
        )?;
        write_data(&mut out, "      ", &edge_ids, &edge.attrs)?;
        writeln!(out, "    </edge>")?;
    }

    writeln!(out, "  </graph>")?;
    writeln!(out, "</graphml>")?;
    Ok(())
}

/// Write Graphviz DOT
pub fn write_dot<W: Write>(graph: &CoercedGraph, mut out: W) -> Result<(), ExportError> {
    writeln!(out, "graph \"{}\" {{", dot_escape(&graph.graph.name))?;

    for node in &graph.nodes {
        writeln!(
            out,
            "  \"{}\"{};",
            dot_escape(&node.id),
            dot_attrs(&node.attrs)
        )?;
    }

    if !graph.nodes.is_empty() {
        writeln!(out)?;
    }

    for edge in &graph.edges {
        writeln!(
            out,
            "  \"{}\" -- \"{}\"{};",
            dot_escape(&edge.source),
            dot_escape(&edge.target),
            dot_attrs(&edge.attrs)
        )?;
    }

    writeln!(out, "}}")?;
    Ok(())
}

fn dot_attrs(attrs: &CoercedMap) -> String {
    if attrs.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = attrs
        .iter()
        .map(|(name, value)| format!("{}=\"{}\"", name, dot_escape(&value.render())))
        .collect();
    format!(" [{}]", pairs.join(", "))
}

fn xml_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::parser::{parse_commit_timestamp, wrangle_commit, RowReader};
    use chrono::{FixedOffset, TimeZone};
    use proptest::prelude::*;

    fn scenario_graph() -> CommitGraph {
        let rows = "a1,, alice, Mon Jan 01 10:00:00 2020 +0000\n\
                    a2,a1, bob, Mon Jan 01 11:00:00 2020 +0000\n\
                    a3,p0, alice, Mon Jan 01 12:00:00 2020 +0000\n";
        let records = RowReader::new(rows.as_bytes(), false, wrangle_commit).map(Result::unwrap);
        let mut graph = build_graph("Test Commits", records);
        graph.annotate_elapsed();
        graph
    }

    fn render(format: ExportFormat, graph: &CommitGraph) -> String {
        let coerced = coerce_graph(graph);
        let mut buf = Vec::new();
        match format {
            ExportFormat::GraphMl => write_graphml(&coerced, &mut buf).unwrap(),
            ExportFormat::Json => write_json(&coerced, &mut buf).unwrap(),
            ExportFormat::Dot => write_dot(&coerced, &mut buf).unwrap(),
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_coerce_formats_timestamps_and_drops_absent() {
        let ts = parse_commit_timestamp("Mon Jan 02 15:04:05 2006 -0700").unwrap();
        let mut attrs = AttrMap::new();
        attrs.insert("timestamp".into(), AttrValue::Timestamp(ts));
        attrs.insert("elapsed".into(), AttrValue::Absent);
        attrs.insert("type".into(), "commit".into());

        let coerced = coerce(attrs);
        assert_eq!(coerced.len(), 2);
        assert_eq!(
            coerced.get("timestamp"),
            Some(&ExportValue::Text("2006-01-02T15:04:05-0700".into()))
        );
        assert!(!coerced.contains_key("elapsed"));
    }

    #[test]
    fn test_coercion_is_idempotent_on_timestamp_text() {
        let graph = scenario_graph();
        let first = coerce_graph(&graph);
        let second = coerce_graph(&graph);

        let stamps = |g: &CoercedGraph| -> Vec<ExportValue> {
            g.nodes.iter().filter_map(|n| n.attrs.get("timestamp").cloned()).collect()
        };
        assert_eq!(stamps(&first), stamps(&second));
        assert_eq!(stamps(&first).len(), 3);
    }

    #[test]
    fn test_graphml_contents() {
        let xml = render(ExportFormat::GraphMl, &scenario_graph());

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<graph edgedefault=\"undirected\">"));
        assert!(xml.contains("attr.name=\"elapsed\" attr.type=\"double\""));
        assert!(xml.contains("attr.name=\"timestamp\" attr.type=\"string\""));
        assert!(xml.contains("<node id=\"p0\">"));
        assert!(xml.contains(">2020-01-01T10:00:00+0000</data>"));
        assert!(xml.contains(">3600.0</data>"));
        assert!(xml.contains(">Test Commits</data>"));
        // absent values are omitted rather than written as null
        assert!(!xml.contains("None"));
        assert!(!xml.contains("null"));
    }

    #[test]
    fn test_graphml_escapes_identities() {
        let mut graph = CommitGraph::new("esc");
        graph.add_contributor("Tom & \"Jerry\" <tj@example.org>");
        let xml = render(ExportFormat::GraphMl, &graph);

        assert!(xml.contains("Tom &amp; &quot;Jerry&quot; &lt;tj@example.org&gt;"));
    }

    #[test]
    fn test_graphml_rejects_mixed_attribute_types() {
        let mut attrs_a = CoercedMap::new();
        attrs_a.insert("weight".into(), ExportValue::Float(1.0));
        let mut attrs_b = CoercedMap::new();
        attrs_b.insert("weight".into(), ExportValue::Text("heavy".into()));

        let graph = CoercedGraph {
            directed: false,
            multigraph: false,
            graph: GraphAttrs { name: "mixed".into() },
            nodes: vec![
                CoercedNode { id: "a".into(), attrs: attrs_a },
                CoercedNode { id: "b".into(), attrs: attrs_b },
            ],
            edges: vec![],
        };

        let err = write_graphml(&graph, Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            ExportError::ConflictingAttributeType { domain: "node", .. }
        ));
    }

    #[test]
    fn test_json_is_node_link() {
        let json = render(ExportFormat::Json, &scenario_graph());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["directed"], false);
        assert_eq!(value["graph"]["name"], "Test Commits");
        assert_eq!(value["nodes"].as_array().unwrap().len(), 6);
        assert_eq!(value["links"].as_array().unwrap().len(), 5);

        let p0 = value["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"] == "p0")
            .unwrap();
        assert_eq!(p0["type"], "commit");
        assert!(p0.get("timestamp").is_none());
    }

    #[test]
    fn test_dot_output() {
        let dot = render(ExportFormat::Dot, &scenario_graph());

        assert!(dot.starts_with("graph \"Test Commits\" {"));
        assert!(dot.contains("\"a1\" -- \"a2\" [elapsed=\"3600.0\", label=\"parent\"];"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_write_graph_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.graphml");
        std::fs::write(&path, "stale contents that are much longer than needed ".repeat(200)).unwrap();

        write_graph(&scenario_graph(), ExportFormat::GraphMl, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml"));
        assert!(!written.contains("stale"));
    }

    proptest! {
        #[test]
        fn prop_timestamp_text_round_trips(
            secs in 0i64..4_102_444_800,
            offset_minutes in -720i32..=840,
        ) {
            let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let ts = offset.timestamp_opt(secs, 0).unwrap();

            let text = format_timestamp(&ts);
            let back = chrono::DateTime::parse_from_str(&text, ISO8601_DATETIME).unwrap();

            prop_assert_eq!(back, ts);
            prop_assert_eq!(format_timestamp(&back), text);
        }
    }
}
