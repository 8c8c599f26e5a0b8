// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Email graph - addresses connected by the messages sent between them

use crate::parser::{parse_commit_timestamp, ParseError, RowReader};
use crate::types::{EmailEdge, EmailRecord, Timestamp};
use crate::graph::GraphSummary;
use chrono::{DateTime, NaiveDateTime};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

/// Minimum number of fields in an email row
pub const EMAIL_FIELDS: usize = 3;

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const NAIVE_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Reader over email log rows
pub type EmailReader<R> = RowReader<R, EmailRecord>;

/// Open an email log for reading
pub fn open_email_log(path: &Path, has_headers: bool) -> io::Result<EmailReader<File>> {
    let file = File::open(path)?;
    Ok(RowReader::new(file, has_headers, wrangle_email))
}

/// Build an email record from the columns `source, target, timestamp[, subject...]`
pub fn wrangle_email(fields: Vec<String>) -> Result<EmailRecord, ParseError> {
    if fields.len() < EMAIL_FIELDS {
        return Err(ParseError::FieldCount {
            expected: EMAIL_FIELDS,
            found: fields.len(),
        });
    }

    let mut fields = fields.into_iter();
    let source = fields.next().unwrap_or_default();
    let target = fields.next().unwrap_or_default();
    let value = fields.next().unwrap_or_default();
    let timestamp = parse_email_timestamp(&value)
        .map_err(|source| ParseError::Timestamp { value, source })?;

    let rest: Vec<String> = fields.collect();
    let subject = if rest.is_empty() {
        None
    } else {
        Some(rest.join(", "))
    };

    Ok(EmailRecord {
        source,
        target,
        timestamp,
        subject,
    })
}

/// Parse a mail timestamp in any of the common layouts
///
/// Accepts RFC 2822, RFC 3339, ISO-8601 with or without an offset (UTC when
/// missing) and the commit log layout.
pub fn parse_email_timestamp(value: &str) -> Result<Timestamp, chrono::ParseError> {
    let value = value.trim();

    let mut last = match DateTime::parse_from_rfc2822(value) {
        Ok(ts) => return Ok(ts),
        Err(err) => err,
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }

    for layout in OFFSET_LAYOUTS {
        match DateTime::parse_from_str(value, layout) {
            Ok(ts) => return Ok(ts),
            Err(err) => last = err,
        }
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, layout) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    parse_commit_timestamp(value).map_err(|_| last)
}

/// Undirected multigraph of addresses; every message is its own edge
pub struct EmailGraph {
    name: String,
    graph: UnGraph<String, EmailEdge>,
    node_indices: HashMap<String, NodeIndex>,
}

impl EmailGraph {
    /// Create an empty email graph
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

    /// Add an address, reusing an existing node
    pub fn add_address(&mut self, address: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(address) {
            return idx;
        }
        let idx = self.graph.add_node(address.to_string());
        self.node_indices.insert(address.to_string(), idx);
        idx
    }

    /// Add one message between sender and recipient
    pub fn add_message(&mut self, record: EmailRecord) {
        let source = self.add_address(&record.source);
        let target = self.add_address(&record.target);
        self.graph.add_edge(
            source,
            target,
            EmailEdge {
                sent: record.timestamp,
                subject: record.subject,
            },
        );
    }

    /// All addresses in insertion order
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.graph.raw_nodes().iter().map(|n| n.weight.as_str())
    }

    /// All messages as (sender, recipient, payload)
    pub fn messages(&self) -> impl Iterator<Item = (&str, &str, &EmailEdge)> {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                e.weight(),
            )
        })
    }

    /// Number of messages exchanged between two addresses, either way
    #[must_use]
    pub fn messages_between(&self, a: &str, b: &str) -> usize {
        let (Some(&a), Some(&b)) = (self.node_indices.get(a), self.node_indices.get(b)) else {
            return 0;
        };
        self.graph
            .raw_edges()
            .iter()
            .filter(|e| {
                (e.source() == a && e.target() == b) || (e.source() == b && e.target() == a)
            })
            .count()
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

    /// Counts for the run summary
    #[must_use]
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            name: self.name.clone(),
            multigraph: true,
            nodes: self.node_count(),
            edges: self.edge_count(),
            breakdown: vec![
                ("addresses", self.node_count()),
                ("messages", self.edge_count()),
            ],
        }
    }
}

/// Build the email graph from a record stream
pub fn build_email_graph<I>(name: &str, records: I) -> EmailGraph
where
    I: IntoIterator<Item = EmailRecord>,
{
    let mut graph = EmailGraph::new(name);
    for record in records {
        graph.add_message(record);
    }
    debug!(
        "Built email graph with {} addresses and {} messages",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}
