// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Loggraph library - contributor and ancestry graphs from commit and email logs
//!
//! This crate parses loosely structured commit logs into a graph of commit
//! and contributor nodes, derives elapsed-time weights along parent edges,
//! and writes the result out as GraphML, node-link JSON or DOT.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod email;
pub mod export;
pub mod graph;
pub mod parser;

/// Core data types shared by the parsers, graphs and exporters
pub mod types {
    use chrono::{DateTime, FixedOffset};
    use std::collections::BTreeMap;

    /// Point in time carried by commits and messages, offset preserved
    pub type Timestamp = DateTime<FixedOffset>;

    /// Layout used when timestamps are written out
    pub const ISO8601_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%z";

    // =========================================================================
    // Log Records
    // =========================================================================

    /// One parsed commit log line
    #[derive(Debug, Clone, PartialEq)]
    pub struct CommitRecord {
        /// Commit hash
        pub commit_id: String,
        /// Parent hashes, in log order (empty for root commits)
        pub parent_ids: Vec<String>,
        /// Author of the commit
        pub contributor: String,
        /// Commit time
        pub timestamp: Timestamp,
        /// Trailing free text (usually the message), rejoined if it overflowed
        pub extra: Option<String>,
    }

    /// One parsed email log line
    #[derive(Debug, Clone, PartialEq)]
    pub struct EmailRecord {
        /// Sender address
        pub source: String,
        /// Recipient address
        pub target: String,
        /// When the message was sent
        pub timestamp: Timestamp,
        /// Subject line, if the row had one
        pub subject: Option<String>,
    }

    // =========================================================================
    // Commit Graph Elements
    // =========================================================================

    /// Role of a node in the commit graph
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum NodeKind {
        /// A commit; the timestamp is unknown when the node was only seen as a parent
        Commit {
            /// Commit time from the commit's own record
            timestamp: Option<Timestamp>,
        },
        /// A person who authored commits
        Contributor,
    }

    impl NodeKind {
        /// Value written for the `type` attribute
        #[must_use]
        pub fn type_name(&self) -> &'static str {
            match self {
                Self::Commit { .. } => "commit",
                Self::Contributor => "contributor",
            }
        }

        /// Commit timestamp, if this is a commit that has one
        #[must_use]
        pub fn timestamp(&self) -> Option<Timestamp> {
            match self {
                Self::Commit { timestamp } => *timestamp,
                Self::Contributor => None,
            }
        }

        /// Check if this is a contributor node
        #[must_use]
        pub fn is_contributor(&self) -> bool {
            matches!(self, Self::Contributor)
        }
    }

    /// A node in the commit graph, keyed by commit hash or contributor name
    #[derive(Debug, Clone, PartialEq)]
    pub struct CommitNode {
        /// Identity of the node
        pub id: String,
        /// Commit or contributor
        pub kind: NodeKind,
    }

    /// Edge roles in the commit graph
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum EdgeLabel {
        /// Contributor authored the commit
        Contributor,
        /// Ancestry link from parent commit to child commit
        Parent,
    }

    impl EdgeLabel {
        /// Value written for the `label` attribute
        #[must_use]
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Contributor => "contributor",
                Self::Parent => "parent",
            }
        }
    }

    /// Edge payload in the commit graph
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct CommitEdge {
        /// Role of the edge
        pub label: EdgeLabel,
        /// Seconds from parent to child; only set on parent edges after annotation
        pub elapsed: Option<f64>,
    }

    impl CommitEdge {
        /// Create an edge with no weight yet
        #[must_use]
        pub fn new(label: EdgeLabel) -> Self {
            Self { label, elapsed: None }
        }
    }

    /// One message between two addresses in the email graph
    #[derive(Debug, Clone, PartialEq)]
    pub struct EmailEdge {
        /// When the message was sent
        pub sent: Timestamp,
        /// Subject line
        pub subject: Option<String>,
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// In-memory attribute value before export coercion
    #[derive(Debug, Clone, PartialEq)]
    pub enum AttrValue {
        /// Free text
        Text(String),
        /// Floating point number
        Float(f64),
        /// Point in time
        Timestamp(Timestamp),
        /// No value; dropped on export
        Absent,
    }

    impl From<Option<Timestamp>> for AttrValue {
        fn from(value: Option<Timestamp>) -> Self {
            value.map_or(Self::Absent, Self::Timestamp)
        }
    }

    impl From<Option<f64>> for AttrValue {
        fn from(value: Option<f64>) -> Self {
            value.map_or(Self::Absent, Self::Float)
        }
    }

    impl From<Option<String>> for AttrValue {
        fn from(value: Option<String>) -> Self {
            value.map_or(Self::Absent, Self::Text)
        }
    }

    impl From<&str> for AttrValue {
        fn from(value: &str) -> Self {
            Self::Text(value.to_string())
        }
    }

    /// Attribute mapping of a single node or edge, ordered by key
    pub type AttrMap = BTreeMap<String, AttrValue>;
}
