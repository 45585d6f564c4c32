//! Wire types for the coraxcore REST API.
//!
//! Field names follow the JSON emitted by coraxcore, so most structs
//! derive serde with renames only where the wire format diverges from
//! Rust naming conventions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Arbitrary JSON value as returned by the core.
pub type JsonValue = serde_json::Value;

/// A JSON object (node documents, config payloads, CLI environments).
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

// ── Schema Model ──────────────────────────────────────────────────

/// A single kind in the coraxcore data model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Kind {
    /// Fully qualified name of this kind.
    pub fqn: String,
    /// For simple kinds, the runtime representation (string, int32, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_kind: Option<String>,
}

/// The complete data model of a graph: all kinds keyed by fqn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Model {
    pub kinds: BTreeMap<String, Kind>,
}

impl Model {
    /// Build a model from a flat list of kinds, as returned by newer cores.
    pub fn from_kinds(kinds: Vec<Kind>) -> Self {
        Self {
            kinds: kinds.into_iter().map(|k| (k.fqn.clone(), k)).collect(),
        }
    }
}

// ── Graph Updates ─────────────────────────────────────────────────

/// Counters returned after a graph merge or batch commit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphUpdate {
    pub nodes_created: u64,
    // the core reports node updates under this (misspelled) key
    #[serde(rename = "nodes_updates")]
    pub nodes_updated: u64,
    pub nodes_deleted: u64,
    pub edges_created: u64,
    pub edges_updated: u64,
    pub edges_deleted: u64,
}

// ── Search Cost ───────────────────────────────────────────────────

/// Interpreted rating of an estimated search cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CostRating {
    Simple,
    Complex,
    Bad,
}

/// Cost estimate for a search, computed from query statistics.
///
/// `estimated_nr_items` is a heuristic, not the real result count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EstimatedSearchCost {
    /// Absolute cost number; see `rating` for an interpretation.
    pub estimated_cost: u64,
    /// Estimated number of items this search returns.
    pub estimated_nr_items: u64,
    /// Number of nodes available in the graph.
    pub available_nr_items: u64,
    /// True if the search cannot use any index.
    pub full_collection_scan: bool,
    pub rating: CostRating,
}

// ── Subscribers ───────────────────────────────────────────────────

/// A subscription to a single message type on the core's event system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub message_type: String,
    #[serde(default = "default_true")]
    pub wait_for_completion: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Subscription {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            wait_for_completion: true,
            timeout: default_timeout(),
        }
    }
}

/// A registered subscriber with its active subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscriber {
    pub id: String,
    #[serde(default)]
    pub subscriptions: BTreeMap<String, Subscription>,
}

// ── CLI ───────────────────────────────────────────────────────────

/// One command of a parsed CLI line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedCommand {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

/// A parsed CLI line: the command chain plus its evaluation environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedCommands {
    pub commands: Vec<ParsedCommand>,
    #[serde(default)]
    pub env: JsonObject,
}

// ── Configs ───────────────────────────────────────────────────────

/// Validation settings attached to a config object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigValidation {
    pub id: String,
    #[serde(default)]
    pub external_validation: bool,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    60
}
