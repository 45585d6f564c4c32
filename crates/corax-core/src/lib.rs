//! corax-core: Shared models for the corax graph-database client.
//!
//! This crate provides the wire types exchanged with a coraxcore
//! instance via its REST interface:
//! - Model/Kind descriptions of the graph schema
//! - Graph merge results and search cost estimates
//! - Subscriber and subscription records
//! - Parsed CLI command structures

pub mod types;

pub use types::{
    ConfigValidation, CostRating, EstimatedSearchCost, GraphUpdate, JsonObject, JsonValue, Kind,
    Model, ParsedCommand, ParsedCommands, Subscriber, Subscription,
};
