//! corax-client: Async REST client for the coraxcore graph database.
//!
//! All traffic to the core flows through [`CoraxClient`]. On verified
//! https connections the client bootstraps its trust anchor through
//! [`corax_certs::CertificatesHolder`], so a fresh process can talk to
//! a core whose CA is not in any system trust store.

pub mod cli;
pub mod client;
pub mod config;
pub mod configs;
pub mod export;
pub mod graphs;
pub mod search;
pub mod subscribers;

pub use cli::CliOutput;
pub use client::{ApiError, CoraxClient, JsonStream};
pub use config::ClientConfig;
pub use export::{csv_rows, graphviz_dot};
