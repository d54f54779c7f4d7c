//! IBPTax Harvester - Convert IBPTax rate tables into a versioned JSON shard tree.
//!
//! IBPTax tables are semicolon-separated Latin-1 files published per state
//! (UF) and release. Every row carries the approximate tax burden of one
//! fiscal code. The harvester classifies each code, validates the row and
//! merges it into one small JSON file per code so a lookup front-end can
//! fetch a single code without loading the whole table.
//!
//! # Example
//!
//! ```
//! use ibptax_harvester::classify::classify;
//! use ibptax_harvester::types::Taxonomy;
//! use ibptax_harvester::version;
//!
//! assert_eq!(version::normalize_str("25.2F"), "25.2.F");
//! assert_eq!(classify("85171231"), Taxonomy::Ncm);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, table name parsing and run settings
//! - [`types`]: Core data types (RateRecord, Taxonomy, ReleaseMetadata)
//! - [`error`]: Error types and Result alias
//! - [`version`]: Release version normalization and ordering
//! - [`classify`]: Fiscal code classification
//! - [`parse`]: Row splitting and field parsing
//! - [`store`]: Shard tree persistence and merge rule
//! - [`ingest`]: One table file into the tree
//! - [`batch`]: Local table discovery and batch runs
//! - [`http`]: HTTP client
//! - [`sync`]: Remote release discovery and download
//! - [`logging`]: Tracing subscriber setup
//! - [`cli`]: Command-line interface

pub mod batch;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod parse;
pub mod store;
pub mod sync;
pub mod types;
pub mod version;

// Re-export main functions
pub use ingest::{process, IngestSummary, NoProgress, ProgressSink};

// Re-export commonly used items
pub use error::{HarvesterError, Result};
pub use types::{RateRecord, ReleaseMetadata, Taxonomy};
