//! # infragraph-rs
//!
//! Loads a tabular infrastructure inventory (one row per server) into a Neo4j
//! property graph of servers, products, owners, teams, VPCs and security groups.
//!
//! ## Architecture
//!
//! - **Typed records**: header normalization and cell typing happen once, when the
//!   table is read ([`table`], [`record`])
//! - **Closed statement set**: seven node statements and six relationship
//!   statements, ordered by phase in a [`WritePlan`]
//! - **Per-statement validation**: a record joins a statement only when it carries
//!   every required field; skips are counted, never raised
//! - **Batched, idempotent writes**: match-or-create upserts, one transaction per
//!   batch, failed batches reported in a [`RunSummary`]

pub mod edges;
pub mod errors;
pub mod nodes;
pub mod record;
pub mod table;
pub mod types;

pub mod driver;
pub mod pipeline;
pub mod utils;

pub use driver::memory::MemoryGraph;
pub use driver::neo4j::Neo4jDriver;
pub use driver::GraphDriver;
pub use errors::{IngestError, Result, StoreError};
pub use pipeline::{RunSummary, StatementKind, StatementSummary, WritePlan, Writer};
pub use record::{Cell, Field, InventoryRecord};
pub use table::InventoryTable;
pub use types::{StoreConfig, WriterConfig};
