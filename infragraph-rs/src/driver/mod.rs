//! Graph store abstraction.
//!
//! Defines the [`GraphDriver`] trait the writer runs against, plus the Neo4j
//! implementation and an in-process [`memory::MemoryGraph`] used for dry runs and
//! tests.

pub mod memory;
pub mod neo4j;

use crate::errors::{Result, StoreError};
use crate::nodes::NodeLabel;
use crate::pipeline::plan::Statement;
use crate::pipeline::validate::Params;

/// Trait representing a graph store backend.
///
/// Every call to [`GraphDriver::execute_batch`] is one atomic transaction: either
/// all rows of the batch are applied or none are.
#[allow(async_fn_in_trait)]
pub trait GraphDriver: Send + Sync {
    /// Health check: verify connectivity to the store.
    async fn ping(&self) -> Result<()>;

    /// Close the connection pool / session.
    async fn close(&self) -> Result<()>;

    /// Create one unique constraint per label on its identity property.
    ///
    /// Idempotent; safe to call on every run.
    async fn ensure_constraints(&self, labels: &[NodeLabel]) -> Result<()>;

    /// Apply `statement` to every row of one batch inside a single transaction.
    async fn execute_batch(
        &self,
        statement: &Statement,
        rows: &[Params],
    ) -> std::result::Result<(), StoreError>;
}
