//! Ingestion pipeline.
//!
//! The writer runs the statements of a [`WritePlan`] against a [`GraphDriver`]:
//! 1. **Nodes**: every node statement, in plan order
//! 2. **Relationships**: every relationship statement, in plan order
//!
//! For each statement the full record set is validated, projected and split into
//! batches; each batch is one transaction. A failed batch is logged and counted,
//! and the run moves on.

pub mod batch;
pub mod plan;
pub mod summary;
pub mod validate;

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::driver::GraphDriver;
use crate::errors::{Result, StoreError};
use crate::nodes::NodeLabel;
use crate::record::{Field, InventoryRecord};
use crate::types::WriterConfig;

pub use plan::{Phase, Statement, StatementKind, WritePlan};
pub use summary::{RunSummary, StatementSummary};
pub use validate::Params;

use batch::{batch_count, batches};
use validate::{filter_records, is_usable_reference};

/// Node labels whose statements only see records carrying a usable reference to
/// that label.
const REFERENCE_FILTERS: [(NodeLabel, Field); 1] = [(NodeLabel::Vpc, Field::VpcId)];

/// Result of one batch transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Committed; carries the number of rows in the batch.
    Written(usize),
    /// Rolled back or never committed.
    Failed { rows: usize, reason: StoreError },
}

/// Runs a write plan against a graph driver.
pub struct Writer<'a, D: GraphDriver> {
    driver: &'a D,
    plan: WritePlan,
    config: WriterConfig,
}

impl<'a, D: GraphDriver> Writer<'a, D> {
    /// A writer for the standard thirteen-statement plan.
    pub fn new(driver: &'a D, config: WriterConfig) -> Self {
        Self {
            driver,
            plan: WritePlan::standard(),
            config,
        }
    }

    pub fn with_plan(mut self, plan: WritePlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn plan(&self) -> &WritePlan {
        &self.plan
    }

    /// Create the unique constraints the plan's node labels rely on.
    pub async fn ensure_constraints(&self) -> Result<()> {
        self.driver.ensure_constraints(&self.plan.constraints()).await
    }

    /// Write every statement of the plan, nodes first.
    ///
    /// Never fails: validation skips and failed batches are reported in the
    /// returned summary.
    pub async fn write_all(&self, records: &[InventoryRecord]) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("ingest", %run_id, records = records.len());

        let statements = async {
            info!(
                batch_size = self.config.batch_size,
                concurrency = self.config.concurrency(),
                "starting write"
            );
            let mut statements = Vec::with_capacity(self.plan.nodes().len() + self.plan.relationships().len());
            for phase in [Phase::Nodes, Phase::Relationships] {
                info!(phase = ?phase, "phase started");
                for statement in self.plan.statements().filter(|s| s.phase() == phase) {
                    statements.push(self.write_statement(statement, records).await);
                }
            }
            statements
        }
        .instrument(span)
        .await;

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            records: records.len(),
            statements,
        };
        info!(
            %run_id,
            written = summary.total_written(),
            skipped = summary.total_skipped(),
            failed_batches = summary.failed_batches(),
            "write finished"
        );
        summary
    }

    async fn write_statement(
        &self,
        statement: Statement,
        records: &[InventoryRecord],
    ) -> StatementSummary {
        let kind = statement.kind();
        let mut summary = StatementSummary::new(kind, statement.phase());

        let candidates: Vec<&InventoryRecord> = records
            .iter()
            .filter(|record| {
                REFERENCE_FILTERS
                    .iter()
                    .filter(|(label, _)| statement.references(*label))
                    .all(|(_, field)| is_usable_reference(record.get(*field)))
            })
            .collect();
        summary.excluded = records.len() - candidates.len();
        summary.eligible = candidates.len();
        if summary.excluded > 0 {
            debug!(statement = %kind, excluded = summary.excluded, "records without a usable reference excluded");
        }

        let filtered = filter_records(
            candidates,
            &statement.required_fields(),
            &statement.optional_fields(),
        );
        for skip in &filtered.skipped {
            debug!(statement = %kind, row = skip.row, missing = ?skip.missing, "record skipped");
        }
        summary.skipped_invalid = filtered.skipped.len();
        summary.missing_fields = filtered.missing_field_counts();
        if !summary.missing_fields.is_empty() {
            info!(
                statement = %kind,
                skipped = summary.skipped_invalid,
                missing = ?summary.missing_fields,
                "records skipped for missing required fields"
            );
        }

        debug!(
            statement = %kind,
            rows = filtered.rows.len(),
            batches = batch_count(filtered.rows.len(), self.config.batch_size()),
            "statement started"
        );

        let statement = &statement;
        let outcomes: Vec<BatchOutcome> =
            stream::iter(batches(&filtered.rows, self.config.batch_size()).enumerate())
                .map(move |(index, rows)| self.run_batch(statement, index, rows))
                .buffered(self.config.concurrency())
                .collect()
                .await;

        for outcome in outcomes {
            summary.batches += 1;
            match outcome {
                BatchOutcome::Written(rows) => summary.written += rows,
                BatchOutcome::Failed { rows, reason } => {
                    summary.failed_batches += 1;
                    summary.skipped_failed += rows;
                    summary.last_failure = Some(reason.to_string());
                }
            }
        }

        info!(
            statement = %kind,
            written = summary.written,
            skipped = summary.skipped(),
            batches = summary.batches,
            failed_batches = summary.failed_batches,
            "statement complete"
        );
        summary
    }

    async fn run_batch(&self, statement: &Statement, index: usize, rows: &[Params]) -> BatchOutcome {
        let result = match self.config.retry_max_elapsed() {
            None => self.attempt(statement, rows).await,
            Some(max_elapsed) => {
                let policy = ExponentialBackoffBuilder::new()
                    .with_initial_interval(Duration::from_millis(200))
                    .with_max_interval(Duration::from_secs(10))
                    .with_max_elapsed_time(Some(max_elapsed))
                    .build();

                backoff::future::retry(policy, move || async move {
                    self.attempt(statement, rows).await.map_err(|e| {
                        if e.is_transient() {
                            warn!(statement = %statement.kind(), batch = index, error = %e, "transient failure, retrying");
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                })
                .await
            }
        };

        match result {
            Ok(()) => {
                debug!(statement = %statement.kind(), batch = index, rows = rows.len(), "batch written");
                BatchOutcome::Written(rows.len())
            }
            Err(reason) => {
                warn!(
                    statement = %statement.kind(),
                    batch = index,
                    rows = rows.len(),
                    error = %reason,
                    "batch failed, continuing"
                );
                BatchOutcome::Failed {
                    rows: rows.len(),
                    reason,
                }
            }
        }
    }

    /// One transaction attempt under the batch timeout.
    async fn attempt(&self, statement: &Statement, rows: &[Params]) -> std::result::Result<(), StoreError> {
        let limit = self.config.batch_timeout();
        match tokio::time::timeout(limit, self.driver.execute_batch(statement, rows)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(limit)),
        }
    }
}
