//! Per-statement and per-run write summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::plan::{Phase, StatementKind};
use crate::record::Field;

/// Counts for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    pub statement: StatementKind,
    pub phase: Phase,
    /// Rows considered after any reference pre-filter.
    pub eligible: usize,
    /// Rows removed by a reference pre-filter before validation.
    pub excluded: usize,
    pub written: usize,
    /// Rows missing a required field.
    pub skipped_invalid: usize,
    /// Rows in batches that failed.
    pub skipped_failed: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Error of the most recent failed batch.
    pub last_failure: Option<String>,
    pub missing_fields: BTreeMap<Field, usize>,
}

impl StatementSummary {
    pub fn new(statement: StatementKind, phase: Phase) -> Self {
        Self {
            statement,
            phase,
            eligible: 0,
            excluded: 0,
            written: 0,
            skipped_invalid: 0,
            skipped_failed: 0,
            batches: 0,
            failed_batches: 0,
            last_failure: None,
            missing_fields: BTreeMap::new(),
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_failed
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: usize,
    pub statements: Vec<StatementSummary>,
}

impl RunSummary {
    pub fn statement(&self, kind: StatementKind) -> Option<&StatementSummary> {
        self.statements.iter().find(|s| s.statement == kind)
    }

    pub fn total_written(&self) -> usize {
        self.statements.iter().map(|s| s.written).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.statements.iter().map(StatementSummary::skipped).sum()
    }

    pub fn failed_batches(&self) -> usize {
        self.statements.iter().map(|s| s.failed_batches).sum()
    }

    /// Whether any batch failed to commit.
    pub fn has_failures(&self) -> bool {
        self.failed_batches() > 0
    }
}
