//! Neo4j graph driver implementation.
//!
//! Uses `neo4rs` 0.8 for async, pooled Bolt connections. Each batch is sent as a
//! single `$rows` list parameter and runs in its own explicit transaction.

use std::collections::HashMap;

use neo4rs::{query, BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph};
use tracing::{debug, info, warn};

use crate::driver::GraphDriver;
use crate::errors::{IngestError, Result, StoreError};
use crate::nodes::NodeLabel;
use crate::pipeline::plan::Statement;
use crate::pipeline::validate::Params;
use crate::record::Cell;
use crate::types::StoreConfig;

/// Pooled connection to a Neo4j database.
pub struct Neo4jDriver {
    graph: Graph,
    database: String,
}

impl Neo4jDriver {
    /// Open a connection pool against the configured database.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .build()
            .map_err(|e| IngestError::Driver(format!("invalid connection settings: {e}")))?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| IngestError::Driver(format!("failed to connect to {}: {e}", config.uri)))?;

        info!(uri = %config.uri, database = %config.database, "connected to Neo4j");
        Ok(Self {
            graph,
            database: config.database.clone(),
        })
    }
}

impl GraphDriver for Neo4jDriver {
    async fn ping(&self) -> Result<()> {
        self.graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| IngestError::Driver(format!("ping failed: {e}")))
    }

    async fn close(&self) -> Result<()> {
        // neo4rs releases pooled connections when the graph handle drops.
        debug!(database = %self.database, "closing Neo4j driver");
        Ok(())
    }

    async fn ensure_constraints(&self, labels: &[NodeLabel]) -> Result<()> {
        for label in labels {
            self.graph
                .run(query(&label.constraint_cypher()))
                .await
                .map_err(|e| {
                    IngestError::Driver(format!("failed to create constraint for {label}: {e}"))
                })?;
            debug!(label = %label, "constraint ensured");
        }
        info!(count = labels.len(), "unique constraints ensured");
        Ok(())
    }

    async fn execute_batch(
        &self,
        statement: &Statement,
        rows: &[Params],
    ) -> std::result::Result<(), StoreError> {
        let q = query(&statement.cypher()).param("rows", rows_to_bolt(rows));

        let mut txn = self.graph.start_txn().await.map_err(classify_error)?;
        match txn.run(q).await {
            Ok(()) => txn.commit().await.map_err(classify_error),
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(
                        statement = %statement.kind(),
                        error = %rollback_err,
                        "rollback failed"
                    );
                }
                Err(classify_error(e))
            }
        }
    }
}

/// Map a neo4rs error onto the retry classification.
fn classify_error(err: neo4rs::Error) -> StoreError {
    match &err {
        neo4rs::Error::ConnectionError => StoreError::Transient(err.to_string()),
        neo4rs::Error::Neo4j(e) if e.kind() == neo4rs::Neo4jErrorKind::Transient => {
            StoreError::Transient(err.to_string())
        }
        _ => StoreError::Rejected(err.to_string()),
    }
}

fn rows_to_bolt(rows: &[Params]) -> BoltType {
    BoltType::List(BoltList {
        value: rows.iter().map(row_to_bolt).collect(),
    })
}

fn row_to_bolt(row: &Params) -> BoltType {
    let value: HashMap<BoltString, BoltType> = row
        .iter()
        .map(|(field, cell)| (BoltString::new(field.column()), cell_to_bolt(cell)))
        .collect();
    BoltType::Map(BoltMap { value })
}

fn cell_to_bolt(cell: &Cell) -> BoltType {
    match cell {
        Cell::Null => BoltType::Null(BoltNull),
        Cell::Bool(b) => BoltType::Boolean(neo4rs::BoltBoolean::new(*b)),
        Cell::Integer(i) => BoltType::Integer(neo4rs::BoltInteger::new(*i)),
        Cell::Float(f) if f.is_nan() => BoltType::Null(BoltNull),
        Cell::Float(f) => BoltType::Float(neo4rs::BoltFloat::new(*f)),
        Cell::Text(s) => BoltType::String(BoltString::new(s)),
        Cell::List(items) => BoltType::List(BoltList {
            value: items
                .iter()
                .map(|s| BoltType::String(BoltString::new(s)))
                .collect(),
        }),
    }
}
