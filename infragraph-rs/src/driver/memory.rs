//! In-process graph store.
//!
//! Applies statements with the same match-or-create semantics as the Cypher the
//! Neo4j driver sends, without a database. Used by `--dry-run` and by tests, which
//! can also inject batch failures and inspect the order statements ran in.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::driver::GraphDriver;
use crate::edges::{Endpoint, RelType, RelationshipStatement};
use crate::errors::{Result, StoreError};
use crate::nodes::{NodeLabel, NodeStatement};
use crate::pipeline::plan::{Statement, StatementKind};
use crate::pipeline::validate::Params;
use crate::record::{Cell, Field};

type NodeKey = (NodeLabel, String);
type EdgeKey = (RelType, NodeKey, NodeKey);

/// One `execute_batch` call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub statement: StatementKind,
    pub rows: usize,
    pub committed: bool,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<NodeKey, BTreeMap<String, Cell>>,
    edges: BTreeSet<EdgeKey>,
    constraints: BTreeSet<NodeLabel>,
    journal: Vec<JournalEntry>,
    calls: HashMap<StatementKind, usize>,
    failures: Vec<Failure>,
    delays: HashMap<StatementKind, Duration>,
}

#[derive(Debug, Clone)]
struct Failure {
    statement: StatementKind,
    /// 1-based call number, or every call when `None`.
    call: Option<usize>,
    error: StoreError,
}

/// In-memory property graph.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<State>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves no partial batch behind.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail the `call`-th batch (1-based) of `statement` with `error`.
    pub fn fail_on(&self, statement: StatementKind, call: usize, error: StoreError) {
        self.state().failures.push(Failure {
            statement,
            call: Some(call),
            error,
        });
    }

    /// Fail every batch of `statement` with `error`.
    pub fn fail_always(&self, statement: StatementKind, error: StoreError) {
        self.state().failures.push(Failure {
            statement,
            call: None,
            error,
        });
    }

    /// Delay every batch of `statement` before it is applied.
    pub fn delay(&self, statement: StatementKind, delay: Duration) {
        self.state().delays.insert(statement, delay);
    }

    pub fn node_count(&self, label: NodeLabel) -> usize {
        self.state()
            .nodes
            .keys()
            .filter(|(l, _)| *l == label)
            .count()
    }

    pub fn has_node(&self, label: NodeLabel, key: &str) -> bool {
        self.state()
            .nodes
            .contains_key(&(label, key.to_string()))
    }

    pub fn node_property(&self, label: NodeLabel, key: &str, property: &str) -> Option<Cell> {
        self.state()
            .nodes
            .get(&(label, key.to_string()))
            .and_then(|props| props.get(property).cloned())
    }

    pub fn edge_count(&self, rel_type: RelType) -> usize {
        self.state()
            .edges
            .iter()
            .filter(|(r, _, _)| *r == rel_type)
            .count()
    }

    /// Whether an edge of `rel_type` joins the nodes keyed `source` and `target`.
    pub fn has_edge(&self, rel_type: RelType, source: &str, target: &str) -> bool {
        self.state()
            .edges
            .iter()
            .any(|(r, (_, s), (_, t))| *r == rel_type && s == source && t == target)
    }

    pub fn total_nodes(&self) -> usize {
        self.state().nodes.len()
    }

    pub fn total_edges(&self) -> usize {
        self.state().edges.len()
    }

    pub fn constraints(&self) -> Vec<NodeLabel> {
        self.state().constraints.iter().copied().collect()
    }

    /// Every batch attempt so far, in call order.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state().journal.clone()
    }
}

impl GraphDriver for MemoryGraph {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_constraints(&self, labels: &[NodeLabel]) -> Result<()> {
        self.state().constraints.extend(labels.iter().copied());
        Ok(())
    }

    async fn execute_batch(
        &self,
        statement: &Statement,
        rows: &[Params],
    ) -> std::result::Result<(), StoreError> {
        let kind = statement.kind();
        let delay = self.state().delays.get(&kind).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let call = {
            let calls = state.calls.entry(kind).or_insert(0);
            *calls += 1;
            *calls
        };
        let injected = state
            .failures
            .iter()
            .find(|f| f.statement == kind && f.call.map_or(true, |c| c == call))
            .map(|f| f.error.clone());

        // Apply to a scratch copy so a failing row leaves the graph untouched.
        let outcome = match injected {
            Some(error) => Err(error),
            None => {
                let mut nodes = state.nodes.clone();
                let mut edges = state.edges.clone();
                let applied = match statement {
                    Statement::Node(s) => apply_nodes(&mut nodes, s, rows),
                    Statement::Relationship(s) => apply_edges(&nodes, &mut edges, s, rows),
                };
                applied.map(|()| {
                    state.nodes = nodes;
                    state.edges = edges;
                })
            }
        };

        debug!(statement = %kind, call, rows = rows.len(), ok = outcome.is_ok(), "memory batch");
        state.journal.push(JournalEntry {
            statement: kind,
            rows: rows.len(),
            committed: outcome.is_ok(),
        });
        outcome
    }
}

/// Identity keys a row yields for `field`: one for scalars, 0..n for lists.
fn row_keys(row: &Params, field: Field) -> std::result::Result<Vec<String>, StoreError> {
    match row.get(&field) {
        Some(Cell::List(items)) => Ok(items
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
        Some(cell) => cell
            .to_key()
            .map(|key| vec![key])
            .ok_or_else(|| null_key(field)),
        None => Err(null_key(field)),
    }
}

fn null_key(field: Field) -> StoreError {
    StoreError::Rejected(format!("cannot merge on null property value for {field}"))
}

fn apply_nodes(
    nodes: &mut BTreeMap<NodeKey, BTreeMap<String, Cell>>,
    statement: &NodeStatement,
    rows: &[Params],
) -> std::result::Result<(), StoreError> {
    for row in rows {
        for key in row_keys(row, statement.key)? {
            let props = nodes.entry((statement.label, key.clone())).or_default();
            props.insert(statement.label.key_property().to_string(), Cell::Text(key));
            for attribute in statement.attributes {
                match row.get(&attribute.field).filter(|c| c.is_present()) {
                    Some(value) => {
                        props.insert(attribute.property.to_string(), value.clone());
                    }
                    None => {
                        props.remove(attribute.property);
                    }
                }
            }
        }
    }
    Ok(())
}

fn apply_edges(
    nodes: &BTreeMap<NodeKey, BTreeMap<String, Cell>>,
    edges: &mut BTreeSet<EdgeKey>,
    statement: &RelationshipStatement,
    rows: &[Params],
) -> std::result::Result<(), StoreError> {
    for row in rows {
        let sources = matched(nodes, row, &statement.source)?;
        let targets = matched(nodes, row, &statement.target)?;
        for source in &sources {
            for target in &targets {
                edges.insert((statement.rel_type, source.clone(), target.clone()));
            }
        }
    }
    Ok(())
}

/// Existing nodes an endpoint matches; missing nodes match nothing.
fn matched(
    nodes: &BTreeMap<NodeKey, BTreeMap<String, Cell>>,
    row: &Params,
    endpoint: &Endpoint,
) -> std::result::Result<Vec<NodeKey>, StoreError> {
    Ok(row_keys(row, endpoint.field)?
        .into_iter()
        .map(|key| (endpoint.label, key))
        .filter(|node| nodes.contains_key(node))
        .collect())
}
