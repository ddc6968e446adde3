//! Statement catalogue and the two-phase write plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edges::{RelationshipStatement, RELATIONSHIP_STATEMENTS};
use crate::errors::{IngestError, Result};
use crate::nodes::{NodeLabel, NodeStatement, NODE_STATEMENTS};
use crate::record::Field;

/// The thirteen statement types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    CreateServer,
    CreateProduct,
    CreateProductOwner,
    CreateSupportingProductOwner,
    CreateProductTeam,
    CreateVpc,
    CreateSecurityGroups,
    ServerRunsProduct,
    ServerOwnedByOwner,
    ProductSupportedByOwner,
    ProductBelongsToTeam,
    ServerPartOfVpc,
    ServerUsesSecurityGroup,
}

impl StatementKind {
    pub fn name(self) -> &'static str {
        match self {
            StatementKind::CreateServer => "create_server",
            StatementKind::CreateProduct => "create_product",
            StatementKind::CreateProductOwner => "create_product_owner",
            StatementKind::CreateSupportingProductOwner => "create_supporting_product_owner",
            StatementKind::CreateProductTeam => "create_product_team",
            StatementKind::CreateVpc => "create_vpc",
            StatementKind::CreateSecurityGroups => "create_security_groups",
            StatementKind::ServerRunsProduct => "server_runs_product",
            StatementKind::ServerOwnedByOwner => "server_owned_by_owner",
            StatementKind::ProductSupportedByOwner => "product_supported_by_owner",
            StatementKind::ProductBelongsToTeam => "product_belongs_to_team",
            StatementKind::ServerPartOfVpc => "server_part_of_vpc",
            StatementKind::ServerUsesSecurityGroup => "server_uses_security_group",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Write phase. Every node statement runs before any relationship statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Nodes,
    Relationships,
}

/// A node or relationship statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Node(NodeStatement),
    Relationship(RelationshipStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Node(s) => s.kind,
            Statement::Relationship(s) => s.kind,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Statement::Node(_) => Phase::Nodes,
            Statement::Relationship(_) => Phase::Relationships,
        }
    }

    /// Fields every row must carry, non-null and non-NaN.
    pub fn required_fields(&self) -> Vec<Field> {
        match self {
            Statement::Node(s) => s.required_fields(),
            Statement::Relationship(s) => s.required_fields(),
        }
    }

    /// Fields forwarded to the store only when present.
    pub fn optional_fields(&self) -> Vec<Field> {
        match self {
            Statement::Node(s) => s.optional_fields(),
            Statement::Relationship(_) => Vec::new(),
        }
    }

    pub fn references(&self, label: NodeLabel) -> bool {
        match self {
            Statement::Node(s) => s.label == label,
            Statement::Relationship(s) => s.references(label),
        }
    }

    pub fn cypher(&self) -> String {
        match self {
            Statement::Node(s) => s.cypher(),
            Statement::Relationship(s) => s.cypher(),
        }
    }
}

impl From<NodeStatement> for Statement {
    fn from(statement: NodeStatement) -> Self {
        Statement::Node(statement)
    }
}

impl From<RelationshipStatement> for Statement {
    fn from(statement: RelationshipStatement) -> Self {
        Statement::Relationship(statement)
    }
}

/// Ordered statements, split by phase.
///
/// The node phase and the relationship phase are separate lists, so a
/// relationship can never be scheduled ahead of the node statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    nodes: Vec<NodeStatement>,
    relationships: Vec<RelationshipStatement>,
}

impl WritePlan {
    /// Build a plan, rejecting relationships whose endpoint labels are not created
    /// by any node statement in the plan.
    pub fn new(
        nodes: Vec<NodeStatement>,
        relationships: Vec<RelationshipStatement>,
    ) -> Result<Self> {
        for rel in &relationships {
            for endpoint in [rel.source, rel.target] {
                if !nodes.iter().any(|n| n.label == endpoint.label) {
                    return Err(IngestError::Plan(format!(
                        "{} references {} but no node statement creates it",
                        rel.kind, endpoint.label
                    )));
                }
            }
        }
        Ok(Self {
            nodes,
            relationships,
        })
    }

    /// The thirteen-statement inventory plan.
    pub fn standard() -> Self {
        Self {
            nodes: NODE_STATEMENTS.to_vec(),
            relationships: RELATIONSHIP_STATEMENTS.to_vec(),
        }
    }

    pub fn nodes(&self) -> &[NodeStatement] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[RelationshipStatement] {
        &self.relationships
    }

    /// All statements in execution order.
    pub fn statements(&self) -> impl Iterator<Item = Statement> + '_ {
        self.nodes
            .iter()
            .copied()
            .map(Statement::from)
            .chain(self.relationships.iter().copied().map(Statement::from))
    }

    /// Labels that need a unique constraint, one entry per label.
    pub fn constraints(&self) -> Vec<NodeLabel> {
        let mut labels: Vec<NodeLabel> = self.nodes.iter().map(|n| n.label).collect();
        labels.sort();
        labels.dedup();
        labels
    }
}

impl Default for WritePlan {
    fn default() -> Self {
        Self::standard()
    }
}
