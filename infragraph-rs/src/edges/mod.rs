//! Relationship types and relationship-creating statements.
//!
//! Six relationship types, all property-less and directed:
//! - `(:Server)-[:RUNS]->(:Product)`
//! - `(:Server)-[:OWNED_BY]->(:ProductOwner)`
//! - `(:Product)-[:SUPPORTED_BY]->(:ProductOwner)`
//! - `(:Product)-[:BELONGS_TO_TEAM]->(:ProductTeam)`
//! - `(:Server)-[:PART_OF_VPC]->(:VPC)`
//! - `(:Server)-[:USES_SECURITY_GROUP]->(:SecurityGroup)` (one row, many edges)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::nodes::NodeLabel;
use crate::pipeline::plan::StatementKind;
use crate::record::Field;

/// Relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    Runs,
    OwnedBy,
    SupportedBy,
    BelongsToTeam,
    PartOfVpc,
    UsesSecurityGroup,
}

impl RelType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelType::Runs => "RUNS",
            RelType::OwnedBy => "OWNED_BY",
            RelType::SupportedBy => "SUPPORTED_BY",
            RelType::BelongsToTeam => "BELONGS_TO_TEAM",
            RelType::PartOfVpc => "PART_OF_VPC",
            RelType::UsesSecurityGroup => "USES_SECURITY_GROUP",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a relationship: the node label and the record field holding its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub label: NodeLabel,
    pub field: Field,
}

/// Match both endpoints, then match-or-create the edge between them.
///
/// Endpoints are never created here; a row whose endpoint node does not exist
/// produces no edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipStatement {
    pub kind: StatementKind,
    pub rel_type: RelType,
    pub source: Endpoint,
    pub target: Endpoint,
}

impl RelationshipStatement {
    pub fn required_fields(&self) -> Vec<Field> {
        vec![self.source.field, self.target.field]
    }

    pub fn references(&self, label: NodeLabel) -> bool {
        self.source.label == label || self.target.label == label
    }

    pub fn cypher(&self) -> String {
        let mut cypher = String::from("UNWIND $rows AS row\n");
        let source_key = endpoint_key(&mut cypher, &self.source, "source_key");
        let target_key = endpoint_key(&mut cypher, &self.target, "target_key");
        cypher.push_str(&format!(
            "MATCH (a:{source_label} {{{source_prop}: {source_key}}}), \
             (b:{target_label} {{{target_prop}: {target_key}}})\n\
             MERGE (a)-[:{rel}]->(b)",
            source_label = self.source.label.as_str(),
            source_prop = self.source.label.key_property(),
            target_label = self.target.label.as_str(),
            target_prop = self.target.label.key_property(),
            rel = self.rel_type.as_str(),
        ));
        cypher
    }
}

/// Key expression for an endpoint, emitting an UNWIND for list-valued fields.
fn endpoint_key(cypher: &mut String, endpoint: &Endpoint, alias: &str) -> String {
    if endpoint.field.is_multi_valued() {
        cypher.push_str(&format!("UNWIND row.{} AS {alias}\n", endpoint.field.column()));
        alias.to_string()
    } else {
        format!("row.{}", endpoint.field.column())
    }
}

const SERVER: Endpoint = Endpoint {
    label: NodeLabel::Server,
    field: Field::Servers,
};

const PRODUCT: Endpoint = Endpoint {
    label: NodeLabel::Product,
    field: Field::Product,
};

pub const SERVER_RUNS_PRODUCT: RelationshipStatement = RelationshipStatement {
    kind: StatementKind::ServerRunsProduct,
    rel_type: RelType::Runs,
    source: SERVER,
    target: PRODUCT,
};

pub const SERVER_OWNED_BY_OWNER: RelationshipStatement = RelationshipStatement {
    kind: StatementKind::ServerOwnedByOwner,
    rel_type: RelType::OwnedBy,
    source: SERVER,
    target: Endpoint {
        label: NodeLabel::ProductOwner,
        field: Field::ProductOwner,
    },
};

pub const PRODUCT_SUPPORTED_BY_OWNER: RelationshipStatement = RelationshipStatement {
    kind: StatementKind::ProductSupportedByOwner,
    rel_type: RelType::SupportedBy,
    source: PRODUCT,
    target: Endpoint {
        label: NodeLabel::ProductOwner,
        field: Field::SupportingProductOwner,
    },
};

pub const PRODUCT_BELONGS_TO_TEAM: RelationshipStatement = RelationshipStatement {
    kind: StatementKind::ProductBelongsToTeam,
    rel_type: RelType::BelongsToTeam,
    source: PRODUCT,
    target: Endpoint {
        label: NodeLabel::ProductTeam,
        field: Field::ProductTeam,
    },
};

pub const SERVER_PART_OF_VPC: RelationshipStatement = RelationshipStatement {
    kind: StatementKind::ServerPartOfVpc,
    rel_type: RelType::PartOfVpc,
    source: SERVER,
    target: Endpoint {
        label: NodeLabel::Vpc,
        field: Field::VpcId,
    },
};

pub const SERVER_USES_SECURITY_GROUP: RelationshipStatement = RelationshipStatement {
    kind: StatementKind::ServerUsesSecurityGroup,
    rel_type: RelType::UsesSecurityGroup,
    source: SERVER,
    target: Endpoint {
        label: NodeLabel::SecurityGroup,
        field: Field::SecurityGroupsParsed,
    },
};

/// Relationship statements in execution order.
pub const RELATIONSHIP_STATEMENTS: [RelationshipStatement; 6] = [
    SERVER_RUNS_PRODUCT,
    SERVER_OWNED_BY_OWNER,
    PRODUCT_SUPPORTED_BY_OWNER,
    PRODUCT_BELONGS_TO_TEAM,
    SERVER_PART_OF_VPC,
    SERVER_USES_SECURITY_GROUP,
];
