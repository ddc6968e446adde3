//! Node types and node-creating statements.
//!
//! Six node labels, each keyed by one identity property:
//! - [`NodeLabel::Server`], [`NodeLabel::Product`], [`NodeLabel::ProductOwner`],
//!   [`NodeLabel::ProductTeam`], keyed by `name`
//! - [`NodeLabel::Vpc`], [`NodeLabel::SecurityGroup`], keyed by `id`
//!
//! Seven statements create them; primary and supporting owners share the
//! `ProductOwner` label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::plan::StatementKind;
use crate::record::Field;

/// Graph node label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    Server,
    Product,
    ProductOwner,
    ProductTeam,
    #[serde(rename = "VPC")]
    Vpc,
    SecurityGroup,
}

impl NodeLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeLabel::Server => "Server",
            NodeLabel::Product => "Product",
            NodeLabel::ProductOwner => "ProductOwner",
            NodeLabel::ProductTeam => "ProductTeam",
            NodeLabel::Vpc => "VPC",
            NodeLabel::SecurityGroup => "SecurityGroup",
        }
    }

    /// The identity property, unique per label.
    pub fn key_property(self) -> &'static str {
        match self {
            NodeLabel::Vpc | NodeLabel::SecurityGroup => "id",
            _ => "name",
        }
    }

    /// Idempotent unique-constraint DDL for this label's identity property.
    pub fn constraint_cypher(self) -> String {
        let key = self.key_property();
        format!(
            "CREATE CONSTRAINT {name}_{key}_unique IF NOT EXISTS \
             FOR (n:{label}) REQUIRE n.{key} IS UNIQUE",
            name = self.as_str().to_lowercase(),
            label = self.as_str(),
        )
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node property copied from a record field on every upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub property: &'static str,
    pub field: Field,
}

/// Match-or-create a node by identity key, then overwrite its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatement {
    pub kind: StatementKind,
    pub label: NodeLabel,
    /// Record field holding the identity key. A multi-valued field yields one
    /// node per list entry.
    pub key: Field,
    pub attributes: &'static [Attribute],
}

impl NodeStatement {
    /// Fields a record must carry to take part in this statement.
    pub fn required_fields(&self) -> Vec<Field> {
        vec![self.key]
    }

    /// Fields sent to the store when present.
    pub fn optional_fields(&self) -> Vec<Field> {
        self.attributes.iter().map(|a| a.field).collect()
    }

    /// Cypher for one batch, reading rows from the `$rows` parameter.
    pub fn cypher(&self) -> String {
        let label = self.label.as_str();
        let key_prop = self.label.key_property();
        let mut cypher = String::from("UNWIND $rows AS row\n");
        let key_expr = if self.key.is_multi_valued() {
            cypher.push_str(&format!(
                "UNWIND row.{field} AS key\nWITH row, trim(key) AS key\nWHERE key <> ''\n",
                field = self.key.column()
            ));
            "key".to_string()
        } else {
            format!("row.{}", self.key.column())
        };
        cypher.push_str(&format!("MERGE (n:{label} {{{key_prop}: {key_expr}}})"));
        if !self.attributes.is_empty() {
            let sets: Vec<String> = self
                .attributes
                .iter()
                .map(|a| format!("n.{} = row.{}", a.property, a.field.column()))
                .collect();
            cypher.push_str("\nSET ");
            cypher.push_str(&sets.join(",\n    "));
        }
        cypher
    }
}

pub const CREATE_SERVER: NodeStatement = NodeStatement {
    kind: StatementKind::CreateServer,
    label: NodeLabel::Server,
    key: Field::Servers,
    attributes: &[
        Attribute { property: "state", field: Field::State },
        Attribute { property: "region", field: Field::Region },
        Attribute { property: "az", field: Field::AvailabilityZone },
        Attribute { property: "root_device", field: Field::RootDeviceName },
        Attribute { property: "root_volume", field: Field::RootVolumeId },
        Attribute { property: "autoscaling_group", field: Field::AutoscalingGroup },
        Attribute { property: "launch_template_id", field: Field::LaunchTemplateId },
        Attribute { property: "launch_template_version", field: Field::LaunchTemplateVersion },
    ],
};

pub const CREATE_PRODUCT: NodeStatement = NodeStatement {
    kind: StatementKind::CreateProduct,
    label: NodeLabel::Product,
    key: Field::Product,
    attributes: &[],
};

pub const CREATE_PRODUCT_OWNER: NodeStatement = NodeStatement {
    kind: StatementKind::CreateProductOwner,
    label: NodeLabel::ProductOwner,
    key: Field::ProductOwner,
    attributes: &[],
};

pub const CREATE_SUPPORTING_PRODUCT_OWNER: NodeStatement = NodeStatement {
    kind: StatementKind::CreateSupportingProductOwner,
    label: NodeLabel::ProductOwner,
    key: Field::SupportingProductOwner,
    attributes: &[],
};

pub const CREATE_PRODUCT_TEAM: NodeStatement = NodeStatement {
    kind: StatementKind::CreateProductTeam,
    label: NodeLabel::ProductTeam,
    key: Field::ProductTeam,
    attributes: &[],
};

pub const CREATE_VPC: NodeStatement = NodeStatement {
    kind: StatementKind::CreateVpc,
    label: NodeLabel::Vpc,
    key: Field::VpcId,
    attributes: &[],
};

pub const CREATE_SECURITY_GROUPS: NodeStatement = NodeStatement {
    kind: StatementKind::CreateSecurityGroups,
    label: NodeLabel::SecurityGroup,
    key: Field::SecurityGroupsParsed,
    attributes: &[],
};

/// Node statements in execution order.
pub const NODE_STATEMENTS: [NodeStatement; 7] = [
    CREATE_SERVER,
    CREATE_PRODUCT,
    CREATE_PRODUCT_OWNER,
    CREATE_SUPPORTING_PRODUCT_OWNER,
    CREATE_PRODUCT_TEAM,
    CREATE_VPC,
    CREATE_SECURITY_GROUPS,
];
