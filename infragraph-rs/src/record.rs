//! Typed inventory records.
//!
//! A source row becomes an [`InventoryRecord`]: a map from the closed set of known
//! columns ([`Field`]) to typed cell values ([`Cell`]). Columns outside that set are
//! dropped when the table is read.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::parse_security_groups;

/// Known inventory columns, named by their normalized header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Servers,
    State,
    Region,
    #[serde(rename = "Availability_Zone")]
    AvailabilityZone,
    #[serde(rename = "Root_Device_Name")]
    RootDeviceName,
    #[serde(rename = "Root_Volume_ID")]
    RootVolumeId,
    #[serde(rename = "Tag_aws_autoscaling_groupName")]
    AutoscalingGroup,
    #[serde(rename = "Tag_aws_ec2launchtemplate_id")]
    LaunchTemplateId,
    #[serde(rename = "Tag_aws_ec2launchtemplate_version")]
    LaunchTemplateVersion,
    Product,
    #[serde(rename = "Product_Owner")]
    ProductOwner,
    #[serde(rename = "Supporting_Product_Owner")]
    SupportingProductOwner,
    #[serde(rename = "Tag_product_team")]
    ProductTeam,
    #[serde(rename = "VPC_ID")]
    VpcId,
    #[serde(rename = "Security_Groups")]
    SecurityGroups,
    /// Derived from [`Field::SecurityGroups`]; never read from the source table.
    SecurityGroupsParsed,
}

impl Field {
    /// Columns that may appear in a source table, in canonical order.
    pub const SOURCE_COLUMNS: [Field; 15] = [
        Field::Servers,
        Field::State,
        Field::Region,
        Field::AvailabilityZone,
        Field::RootDeviceName,
        Field::RootVolumeId,
        Field::AutoscalingGroup,
        Field::LaunchTemplateId,
        Field::LaunchTemplateVersion,
        Field::Product,
        Field::ProductOwner,
        Field::SupportingProductOwner,
        Field::ProductTeam,
        Field::VpcId,
        Field::SecurityGroups,
    ];

    /// Columns a table must carry for a run to start.
    pub const REQUIRED_COLUMNS: [Field; 1] = [Field::Servers];

    /// Normalized column name; also the parameter key sent to the store.
    pub fn column(self) -> &'static str {
        match self {
            Field::Servers => "Servers",
            Field::State => "State",
            Field::Region => "Region",
            Field::AvailabilityZone => "Availability_Zone",
            Field::RootDeviceName => "Root_Device_Name",
            Field::RootVolumeId => "Root_Volume_ID",
            Field::AutoscalingGroup => "Tag_aws_autoscaling_groupName",
            Field::LaunchTemplateId => "Tag_aws_ec2launchtemplate_id",
            Field::LaunchTemplateVersion => "Tag_aws_ec2launchtemplate_version",
            Field::Product => "Product",
            Field::ProductOwner => "Product_Owner",
            Field::SupportingProductOwner => "Supporting_Product_Owner",
            Field::ProductTeam => "Tag_product_team",
            Field::VpcId => "VPC_ID",
            Field::SecurityGroups => "Security_Groups",
            Field::SecurityGroupsParsed => "SecurityGroupsParsed",
        }
    }

    /// Look up a source column by its normalized header.
    pub fn from_column(column: &str) -> Option<Field> {
        Self::SOURCE_COLUMNS
            .into_iter()
            .find(|field| field.column() == column)
    }

    /// Fields that hold a node identity key. Their values are always sent as text.
    pub fn is_identity(self) -> bool {
        matches!(
            self,
            Field::Servers
                | Field::Product
                | Field::ProductOwner
                | Field::SupportingProductOwner
                | Field::ProductTeam
                | Field::VpcId
        )
    }

    /// Fields read verbatim as text: identity keys, the raw security-group list and
    /// the launch template version. Numeric-looking values such as `007` or `1.10`
    /// must not be reformatted.
    pub fn keeps_text(self) -> bool {
        self.is_identity()
            || matches!(self, Field::SecurityGroups | Field::LaunchTemplateVersion)
    }

    /// Read a raw source cell for this field.
    pub fn read_cell(self, raw: &str) -> Cell {
        if self.keeps_text() {
            Cell::text(raw)
        } else {
            Cell::infer(raw)
        }
    }

    /// Fields whose value is a list of identifiers.
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Field::SecurityGroupsParsed)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Tokens read as a missing value.
const NA_TOKENS: [&str; 8] = ["NA", "N/A", "n/a", "#N/A", "null", "NULL", "None", "none"];

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl Cell {
    /// Type a raw CSV cell.
    ///
    /// Whitespace is trimmed. Empty strings and NA tokens become [`Cell::Null`],
    /// integers [`Cell::Integer`], other numbers (including `NaN`) [`Cell::Float`],
    /// anything else [`Cell::Text`].
    pub fn infer(raw: &str) -> Cell {
        let value = raw.trim();
        if value.is_empty() || NA_TOKENS.contains(&value) {
            return Cell::Null;
        }
        if let Ok(i) = value.parse::<i64>() {
            return Cell::Integer(i);
        }
        if let Ok(f) = value.parse::<f64>() {
            return Cell::Float(f);
        }
        Cell::Text(value.to_string())
    }

    /// Read a raw cell as text. Whitespace is trimmed; empty strings and NA tokens
    /// become [`Cell::Null`]; nothing is parsed as a number.
    pub fn text(raw: &str) -> Cell {
        let value = raw.trim();
        if value.is_empty() || NA_TOKENS.contains(&value) {
            return Cell::Null;
        }
        Cell::Text(value.to_string())
    }

    /// Whether the cell carries a usable value: not null and not `NaN`.
    pub fn is_present(&self) -> bool {
        match self {
            Cell::Null => false,
            Cell::Float(f) => !f.is_nan(),
            _ => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render a scalar cell as an identity key.
    ///
    /// Returns `None` for missing values and lists.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Integer(i) => Some(i.to_string()),
            Cell::Float(f) if !f.is_nan() => Some(f.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Null | Cell::Float(_) | Cell::List(_) => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<Vec<String>> for Cell {
    fn from(value: Vec<String>) -> Self {
        Cell::List(value)
    }
}

/// One inventory row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InventoryRecord {
    /// 1-based data row number in the source (header excluded).
    pub row: usize,
    cells: BTreeMap<Field, Cell>,
}

impl InventoryRecord {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            cells: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, field: Field, value: impl Into<Cell>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<Cell>) {
        self.cells.insert(field, value.into());
    }

    pub fn get(&self, field: Field) -> Option<&Cell> {
        self.cells.get(&field)
    }

    /// Whether `field` holds a usable value.
    pub fn has(&self, field: Field) -> bool {
        self.get(field).is_some_and(Cell::is_present)
    }

    pub fn cells(&self) -> impl Iterator<Item = (Field, &Cell)> {
        self.cells.iter().map(|(field, cell)| (*field, cell))
    }

    /// Compute [`Field::SecurityGroupsParsed`] from [`Field::SecurityGroups`].
    ///
    /// A non-text or missing source cell yields an empty list.
    pub fn derive_security_groups(&mut self) {
        let parsed = self
            .get(Field::SecurityGroups)
            .and_then(Cell::as_text)
            .map(parse_security_groups)
            .unwrap_or_default();
        self.cells
            .insert(Field::SecurityGroupsParsed, Cell::List(parsed));
    }
}
