//! Per-statement record validation and projection.
//!
//! A record takes part in a statement only when every required field is present,
//! not null and not `NaN`. Passing records are projected to a parameter map holding
//! the required fields plus whichever optional fields are present, so missing values
//! are never sent to the store.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::{Cell, Field, InventoryRecord};

/// Parameters for one row of a batch, keyed by field.
pub type Params = BTreeMap<Field, Cell>;

/// A record excluded from a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skip {
    pub row: usize,
    pub missing: Vec<Field>,
}

/// Result of filtering a record set for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filtered {
    pub rows: Vec<Params>,
    pub skipped: Vec<Skip>,
}

impl Filtered {
    /// How often each field was the reason for a skip.
    pub fn missing_field_counts(&self) -> BTreeMap<Field, usize> {
        let mut counts = BTreeMap::new();
        for skip in &self.skipped {
            for field in &skip.missing {
                *counts.entry(*field).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Required fields the record lacks, in `required` order.
pub fn missing_fields(record: &InventoryRecord, required: &[Field]) -> Vec<Field> {
    required
        .iter()
        .copied()
        .filter(|field| !record.has(*field))
        .collect()
}

pub fn has_all_required(record: &InventoryRecord, required: &[Field]) -> bool {
    required.iter().all(|field| record.has(*field))
}

/// Project a validated record to its statement parameters.
///
/// Identity fields are rendered as text keys; optional fields appear only when
/// present.
pub fn project(record: &InventoryRecord, required: &[Field], optional: &[Field]) -> Params {
    let mut params = Params::new();
    for field in required.iter().chain(optional) {
        let Some(cell) = record.get(*field).filter(|c| c.is_present()) else {
            continue;
        };
        let value = if field.is_identity() {
            cell.to_key().map_or(Cell::Null, Cell::Text)
        } else {
            cell.clone()
        };
        params.insert(*field, value);
    }
    params
}

/// Split `records` into projected rows and skips for one statement.
pub fn filter_records<'a, I>(records: I, required: &[Field], optional: &[Field]) -> Filtered
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    let mut filtered = Filtered::default();
    for record in records {
        let missing = missing_fields(record, required);
        if missing.is_empty() {
            filtered.rows.push(project(record, required, optional));
        } else {
            filtered.skipped.push(Skip {
                row: record.row,
                missing,
            });
        }
    }
    filtered
}

/// Whether a reference cell names a real node: present, non-empty and not a
/// textual null marker.
pub fn is_usable_reference(cell: Option<&Cell>) -> bool {
    match cell.filter(|c| c.is_present()).and_then(Cell::to_key) {
        Some(key) => {
            let key = key.trim();
            !key.is_empty() && !key.eq_ignore_ascii_case("null") && !key.eq_ignore_ascii_case("none")
        }
        None => false,
    }
}
