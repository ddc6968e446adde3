//! Tabular source reading.
//!
//! Reads a CSV or spreadsheet inventory export into typed [`InventoryRecord`]s: headers are
//! normalized, known columns are mapped to [`Field`]s, unknown columns are ignored,
//! and the security-group list is parsed into its derived field.

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info, warn};

use crate::errors::{IngestError, Result};
use crate::record::{Cell, Field, InventoryRecord};
use crate::utils::normalize_column_name;

/// A loaded inventory table.
#[derive(Debug, Clone, Default)]
pub struct InventoryTable {
    /// Known columns present in the source, in source order.
    pub columns: Vec<Field>,
    /// Normalized headers that did not match a known column.
    pub ignored_columns: Vec<String>,
    pub records: Vec<InventoryRecord>,
}

impl InventoryTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }
}

/// Spreadsheet extensions read with [`load_xlsx`]; anything else is read as CSV.
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Read an inventory file, choosing the reader from the file extension.
pub fn load(path: &Path) -> Result<InventoryTable> {
    let is_workbook = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)));
    if is_workbook {
        load_xlsx(path)
    } else {
        load_csv(path)
    }
}

/// Read the first worksheet of a workbook. Its first row is the header row.
///
/// Cells go through the same typing rules as CSV cells, so a numeric cell in a
/// key column still becomes a text key.
pub fn load_xlsx(path: &Path) -> Result<InventoryTable> {
    let workbook_error = |e: calamine::Error| IngestError::Workbook(format!("{}: {e}", path.display()));

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Workbook(format!("{}: no worksheets", path.display())))?
        .map_err(workbook_error)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(workbook_cell_text).collect())
        .unwrap_or_default();
    let data: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(workbook_cell_text).collect())
        .collect();

    let table = from_rows(&headers, data)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        ignored = table.ignored_columns.len(),
        "inventory workbook loaded"
    );
    Ok(table)
}

/// Render a workbook cell as the raw text a CSV export would hold.
fn workbook_cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read a CSV file from disk.
///
/// # Errors
/// Returns [`IngestError::Io`] when the file cannot be opened and
/// [`IngestError::MissingColumns`] when a required column is absent.
pub fn load_csv(path: &Path) -> Result<InventoryTable> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::io(path.display(), e))?;
    let table = from_reader(file)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        ignored = table.ignored_columns.len(),
        "inventory table loaded"
    );
    Ok(table)
}

/// Read CSV data from any reader. The first record is the header row.
pub fn from_reader<R: Read>(reader: R) -> Result<InventoryTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(ToOwned::to_owned).collect();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(ToOwned::to_owned).collect::<Vec<String>>());
    }
    from_rows(&headers, rows)
}

/// Build a table from raw headers and rows of raw cell strings.
///
/// Short rows are padded with nulls; surplus cells are ignored.
pub fn from_rows<H, I, R, C>(headers: &[H], rows: I) -> Result<InventoryTable>
where
    H: AsRef<str>,
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = C>,
    C: AsRef<str>,
{
    let mapping = map_headers(headers);

    let columns: Vec<Field> = mapping.iter().filter_map(|m| *m).collect();
    let ignored_columns: Vec<String> = headers
        .iter()
        .zip(&mapping)
        .filter(|(_, m)| m.is_none())
        .map(|(h, _)| normalize_column_name(h.as_ref()))
        .collect();

    let missing: Vec<String> = Field::REQUIRED_COLUMNS
        .into_iter()
        .filter(|field| !columns.contains(field))
        .map(|field| field.column().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let parse_groups = columns.contains(&Field::SecurityGroups);
    if !parse_groups {
        warn!(
            column = Field::SecurityGroups.column(),
            "no security group column found; security group statements will skip every row"
        );
    }
    for field in Field::SOURCE_COLUMNS {
        if !columns.contains(&field) && !Field::REQUIRED_COLUMNS.contains(&field) {
            debug!(column = field.column(), "optional column absent");
        }
    }

    let mut records = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        let mut record = InventoryRecord::new(index + 1);
        let mut cells = row.into_iter();
        for slot in &mapping {
            let raw = cells.next();
            if let Some(field) = slot {
                let cell = raw.map_or(Cell::Null, |c| field.read_cell(c.as_ref()));
                record.set(*field, cell);
            }
        }
        if parse_groups {
            record.derive_security_groups();
        }
        records.push(record);
    }

    Ok(InventoryTable {
        columns,
        ignored_columns,
        records,
    })
}

/// Map each raw header to a known field. A header that normalizes to an already
/// mapped field is treated as unknown.
fn map_headers<H: AsRef<str>>(headers: &[H]) -> Vec<Option<Field>> {
    let mut seen = Vec::new();
    headers
        .iter()
        .map(|raw| {
            let normalized = normalize_column_name(raw.as_ref());
            match Field::from_column(&normalized) {
                Some(field) if seen.contains(&field) => {
                    warn!(
                        header = raw.as_ref(),
                        column = %field,
                        "duplicate column after normalization; keeping the first"
                    );
                    None
                }
                Some(field) => {
                    seen.push(field);
                    Some(field)
                }
                None => {
                    debug!(header = raw.as_ref(), normalized = %normalized, "ignoring unknown column");
                    None
                }
            }
        })
        .collect()
}
