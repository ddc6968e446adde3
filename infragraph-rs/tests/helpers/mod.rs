#![allow(dead_code)]

use std::path::PathBuf;

use rust_xlsxwriter::Workbook;

use tempfile::TempDir;

use infragraph_rs::{table, InventoryTable};

/// Temporary directory holding CSV and workbook inventory fixtures.
pub struct TempTable {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TempTable {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp table dir");
        let path = dir.path().join("inventory.csv");
        Self { dir, path }
    }

    /// Write the fixture from a header row and data rows.
    pub fn write(&self, headers: &[&str], rows: &[&[&str]]) -> &Self {
        let mut writer = csv::Writer::from_path(&self.path).expect("open fixture");
        writer.write_record(headers).expect("write header");
        for row in rows {
            writer.write_record(*row).expect("write row");
        }
        writer.flush().expect("flush fixture");
        self
    }

    /// Write raw file content, bypassing CSV quoting.
    pub fn write_raw(&self, content: &str) -> &Self {
        std::fs::write(&self.path, content).expect("write fixture");
        self
    }

    /// Write a one-sheet workbook next to the CSV fixture and return its path.
    ///
    /// Cells that parse as numbers are stored as numeric cells, the way a
    /// spreadsheet holds them.
    pub fn write_xlsx(&self, headers: &[&str], rows: &[&[&str]]) -> PathBuf {
        let path = self.dir.path().join("inventory.xlsx");
        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            for (col, header) in headers.iter().enumerate() {
                sheet
                    .write_string(0, col as u16, *header)
                    .expect("write header cell");
            }
            for (row, cells) in rows.iter().enumerate() {
                let row = row as u32 + 1;
                for (col, cell) in cells.iter().enumerate() {
                    let col = col as u16;
                    match cell.parse::<f64>() {
                        Ok(n) => sheet.write_number(row, col, n).expect("write number cell"),
                        Err(_) if cell.is_empty() => continue,
                        Err(_) => sheet.write_string(row, col, *cell).expect("write text cell"),
                    };
                }
            }
        }
        workbook.save(&path).expect("save workbook fixture");
        path
    }

    pub fn load(&self) -> InventoryTable {
        table::load_csv(&self.path).expect("load fixture")
    }
}

/// The five-column row used by the end-to-end scenario.
pub const SCENARIO_HEADERS: [&str; 5] = [
    "Servers",
    "Product",
    "Product Owner",
    "VPC ID",
    "Security Groups",
];

pub const SCENARIO_ROW: [&str; 5] = ["srv1", "prodA", "alice", "vpc-9", "[sg-1 sg-2]"];
